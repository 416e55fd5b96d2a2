use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    WhatsApp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::WhatsApp => "whatsapp",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "sms" => Channel::Sms,
            "whatsapp" => Channel::WhatsApp,
            _ => Channel::Email,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationCategory {
    BookingConfirmation,
    BookingRescheduled,
    BookingCancellation,
    Reminder,
    PasswordReset,
    Custom,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::BookingConfirmation => "booking-confirmation",
            NotificationCategory::BookingRescheduled => "booking-rescheduled",
            NotificationCategory::BookingCancellation => "booking-cancellation",
            NotificationCategory::Reminder => "reminder",
            NotificationCategory::PasswordReset => "password-reset",
            NotificationCategory::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "booking-confirmation" => NotificationCategory::BookingConfirmation,
            "booking-rescheduled" => NotificationCategory::BookingRescheduled,
            "booking-cancellation" => NotificationCategory::BookingCancellation,
            "reminder" => NotificationCategory::Reminder,
            "password-reset" => NotificationCategory::PasswordReset,
            _ => NotificationCategory::Custom,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "sent" => NotificationStatus::Sent,
            "failed" => NotificationStatus::Failed,
            _ => NotificationStatus::Pending,
        }
    }
}

/// One message per triggering event. Status transitions are monotonic:
/// pending -> sent | failed, both terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub id: String,
    pub user_id: String,
    pub category: NotificationCategory,
    pub channel: Channel,
    pub subject: String,
    pub body: String,
    pub scheduled_for: NaiveDateTime,
    pub booking_id: Option<String>,
    pub status: NotificationStatus,
    pub sent_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

pub const MIN_REMINDER_LEAD_HOURS: i64 = 1;
pub const MAX_REMINDER_LEAD_HOURS: i64 = 72;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub user_id: String,
    pub email_enabled: bool,
    pub sms_enabled: bool,
    pub reminders_enabled: bool,
    pub reminder_lead_hours: i64,
}

impl NotificationPreference {
    pub fn defaults(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            email_enabled: true,
            sms_enabled: false,
            reminders_enabled: true,
            reminder_lead_hours: 24,
        }
    }

    pub fn clamp_lead_hours(hours: i64) -> i64 {
        hours.clamp(MIN_REMINDER_LEAD_HOURS, MAX_REMINDER_LEAD_HOURS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_defaults() {
        let pref = NotificationPreference::defaults("u1");
        assert!(pref.email_enabled);
        assert!(!pref.sms_enabled);
        assert!(pref.reminders_enabled);
        assert_eq!(pref.reminder_lead_hours, 24);
    }

    #[test]
    fn test_lead_hours_clamped() {
        assert_eq!(NotificationPreference::clamp_lead_hours(0), 1);
        assert_eq!(NotificationPreference::clamp_lead_hours(24), 24);
        assert_eq!(NotificationPreference::clamp_lead_hours(100), 72);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(
            NotificationCategory::parse("booking-confirmation"),
            NotificationCategory::BookingConfirmation
        );
        assert_eq!(
            NotificationCategory::parse("whatever"),
            NotificationCategory::Custom
        );
    }
}
