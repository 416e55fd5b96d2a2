use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub service_id: String,
    pub start: NaiveDateTime,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Scheduled,
    Confirmed,
    Rescheduled,
    Completed,
    Canceled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Scheduled => "scheduled",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Rescheduled => "rescheduled",
            BookingStatus::Completed => "completed",
            BookingStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "confirmed" => BookingStatus::Confirmed,
            "rescheduled" => BookingStatus::Rescheduled,
            "completed" => BookingStatus::Completed,
            "canceled" => BookingStatus::Canceled,
            _ => BookingStatus::Scheduled,
        }
    }

    /// Active bookings participate in conflict checks. Canceled and completed
    /// ones are kept for history but no longer occupy their interval.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            BookingStatus::Scheduled | BookingStatus::Confirmed | BookingStatus::Rescheduled
        )
    }

    /// Transition table. Canceled and completed are terminal; everything else
    /// may be confirmed, rescheduled again, canceled, or completed.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        match next {
            BookingStatus::Scheduled => false,
            BookingStatus::Confirmed
            | BookingStatus::Rescheduled
            | BookingStatus::Completed
            | BookingStatus::Canceled => self.is_active(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_statuses() {
        assert!(BookingStatus::Scheduled.is_active());
        assert!(BookingStatus::Confirmed.is_active());
        assert!(BookingStatus::Rescheduled.is_active());
        assert!(!BookingStatus::Completed.is_active());
        assert!(!BookingStatus::Canceled.is_active());
    }

    #[test]
    fn test_terminal_states_cannot_transition() {
        assert!(!BookingStatus::Canceled.can_transition_to(BookingStatus::Completed));
        assert!(!BookingStatus::Canceled.can_transition_to(BookingStatus::Rescheduled));
        assert!(!BookingStatus::Completed.can_transition_to(BookingStatus::Canceled));
    }

    #[test]
    fn test_rescheduled_is_reenterable() {
        assert!(BookingStatus::Rescheduled.can_transition_to(BookingStatus::Rescheduled));
        assert!(BookingStatus::Rescheduled.can_transition_to(BookingStatus::Canceled));
        assert!(BookingStatus::Rescheduled.can_transition_to(BookingStatus::Completed));
    }

    #[test]
    fn test_parse_round_trip() {
        for status in [
            BookingStatus::Scheduled,
            BookingStatus::Confirmed,
            BookingStatus::Rescheduled,
            BookingStatus::Completed,
            BookingStatus::Canceled,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), status);
        }
    }
}
