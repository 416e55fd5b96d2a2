use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::models::{
    Booking, Channel, NotificationCategory, NotificationMessage, NotificationPreference,
    NotificationStatus, Service, User,
};
use crate::services::notifications::orchestrator;
use crate::state::AppState;

pub const SWEEP_BATCH_SIZE: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingEvent {
    Confirmed,
    Rescheduled,
    Canceled,
}

/// Periodic duty one: push due pending messages through the orchestrator.
/// A failure on one message never aborts the batch.
pub async fn sweep_pending(state: &AppState) -> anyhow::Result<usize> {
    let now = Utc::now().naive_utc();
    let due = {
        let conn = state.db.lock().unwrap();
        queries::due_pending_notifications(&conn, &now, SWEEP_BATCH_SIZE)?
    };

    if !due.is_empty() {
        tracing::debug!(count = due.len(), "processing due notifications");
    }

    let mut delivered = 0;
    for message in due {
        match orchestrator::deliver(&state.db, &state.channels, &state.retry, &message.id).await {
            Ok(true) => delivered += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(message_id = %message.id, "failed to process notification: {e}");
            }
        }
    }
    Ok(delivered)
}

/// Periodic duty two: derive reminder messages for upcoming bookings.
/// Idempotent: a booking with a pending reminder is never double-scheduled.
pub fn schedule_reminders(
    conn: &Connection,
    lookahead_days: i64,
    now: NaiveDateTime,
) -> anyhow::Result<usize> {
    let until = now + Duration::days(lookahead_days);
    let upcoming = queries::upcoming_active_bookings(conn, &now, &until)?;

    let mut created = 0;
    for booking in upcoming {
        match schedule_reminder_for(conn, &booking, now) {
            Ok(true) => created += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(booking_id = %booking.id, "failed to schedule reminder: {e}");
            }
        }
    }
    Ok(created)
}

fn schedule_reminder_for(
    conn: &Connection,
    booking: &Booking,
    now: NaiveDateTime,
) -> anyhow::Result<bool> {
    let Some(user) = queries::get_user(conn, &booking.user_id)? else {
        anyhow::bail!("user {} not found", booking.user_id);
    };
    let Some(service) = queries::get_service(conn, &booking.service_id)? else {
        anyhow::bail!("service {} not found", booking.service_id);
    };

    let preference = queries::get_or_create_preference(conn, &user.id)?;
    if !preference.reminders_enabled {
        return Ok(false);
    }

    let reminder_at = booking.start - Duration::hours(preference.reminder_lead_hours);
    if reminder_at < now {
        return Ok(false);
    }

    if queries::pending_reminder_exists(conn, &booking.id)? {
        return Ok(false);
    }

    let message = NotificationMessage {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        category: NotificationCategory::Reminder,
        channel: preferred_channel(&preference),
        subject: format!("Reminder: upcoming {} appointment", service.name),
        body: reminder_body(&user, &service, booking),
        scheduled_for: reminder_at,
        booking_id: Some(booking.id.clone()),
        status: NotificationStatus::Pending,
        sent_at: None,
        created_at: now,
    };
    queries::create_notification(conn, &message)?;

    tracing::debug!(booking_id = %booking.id, reminder_at = %reminder_at, "reminder scheduled");
    Ok(true)
}

/// Creates the confirmation/reschedule/cancellation message for a booking
/// event, scheduled for immediate delivery.
pub fn create_booking_event_notification(
    conn: &Connection,
    booking_id: &str,
    event: BookingEvent,
    now: NaiveDateTime,
) -> anyhow::Result<NotificationMessage> {
    let Some(booking) = queries::get_booking(conn, booking_id)? else {
        anyhow::bail!("booking {booking_id} not found");
    };
    let Some(user) = queries::get_user(conn, &booking.user_id)? else {
        anyhow::bail!("user {} not found", booking.user_id);
    };
    let Some(service) = queries::get_service(conn, &booking.service_id)? else {
        anyhow::bail!("service {} not found", booking.service_id);
    };

    let preference = queries::get_or_create_preference(conn, &user.id)?;

    let (category, subject, body) = match event {
        BookingEvent::Confirmed => (
            NotificationCategory::BookingConfirmation,
            format!("Appointment confirmed: {}", service.name),
            confirmation_body(&user, &service, &booking),
        ),
        BookingEvent::Rescheduled => (
            NotificationCategory::BookingRescheduled,
            format!("Appointment rescheduled: {}", service.name),
            reschedule_body(&user, &service, &booking),
        ),
        BookingEvent::Canceled => (
            NotificationCategory::BookingCancellation,
            format!("Appointment canceled: {}", service.name),
            cancellation_body(&user, &service, &booking),
        ),
    };

    let message = NotificationMessage {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        category,
        channel: preferred_channel(&preference),
        subject,
        body,
        scheduled_for: now,
        booking_id: Some(booking.id.clone()),
        status: NotificationStatus::Pending,
        sent_at: None,
        created_at: now,
    };
    queries::create_notification(conn, &message)?;
    Ok(message)
}

/// Best-effort side effect of a booking mutation: create the message and try
/// to deliver it now. Failures are logged and never reach the booking caller.
pub async fn notify_booking_event(state: Arc<AppState>, booking_id: String, event: BookingEvent) {
    let message = {
        let conn = state.db.lock().unwrap();
        create_booking_event_notification(&conn, &booking_id, event, Utc::now().naive_utc())
    };

    match message {
        Ok(message) => {
            if let Err(e) =
                orchestrator::deliver(&state.db, &state.channels, &state.retry, &message.id).await
            {
                tracing::warn!(%booking_id, "notification delivery failed: {e}");
            }
        }
        Err(e) => {
            tracing::warn!(%booking_id, "failed to create booking notification: {e}");
        }
    }
}

fn preferred_channel(preference: &NotificationPreference) -> Channel {
    if preference.email_enabled {
        Channel::Email
    } else {
        Channel::Sms
    }
}

fn when(booking: &Booking) -> (String, String) {
    (
        booking.start.format("%Y-%m-%d").to_string(),
        booking.start.format("%H:%M").to_string(),
    )
}

fn confirmation_body(user: &User, service: &Service, booking: &Booking) -> String {
    let (date, time) = when(booking);
    format!(
        "Hello {},\n\n\
         Your appointment has been confirmed.\n\n\
         Service: {}\nDate: {date}\nTime: {time}\n\
         Estimated duration: {} minutes\nPrice: {:.2}\n\n\
         You will receive a reminder before your appointment.",
        user.name, service.name, service.duration_minutes, service.price
    )
}

fn reschedule_body(user: &User, service: &Service, booking: &Booking) -> String {
    let (date, time) = when(booking);
    format!(
        "Hello {},\n\n\
         Your appointment has been moved to a new time.\n\n\
         Service: {}\nNew date: {date}\nNew time: {time}\n\
         Estimated duration: {} minutes\nPrice: {:.2}",
        user.name, service.name, service.duration_minutes, service.price
    )
}

fn cancellation_body(user: &User, service: &Service, booking: &Booking) -> String {
    let (date, time) = when(booking);
    format!(
        "Hello {},\n\n\
         Your appointment has been canceled.\n\n\
         Service: {}\nDate: {date}\nTime: {time}\n\n\
         If you did not request this cancellation, please contact us.",
        user.name, service.name
    )
}

fn reminder_body(user: &User, service: &Service, booking: &Booking) -> String {
    let (date, time) = when(booking);
    format!(
        "Hello {},\n\n\
         This is a reminder of your upcoming {} appointment on {date} at {time}.\n\
         Estimated duration: {} minutes\nPrice: {:.2}",
        user.name, service.name, service.duration_minutes, service.price
    )
}
