use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, DayAvailability};
use crate::services::business_calendar::CalendarCache;

pub const SLOT_GRANULARITY_MINUTES: i64 = 30;

/// The one canonical interval test: [a_start, a_end) conflicts with
/// [b_start, b_end) iff they share any instant. Touching boundaries do not
/// conflict.
pub fn overlaps(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

#[derive(Debug, Clone, Serialize)]
pub struct Slot {
    pub time: NaiveDateTime,
    pub formatted_time: String,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableSlots {
    pub date: NaiveDate,
    pub is_open: bool,
    pub business_hours: Option<String>,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone)]
pub struct BookingRequest<'a> {
    pub user_id: &'a str,
    pub service_id: &'a str,
    pub date: &'a str,
    pub time: &'a str,
    pub notes: Option<String>,
}

fn combine_date_time(date: &str, time: &str) -> Result<NaiveDateTime, AppError> {
    let date = NaiveDate::parse_from_str(date, queries::DATE_FMT)
        .map_err(|_| AppError::InvalidInput(format!("invalid date: {date}")))?;
    let time = NaiveTime::parse_from_str(time, queries::TIME_FMT)
        .map_err(|_| AppError::InvalidInput(format!("invalid time: {time}")))?;
    Ok(date.and_time(time))
}

/// All occupied intervals on a date: active bookings plus blackout windows.
fn busy_intervals(
    conn: &Connection,
    date: NaiveDate,
    exclude_booking_id: Option<&str>,
) -> anyhow::Result<Vec<(NaiveDateTime, NaiveDateTime)>> {
    let mut intervals = queries::busy_intervals_for_date(conn, date, exclude_booking_id)?;
    for block in queries::time_blocks_for_date(conn, date)? {
        intervals.push((block.start, block.end));
    }
    Ok(intervals)
}

fn check_conflicts(
    conn: &Connection,
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude_booking_id: Option<&str>,
) -> Result<(), AppError> {
    let intervals = busy_intervals(conn, start.date(), exclude_booking_id)?;
    for (busy_start, busy_end) in intervals {
        if overlaps(start, end, busy_start, busy_end) {
            return Err(AppError::Conflict(
                "time slot unavailable, please pick another time".to_string(),
            ));
        }
    }
    Ok(())
}

fn check_business_hours(
    availability: &DayAvailability,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<(), AppError> {
    let (open, close) = match (availability.open_time, availability.close_time) {
        (Some(open), Some(close)) if availability.is_open => (open, close),
        _ => {
            return Err(AppError::InvalidInput(
                "business is closed on that date".to_string(),
            ))
        }
    };

    let open_dt = start.date().and_time(open);
    let close_dt = start.date().and_time(close);

    if start < open_dt || end > close_dt {
        return Err(AppError::InvalidInput(
            "time is outside business hours".to_string(),
        ));
    }
    Ok(())
}

/// Bookable 30-minute slot starts for a date, with the occupied duration
/// taken from the requested service when one is given.
pub fn available_slots(
    conn: &Connection,
    calendar: &CalendarCache,
    date: &str,
    service_id: Option<&str>,
) -> Result<AvailableSlots, AppError> {
    let date = NaiveDate::parse_from_str(date, queries::DATE_FMT)
        .map_err(|_| AppError::InvalidInput(format!("invalid date: {date}")))?;

    let availability = calendar.resolve(conn, date)?;

    let (open, close) = match (availability.open_time, availability.close_time) {
        (Some(open), Some(close)) if availability.is_open => (open, close),
        _ => {
            return Ok(AvailableSlots {
                date,
                is_open: false,
                business_hours: None,
                slots: vec![],
            })
        }
    };

    let duration_minutes = match service_id {
        Some(id) => {
            let service = queries::get_service(conn, id)?
                .ok_or_else(|| AppError::InvalidInput(format!("service {id} not found")))?;
            service.duration_minutes as i64
        }
        None => SLOT_GRANULARITY_MINUTES,
    };

    let occupied = busy_intervals(conn, date, None)?;

    let open_dt = date.and_time(open);
    let close_dt = date.and_time(close);
    let duration = Duration::minutes(duration_minutes);

    let mut slots = vec![];
    let mut candidate = open_dt;
    while candidate < close_dt {
        let candidate_end = candidate + duration;
        if candidate_end > close_dt {
            break;
        }

        let taken = occupied
            .iter()
            .any(|(busy_start, busy_end)| overlaps(candidate, candidate_end, *busy_start, *busy_end));

        if !taken {
            slots.push(Slot {
                time: candidate,
                formatted_time: candidate.format(queries::TIME_FMT).to_string(),
                duration_minutes,
            });
        }

        candidate += Duration::minutes(SLOT_GRANULARITY_MINUTES);
    }

    Ok(AvailableSlots {
        date,
        is_open: true,
        business_hours: Some(format!(
            "{} - {}",
            open.format(queries::TIME_FMT),
            close.format(queries::TIME_FMT)
        )),
        slots,
    })
}

/// Validates and admits a new booking. The conflict check and the insert run
/// inside one immediate transaction so two concurrent requests for the same
/// slot cannot both pass validation and both commit.
pub fn create_booking(
    conn: &mut Connection,
    calendar: &CalendarCache,
    request: &BookingRequest,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let user = queries::get_user(conn, request.user_id)?
        .ok_or_else(|| AppError::InvalidInput(format!("user {} not found", request.user_id)))?;

    let service = queries::get_service(conn, request.service_id)?.ok_or_else(|| {
        AppError::InvalidInput(format!("service {} not found", request.service_id))
    })?;

    let start = combine_date_time(request.date, request.time)?;
    if start < now {
        return Err(AppError::InvalidInput(
            "cannot book a date/time in the past".to_string(),
        ));
    }
    let end = start + Duration::minutes(service.duration_minutes as i64);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    check_conflicts(&tx, start, end, None)?;

    let availability = calendar.resolve(&tx, start.date())?;
    check_business_hours(&availability, start, end)?;

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        user_id: user.id,
        service_id: service.id,
        start,
        status: BookingStatus::Scheduled,
        notes: request.notes.clone(),
        created_at: now,
        updated_at: now,
    };
    queries::create_booking(&tx, &booking)?;

    tx.commit()?;

    tracing::info!(booking_id = %booking.id, user_id = %booking.user_id, "booking created");
    Ok(booking)
}

/// Moves a booking to a new start. The booking's own interval is excluded
/// from the conflict check so a no-op move never conflicts with itself.
pub fn reschedule_booking(
    conn: &mut Connection,
    calendar: &CalendarCache,
    booking_id: &str,
    date: &str,
    time: &str,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let booking = queries::get_booking(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

    if !booking.status.can_transition_to(BookingStatus::Rescheduled) {
        return Err(AppError::InvalidState(format!(
            "cannot reschedule a {} booking",
            booking.status.as_str()
        )));
    }

    let service = queries::get_service(conn, &booking.service_id)?.ok_or_else(|| {
        AppError::InvalidInput(format!("service {} not found", booking.service_id))
    })?;

    let start = combine_date_time(date, time)?;
    if start < now {
        return Err(AppError::InvalidInput(
            "cannot reschedule to a date/time in the past".to_string(),
        ));
    }
    let end = start + Duration::minutes(service.duration_minutes as i64);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    check_conflicts(&tx, start, end, Some(booking_id))?;

    let availability = calendar.resolve(&tx, start.date())?;
    check_business_hours(&availability, start, end)?;

    queries::update_booking_start(&tx, booking_id, &start, BookingStatus::Rescheduled)?;

    tx.commit()?;

    tracing::info!(booking_id, new_start = %start, "booking rescheduled");
    Ok(Booking {
        start,
        status: BookingStatus::Rescheduled,
        updated_at: now,
        ..booking
    })
}

/// Marks a booking canceled. History is kept; the interval is freed.
pub fn cancel_booking(conn: &Connection, booking_id: &str) -> Result<Booking, AppError> {
    let booking = queries::get_booking(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

    if !booking.status.can_transition_to(BookingStatus::Canceled) {
        return Err(AppError::InvalidState(format!(
            "cannot cancel a {} booking",
            booking.status.as_str()
        )));
    }

    queries::update_booking_status(conn, booking_id, BookingStatus::Canceled)?;

    tracing::info!(booking_id, "booking canceled");
    Ok(Booking {
        status: BookingStatus::Canceled,
        ..booking
    })
}

pub fn complete_booking(conn: &Connection, booking_id: &str) -> Result<Booking, AppError> {
    let booking = queries::get_booking(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

    if !booking.status.can_transition_to(BookingStatus::Completed) {
        return Err(AppError::InvalidState(format!(
            "cannot complete a {} booking",
            booking.status.as_str()
        )));
    }

    queries::update_booking_status(conn, booking_id, BookingStatus::Completed)?;

    Ok(Booking {
        status: BookingStatus::Completed,
        ..booking
    })
}
