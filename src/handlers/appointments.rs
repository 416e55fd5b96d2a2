use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::services::notifications::scheduler::{self, BookingEvent};
use crate::services::scheduling::{self, AvailableSlots, BookingRequest};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateAppointmentBody {
    pub user_id: String,
    pub service_id: String,
    pub date: String,
    pub time: String,
    pub notes: Option<String>,
}

pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAppointmentBody>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = {
        let mut conn = state.db.lock().unwrap();
        scheduling::create_booking(
            &mut conn,
            &state.calendar,
            &BookingRequest {
                user_id: &body.user_id,
                service_id: &body.service_id,
                date: &body.date,
                time: &body.time,
                notes: body.notes,
            },
            Utc::now().naive_utc(),
        )?
    };

    // Best-effort: a failed notification must not fail the booking
    tokio::spawn(scheduler::notify_booking_event(
        Arc::clone(&state),
        booking.id.clone(),
        BookingEvent::Confirmed,
    ));

    Ok((StatusCode::CREATED, Json(booking)))
}

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
    pub service_id: Option<String>,
}

pub async fn available_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<AvailableSlots>, AppError> {
    let conn = state.db.lock().unwrap();
    let slots = scheduling::available_slots(
        &conn,
        &state.calendar,
        &query.date,
        query.service_id.as_deref(),
    )?;
    Ok(Json(slots))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let page = query.page.unwrap_or(1).max(1);

    let parse_date = |s: &str| {
        NaiveDate::parse_from_str(s, queries::DATE_FMT)
            .map_err(|_| AppError::InvalidInput(format!("invalid date: {s}")))
    };

    let from = match &query.from {
        Some(s) => parse_date(s)?.and_hms_opt(0, 0, 0),
        None => None,
    };
    let to = match &query.to {
        Some(s) => parse_date(s)?.and_hms_opt(23, 59, 59),
        None => None,
    };

    let filter = queries::BookingFilter {
        user_id: query.user_id.as_deref(),
        status: query.status.as_deref().map(BookingStatus::parse),
        from,
        to,
        limit,
        offset: (page - 1) * limit,
    };

    let conn = state.db.lock().unwrap();
    let bookings = queries::list_bookings(&conn, &filter)?;
    Ok(Json(bookings))
}

pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let conn = state.db.lock().unwrap();
    let booking = queries::get_booking(&conn, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))?;
    Ok(Json(booking))
}

#[derive(Deserialize)]
pub struct RescheduleBody {
    pub date: String,
    pub time: String,
}

pub async fn reschedule_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RescheduleBody>,
) -> Result<Json<Booking>, AppError> {
    let booking = {
        let mut conn = state.db.lock().unwrap();
        scheduling::reschedule_booking(
            &mut conn,
            &state.calendar,
            &id,
            &body.date,
            &body.time,
            Utc::now().naive_utc(),
        )?
    };

    tokio::spawn(scheduler::notify_booking_event(
        Arc::clone(&state),
        booking.id.clone(),
        BookingEvent::Rescheduled,
    ));

    Ok(Json(booking))
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking = {
        let conn = state.db.lock().unwrap();
        scheduling::cancel_booking(&conn, &id)?
    };

    tokio::spawn(scheduler::notify_booking_event(
        Arc::clone(&state),
        booking.id.clone(),
        BookingEvent::Canceled,
    ));

    Ok(Json(booking))
}

pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let conn = state.db.lock().unwrap();
    let booking = scheduling::complete_booking(&conn, &id)?;
    Ok(Json(booking))
}
