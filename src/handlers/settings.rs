use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{SpecialDay, WeekdayHours};
use crate::state::AppState;

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Serialize)]
pub struct WeekdayHoursResponse {
    pub day_of_week: u8,
    pub day_name: &'static str,
    pub is_open: bool,
    pub open_time: String,
    pub close_time: String,
}

pub async fn get_business_hours(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WeekdayHoursResponse>>, AppError> {
    let conn = state.db.lock().unwrap();
    let hours = queries::list_weekday_hours(&conn)?;

    let response = hours
        .into_iter()
        .map(|h| WeekdayHoursResponse {
            day_name: DAY_NAMES.get(h.day_of_week as usize).unwrap_or(&"?"),
            day_of_week: h.day_of_week,
            is_open: h.is_open,
            open_time: h.open_time.format(queries::TIME_FMT).to_string(),
            close_time: h.close_time.format(queries::TIME_FMT).to_string(),
        })
        .collect();
    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct UpdateHoursBody {
    pub is_open: bool,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
}

fn parse_time(s: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(s, queries::TIME_FMT)
        .map_err(|_| AppError::InvalidInput(format!("invalid time: {s}")))
}

pub async fn update_business_hours(
    State(state): State<Arc<AppState>>,
    Path(day): Path<u8>,
    Json(body): Json<UpdateHoursBody>,
) -> Result<Json<WeekdayHours>, AppError> {
    if day > 6 {
        return Err(AppError::InvalidInput(format!("invalid weekday: {day}")));
    }

    let updated = {
        let conn = state.db.lock().unwrap();
        let current = queries::get_weekday_hours(&conn, day)?
            .ok_or_else(|| AppError::NotFound(format!("no hours configured for day {day}")))?;

        let updated = WeekdayHours {
            day_of_week: day,
            is_open: body.is_open,
            open_time: match &body.open_time {
                Some(s) => parse_time(s)?,
                None => current.open_time,
            },
            close_time: match &body.close_time {
                Some(s) => parse_time(s)?,
                None => current.close_time,
            },
        };
        queries::update_weekday_hours(&conn, &updated)?;
        updated
    };

    state.calendar.invalidate();
    Ok(Json(updated))
}

pub async fn list_special_days(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SpecialDay>>, AppError> {
    let conn = state.db.lock().unwrap();
    let days = queries::list_special_days(&conn)?;
    Ok(Json(days))
}

#[derive(Deserialize)]
pub struct SpecialDayBody {
    pub date: String,
    pub is_open: bool,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
    pub reason: Option<String>,
}

pub async fn add_special_day(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SpecialDayBody>,
) -> Result<(StatusCode, Json<SpecialDay>), AppError> {
    let date = NaiveDate::parse_from_str(&body.date, queries::DATE_FMT)
        .map_err(|_| AppError::InvalidInput(format!("invalid date: {}", body.date)))?;

    let day = SpecialDay {
        id: Uuid::new_v4().to_string(),
        date,
        is_open: body.is_open,
        open_time: body.open_time.as_deref().map(parse_time).transpose()?,
        close_time: body.close_time.as_deref().map(parse_time).transpose()?,
        reason: body.reason,
    };

    {
        let conn = state.db.lock().unwrap();
        queries::upsert_special_day(&conn, &day)?;
    }

    state.calendar.invalidate();
    Ok((StatusCode::CREATED, Json(day)))
}

pub async fn remove_special_day(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    {
        let conn = state.db.lock().unwrap();
        if !queries::delete_special_day(&conn, &id)? {
            return Err(AppError::NotFound(format!("special day {id} not found")));
        }
    }

    state.calendar.invalidate();
    Ok(Json(serde_json::json!({ "deleted": true })))
}
