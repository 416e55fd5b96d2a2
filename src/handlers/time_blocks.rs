use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::TimeBlock;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateTimeBlockBody {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub reason: Option<String>,
}

pub async fn create_time_block(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTimeBlockBody>,
) -> Result<(StatusCode, Json<TimeBlock>), AppError> {
    let date = NaiveDate::parse_from_str(&body.date, queries::DATE_FMT)
        .map_err(|_| AppError::InvalidInput(format!("invalid date: {}", body.date)))?;
    let start = NaiveTime::parse_from_str(&body.start_time, queries::TIME_FMT)
        .map_err(|_| AppError::InvalidInput(format!("invalid time: {}", body.start_time)))?;
    let end = NaiveTime::parse_from_str(&body.end_time, queries::TIME_FMT)
        .map_err(|_| AppError::InvalidInput(format!("invalid time: {}", body.end_time)))?;

    if end <= start {
        return Err(AppError::InvalidInput(
            "end time must be after start time".to_string(),
        ));
    }

    let block = TimeBlock {
        id: Uuid::new_v4().to_string(),
        date,
        start: date.and_time(start),
        end: date.and_time(end),
        reason: body.reason,
    };

    let conn = state.db.lock().unwrap();
    queries::create_time_block(&conn, &block)?;

    Ok((StatusCode::CREATED, Json(block)))
}

#[derive(Deserialize)]
pub struct ListTimeBlocksQuery {
    pub date: Option<String>,
}

pub async fn list_time_blocks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTimeBlocksQuery>,
) -> Result<Json<Vec<TimeBlock>>, AppError> {
    let conn = state.db.lock().unwrap();
    let blocks = match &query.date {
        Some(s) => {
            let date = NaiveDate::parse_from_str(s, queries::DATE_FMT)
                .map_err(|_| AppError::InvalidInput(format!("invalid date: {s}")))?;
            queries::time_blocks_for_date(&conn, date)?
        }
        None => queries::list_time_blocks(&conn)?,
    };
    Ok(Json(blocks))
}

pub async fn delete_time_block(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let conn = state.db.lock().unwrap();
    if !queries::delete_time_block(&conn, &id)? {
        return Err(AppError::NotFound(format!("time block {id} not found")));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}
