use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{NotificationMessage, NotificationPreference};
use crate::services::notifications::orchestrator;
use crate::state::AppState;

pub async fn list_for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<NotificationMessage>>, AppError> {
    let conn = state.db.lock().unwrap();
    let messages = queries::list_notifications_for_user(&conn, &user_id)?;
    Ok(Json(messages))
}

/// Manual trigger for one message, mostly useful for ops. Idempotent: an
/// already-processed message reports its stored outcome.
pub async fn process_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    {
        let conn = state.db.lock().unwrap();
        if queries::get_notification(&conn, &id)?.is_none() {
            return Err(AppError::NotFound(format!("notification {id} not found")));
        }
    }

    let sent = orchestrator::deliver(&state.db, &state.channels, &state.retry, &id).await?;
    Ok(Json(serde_json::json!({ "sent": sent })))
}

pub async fn get_preference(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<NotificationPreference>, AppError> {
    let conn = state.db.lock().unwrap();
    if queries::get_user(&conn, &user_id)?.is_none() {
        return Err(AppError::NotFound(format!("user {user_id} not found")));
    }
    let preference = queries::get_or_create_preference(&conn, &user_id)?;
    Ok(Json(preference))
}

#[derive(Deserialize)]
pub struct UpdatePreferenceBody {
    pub email_enabled: Option<bool>,
    pub sms_enabled: Option<bool>,
    pub reminders_enabled: Option<bool>,
    pub reminder_lead_hours: Option<i64>,
}

pub async fn update_preference(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(body): Json<UpdatePreferenceBody>,
) -> Result<Json<NotificationPreference>, AppError> {
    let conn = state.db.lock().unwrap();
    if queries::get_user(&conn, &user_id)?.is_none() {
        return Err(AppError::NotFound(format!("user {user_id} not found")));
    }

    let mut preference = queries::get_or_create_preference(&conn, &user_id)?;
    if let Some(v) = body.email_enabled {
        preference.email_enabled = v;
    }
    if let Some(v) = body.sms_enabled {
        preference.sms_enabled = v;
    }
    if let Some(v) = body.reminders_enabled {
        preference.reminders_enabled = v;
    }
    if let Some(v) = body.reminder_lead_hours {
        preference.reminder_lead_hours = NotificationPreference::clamp_lead_hours(v);
    }

    queries::save_preference(&conn, &preference)?;
    Ok(Json(preference))
}
