use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Service, User};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateUserBody {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserBody>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::InvalidInput("name is required".to_string()));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        email: body.email,
        phone: body.phone,
    };

    let conn = state.db.lock().unwrap();
    queries::create_user(&conn, &user)?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
pub struct CreateServiceBody {
    pub name: String,
    pub duration_minutes: i32,
    pub price: f64,
}

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateServiceBody>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    if body.duration_minutes <= 0 {
        return Err(AppError::InvalidInput(
            "duration must be positive".to_string(),
        ));
    }

    let service = Service {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        duration_minutes: body.duration_minutes,
        price: body.price,
    };

    let conn = state.db.lock().unwrap();
    queries::create_service(&conn, &service)?;
    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Service>>, AppError> {
    let conn = state.db.lock().unwrap();
    let services = queries::list_services(&conn)?;
    Ok(Json(services))
}
