pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/appointments",
            get(handlers::appointments::list_appointments)
                .post(handlers::appointments::create_appointment),
        )
        .route(
            "/api/appointments/available-slots",
            get(handlers::appointments::available_slots),
        )
        .route(
            "/api/appointments/:id",
            get(handlers::appointments::get_appointment),
        )
        .route(
            "/api/appointments/:id/reschedule",
            post(handlers::appointments::reschedule_appointment),
        )
        .route(
            "/api/appointments/:id/cancel",
            post(handlers::appointments::cancel_appointment),
        )
        .route(
            "/api/appointments/:id/complete",
            post(handlers::appointments::complete_appointment),
        )
        .route(
            "/api/time-blocks",
            get(handlers::time_blocks::list_time_blocks)
                .post(handlers::time_blocks::create_time_block),
        )
        .route(
            "/api/time-blocks/:id",
            delete(handlers::time_blocks::delete_time_block),
        )
        .route(
            "/api/settings/hours",
            get(handlers::settings::get_business_hours),
        )
        .route(
            "/api/settings/hours/:day",
            put(handlers::settings::update_business_hours),
        )
        .route(
            "/api/settings/special-days",
            get(handlers::settings::list_special_days).post(handlers::settings::add_special_day),
        )
        .route(
            "/api/settings/special-days/:id",
            delete(handlers::settings::remove_special_day),
        )
        .route(
            "/api/users",
            post(handlers::directory::create_user),
        )
        .route(
            "/api/services",
            get(handlers::directory::list_services).post(handlers::directory::create_service),
        )
        .route(
            "/api/notifications/user/:user_id",
            get(handlers::notifications::list_for_user),
        )
        .route(
            "/api/notifications/:id/process",
            post(handlers::notifications::process_notification),
        )
        .route(
            "/api/notifications/preferences/:user_id",
            get(handlers::notifications::get_preference)
                .put(handlers::notifications::update_preference),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
