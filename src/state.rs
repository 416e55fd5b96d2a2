use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::business_calendar::CalendarCache;
use crate::services::notifications::orchestrator::RetryPolicy;
use crate::services::notifications::registry::ChannelRegistry;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub channels: ChannelRegistry,
    pub calendar: CalendarCache,
    pub retry: RetryPolicy,
}
