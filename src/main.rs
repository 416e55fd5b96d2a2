use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracing_subscriber::EnvFilter;

use salonbook::config::AppConfig;
use salonbook::db;
use salonbook::services::business_calendar::CalendarCache;
use salonbook::services::notifications::email::MailgunEmailChannel;
use salonbook::services::notifications::orchestrator::RetryPolicy;
use salonbook::services::notifications::registry::ChannelRegistry;
use salonbook::services::notifications::scheduler;
use salonbook::services::notifications::sms::TwilioSmsChannel;
use salonbook::services::notifications::whatsapp::TwilioWhatsAppChannel;
use salonbook::services::notifications::NotificationChannel;
use salonbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let send_timeout = Duration::from_secs(config.send_timeout_secs);
    let channels: Vec<Box<dyn NotificationChannel>> = vec![
        Box::new(MailgunEmailChannel::new(
            config.mailgun_api_key.clone(),
            config.mailgun_domain.clone(),
            config.mailgun_from.clone(),
            send_timeout,
        )),
        Box::new(TwilioSmsChannel::new(
            config.twilio_account_sid.clone(),
            config.twilio_auth_token.clone(),
            config.twilio_sms_number.clone(),
            send_timeout,
        )),
        Box::new(TwilioWhatsAppChannel::new(
            config.twilio_account_sid.clone(),
            config.twilio_auth_token.clone(),
            config.twilio_whatsapp_number.clone(),
            send_timeout,
        )),
    ];

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        retry: RetryPolicy {
            max_attempts: config.max_send_attempts,
            backoff_base: Duration::from_secs(config.backoff_base_secs),
        },
        calendar: CalendarCache::new(Duration::from_secs(config.calendar_cache_ttl_secs)),
        channels: ChannelRegistry::new(channels),
        config: config.clone(),
    });

    spawn_sweep_loop(Arc::clone(&state), config.sweep_interval_secs);
    spawn_reminder_loop(
        Arc::clone(&state),
        config.reminder_interval_secs,
        config.reminder_lookahead_days,
    );

    let app = salonbook::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_sweep_loop(state: Arc<AppState>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            match scheduler::sweep_pending(&state).await {
                Ok(0) => {}
                Ok(sent) => tracing::info!(sent, "pending sweep delivered messages"),
                Err(e) => tracing::error!("pending sweep failed: {e}"),
            }
        }
    });
}

fn spawn_reminder_loop(state: Arc<AppState>, interval_secs: u64, lookahead_days: i64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            let result = {
                let conn = state.db.lock().unwrap();
                scheduler::schedule_reminders(&conn, lookahead_days, Utc::now().naive_utc())
            };
            match result {
                Ok(0) => {}
                Ok(created) => tracing::info!(created, "scheduled appointment reminders"),
                Err(e) => tracing::error!("reminder scheduling failed: {e}"),
            }
        }
    });
}
