use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub mailgun_api_key: String,
    pub mailgun_domain: String,
    pub mailgun_from: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_sms_number: String,
    pub twilio_whatsapp_number: String,
    /// Per-transport delivery attempts before falling back to the next channel.
    pub max_send_attempts: u32,
    /// Base for the exponential backoff between attempts, in seconds.
    pub backoff_base_secs: u64,
    /// Hard timeout applied to each outbound transport call, in seconds.
    pub send_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub reminder_interval_secs: u64,
    pub reminder_lookahead_days: i64,
    pub calendar_cache_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "salonbook.db".to_string()),
            mailgun_api_key: env::var("MAILGUN_API_KEY").unwrap_or_default(),
            mailgun_domain: env::var("MAILGUN_DOMAIN").unwrap_or_default(),
            mailgun_from: env::var("MAILGUN_FROM")
                .unwrap_or_else(|_| "no-reply@salonbook.local".to_string()),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_sms_number: env::var("TWILIO_SMS_NUMBER").unwrap_or_default(),
            twilio_whatsapp_number: env::var("TWILIO_WHATSAPP_NUMBER").unwrap_or_default(),
            max_send_attempts: env_parse("MAX_SEND_ATTEMPTS", 3),
            backoff_base_secs: env_parse("BACKOFF_BASE_SECS", 1),
            send_timeout_secs: env_parse("SEND_TIMEOUT_SECS", 30),
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", 300),
            reminder_interval_secs: env_parse("REMINDER_INTERVAL_SECS", 86_400),
            reminder_lookahead_days: env_parse("REMINDER_LOOKAHEAD_DAYS", 2),
            calendar_cache_ttl_secs: env_parse("CALENDAR_CACHE_TTL_SECS", 60),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
