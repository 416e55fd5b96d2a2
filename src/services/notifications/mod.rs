pub mod email;
pub mod orchestrator;
pub mod registry;
pub mod scheduler;
pub mod sms;
pub mod whatsapp;

use async_trait::async_trait;

use crate::models::Channel;

/// One notification transport. Implementations wrap exactly one external
/// provider and carry no business logic beyond transport mechanics and
/// destination validation.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
    fn validate_destination(&self, destination: &str) -> bool;
    fn channel(&self) -> Channel;
}

/// Phone destinations are accepted when they carry at least 8 digits,
/// whatever the formatting.
pub(crate) fn valid_phone(destination: &str) -> bool {
    destination.chars().filter(|c| c.is_ascii_digit()).count() >= 8
}

/// Structural email check: one `@` with a non-empty local part and a dotted
/// domain, no whitespace.
pub(crate) fn valid_email(destination: &str) -> bool {
    if destination.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = destination.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
