use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Channel, NotificationStatus, User};
use crate::services::notifications::registry::ChannelRegistry;
use crate::services::notifications::NotificationChannel;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Multiplied by 2^attempt between attempts.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

/// Delivers one pending message: preferred channel first with retries, then
/// the fallback channels. Idempotent for already-processed messages. The DB
/// lock is never held across a send or a backoff sleep.
pub async fn deliver(
    db: &Arc<Mutex<Connection>>,
    registry: &ChannelRegistry,
    policy: &RetryPolicy,
    message_id: &str,
) -> anyhow::Result<bool> {
    let (message, user) = {
        let conn = db.lock().unwrap();
        let Some(message) = queries::get_notification(&conn, message_id)? else {
            anyhow::bail!("notification {message_id} not found");
        };

        if message.status != NotificationStatus::Pending {
            tracing::debug!(
                message_id,
                status = message.status.as_str(),
                "message already processed"
            );
            return Ok(message.status == NotificationStatus::Sent);
        }

        let user = queries::get_user(&conn, &message.user_id)?;
        (message, user)
    };

    let Some(user) = user else {
        tracing::warn!(message_id, "recipient no longer exists, marking failed");
        let conn = db.lock().unwrap();
        queries::mark_notification_failed(&conn, message_id)?;
        return Ok(false);
    };

    for strategy in registry.ordered_for(message.channel) {
        let destination = destination_for(strategy.channel(), &user);

        if destination.is_empty() || !strategy.validate_destination(&destination) {
            tracing::warn!(
                message_id,
                channel = strategy.channel().as_str(),
                "invalid or missing destination, skipping channel"
            );
            continue;
        }

        if send_with_retry(strategy, &destination, &message.subject, &message.body, policy).await {
            let conn = db.lock().unwrap();
            queries::mark_notification_sent(
                &conn,
                message_id,
                strategy.channel(),
                &Utc::now().naive_utc(),
            )?;
            tracing::info!(
                message_id,
                channel = strategy.channel().as_str(),
                "notification sent"
            );
            return Ok(true);
        }
    }

    let conn = db.lock().unwrap();
    queries::mark_notification_failed(&conn, message_id)?;
    tracing::warn!(message_id, "all channels exhausted, marking failed");
    Ok(false)
}

fn destination_for(channel: Channel, user: &User) -> String {
    match channel {
        Channel::Email => user.email.clone().unwrap_or_default(),
        Channel::Sms | Channel::WhatsApp => user.phone.clone().unwrap_or_default(),
    }
}

/// Retries one transport with exponential backoff before the orchestrator
/// falls back to the next channel. Transport errors count as failed attempts.
async fn send_with_retry(
    strategy: &dyn NotificationChannel,
    to: &str,
    subject: &str,
    body: &str,
    policy: &RetryPolicy,
) -> bool {
    for attempt in 1..=policy.max_attempts {
        match strategy.send(to, subject, body).await {
            Ok(()) => return true,
            Err(e) => {
                tracing::warn!(
                    channel = strategy.channel().as_str(),
                    attempt,
                    "delivery attempt failed: {e}"
                );
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.backoff_base * 2u32.pow(attempt)).await;
        }
    }
    false
}
