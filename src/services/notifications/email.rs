use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use super::NotificationChannel;
use crate::models::Channel;

pub struct MailgunEmailChannel {
    api_key: String,
    domain: String,
    from: String,
    client: reqwest::Client,
}

impl MailgunEmailChannel {
    pub fn new(api_key: String, domain: String, from: String, timeout: Duration) -> Self {
        Self {
            api_key,
            domain,
            from,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl NotificationChannel for MailgunEmailChannel {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let url = format!("https://api.mailgun.net/v3/{}/messages", self.domain);

        self.client
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .form(&[
                ("from", self.from.as_str()),
                ("to", to),
                ("subject", subject),
                ("text", body),
            ])
            .send()
            .await
            .context("failed to send Mailgun email")?
            .error_for_status()
            .context("Mailgun API returned error")?;

        Ok(())
    }

    fn validate_destination(&self, destination: &str) -> bool {
        super::valid_email(destination)
    }

    fn channel(&self) -> Channel {
        Channel::Email
    }
}
