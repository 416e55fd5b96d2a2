use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use super::NotificationChannel;
use crate::models::Channel;

/// WhatsApp messages ride Twilio's messaging API with `whatsapp:`-prefixed
/// addresses.
pub struct TwilioWhatsAppChannel {
    account_sid: String,
    auth_token: String,
    from_number: String,
    client: reqwest::Client,
}

impl TwilioWhatsAppChannel {
    pub fn new(account_sid: String, auth_token: String, from_number: String, timeout: Duration) -> Self {
        Self {
            account_sid,
            auth_token,
            from_number,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl NotificationChannel for TwilioWhatsAppChannel {
    async fn send(&self, to: &str, _subject: &str, body: &str) -> anyhow::Result<()> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );

        let to = format!("whatsapp:{to}");
        let from = format!("whatsapp:{}", self.from_number);

        self.client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to.as_str()), ("From", from.as_str()), ("Body", body)])
            .send()
            .await
            .context("failed to send Twilio WhatsApp message")?
            .error_for_status()
            .context("Twilio API returned error")?;

        Ok(())
    }

    fn validate_destination(&self, destination: &str) -> bool {
        super::valid_phone(destination)
    }

    fn channel(&self) -> Channel {
        Channel::WhatsApp
    }
}
