//! This module sends notifications to a webhook

use std::error::Error;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use url::Url;

/// Where notifications end up.
///
/// The production implementation is [`WebhookNotifier`]; tests usually swap in a scripted one.
#[async_trait]
pub trait Notifier {
    /// Send `text` to the channel `chat_id`.
    ///
    /// Returns the status code the transport reported (200 means the notification went through).
    /// A transport failure (no response at all) is an `Err`.
    async fn notify(&self, chat_id: i64, text: &str) -> Result<u16, Box<dyn Error>>;
}

/// A [`Notifier`] that POSTs to a webhook URL, with a Telegram-bot-style JSON body
/// (`{"chat_id": ..., "text": ...}`)
pub struct WebhookNotifier {
    webhook_url: Url,
}

impl WebhookNotifier {
    pub fn new(webhook_url: Url) -> Self {
        Self { webhook_url }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, chat_id: i64, text: &str) -> Result<u16, Box<dyn Error>> {
        let payload = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let response = reqwest::Client::new()
            .post(self.webhook_url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await?;

        Ok(response.status().as_u16())
    }
}
