//! Delivers notifications to an HTTP endpoint as JSON.

use async_trait::async_trait;
use engine::{DispatchError, Notification, NotificationDispatcher};

#[derive(Debug)]
pub struct WebhookDispatcher {
    client: reqwest::Client,
    url: String,
}

impl WebhookDispatcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    async fn publish(&self, notification: &Notification) -> Result<(), DispatchError> {
        self.client
            .post(&self.url)
            .header("idempotency-key", &notification.idempotency_key)
            .json(notification)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| DispatchError(format!("webhook {}: {err}", self.url)))?;
        Ok(())
    }
}
