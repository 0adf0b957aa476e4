//! Alert sink: `emit(level, message, context)`.
//!
//! Webhook-or-log-line fallback, structured via `tracing` fields.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use vod_models::AlertLevel;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct WebhookField {
    k: String,
    v: String,
}

#[derive(Serialize)]
struct WebhookPayload {
    text: String,
    fields: Vec<WebhookField>,
}

/// Alert sink holding the optional webhook endpoint, read once at startup.
#[derive(Clone)]
pub struct AlertSink {
    http: reqwest::Client,
    webhook_url: Option<String>,
}

impl AlertSink {
    pub fn from_env() -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url: std::env::var("WEBHOOK_URL").ok(),
        }
    }

    /// Emits an alert: POSTs to the webhook if configured, within a 10s
    /// budget; always also logs at the matching level with `target: "alert"`.
    pub async fn emit(&self, level: AlertLevel, message: &str, context: BTreeMap<String, String>) {
        match level {
            AlertLevel::Info => info!(target: "alert", message, ?context),
            AlertLevel::Warning => warn!(target: "alert", message, ?context),
            AlertLevel::Error => error!(target: "alert", message, ?context),
        }

        let Some(url) = &self.webhook_url else {
            return;
        };

        let payload = WebhookPayload {
            text: format!("[{}] {}", level.as_label(), message),
            fields: context.into_iter().map(|(k, v)| WebhookField { k, v }).collect(),
        };

        let result = self
            .http
            .post(url)
            .timeout(WEBHOOK_TIMEOUT)
            .json(&payload)
            .send()
            .await;

        if let Err(e) = result {
            error!(target: "alert", error = %e, "failed to send alert to webhook");
        }
    }

    pub async fn info(&self, message: &str, context: BTreeMap<String, String>) {
        self.emit(AlertLevel::Info, message, context).await;
    }

    pub async fn error(&self, message: &str, context: BTreeMap<String, String>) {
        self.emit(AlertLevel::Error, message, context).await;
    }
}

trait AlertLevelExt {
    fn as_label(&self) -> &'static str;
}

impl AlertLevelExt for AlertLevel {
    fn as_label(&self) -> &'static str {
        match self {
            AlertLevel::Info => "INFO",
            AlertLevel::Warning => "WARNING",
            AlertLevel::Error => "ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_shape_matches_webhook_contract() {
        let mut context = BTreeMap::new();
        context.insert("video_id".to_string(), "abc123".to_string());
        let payload = WebhookPayload {
            text: "[ERROR] pipeline failed".to_string(),
            fields: context.into_iter().map(|(k, v)| WebhookField { k, v }).collect(),
        };
        let json = json!(payload);
        assert_eq!(json["text"], "[ERROR] pipeline failed");
        assert_eq!(json["fields"][0]["k"], "video_id");
        assert_eq!(json["fields"][0]["v"], "abc123");
    }
}
