use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde_json::json;
use url::Url;

use super::notifier::{AlertSink, ReconcileAlert};

/// Posts reconciliation alerts as JSON to an operator webhook.
pub(crate) struct WebhookAlertSink {
    webhook_url: Url,
    client: Client,
}

impl WebhookAlertSink {
    pub(crate) fn new(webhook_url: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .context("failed to build alert webhook client")?;

        Ok(Self {
            webhook_url,
            client,
        })
    }
}

pub(crate) fn summary_line(alert: &ReconcileAlert) -> String {
    let mut line = format!(
        "[{}] {} {} needs reconciliation at {}",
        alert.environment,
        alert.service_name,
        alert.component,
        alert.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    if let Some(message) = alert.message.as_ref().filter(|m| !m.trim().is_empty()) {
        line.push_str(": ");
        line.push_str(message.trim());
    }
    line
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn send(&self, alert: &ReconcileAlert) -> Result<()> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&json!({ "text": summary_line(alert), "alert": alert }))
            .send()
            .await
            .map_err(sanitize_reqwest_error)?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "alert webhook returned non-success status: {}",
            response.status()
        ))
    }

    fn sink_name(&self) -> &'static str {
        "webhook"
    }
}

// reqwest errors carry the URL, which may hold a token.
fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("alert webhook request timed out");
    }
    if error.is_connect() {
        return anyhow!("alert webhook connection failed");
    }
    anyhow!("alert webhook request failed")
}
