//! Alert delivery channels

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::MonitorConfig;
use crate::error::{Error, Result};

/// Expected prefix of a Feishu bot webhook URL; other URLs are allowed but
/// produce an advisory warning at config load.
pub const FEISHU_WEBHOOK_PREFIX: &str = "https://open.feishu.cn/open-apis/bot/v2/hook/";

/// Fixed timeout for the outbound webhook POST
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Supported alert methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertMethod {
    /// Warning-level log line only
    Log,
    /// Feishu-style webhook POST (plus the log line every method gets)
    Webhook,
}

impl AlertMethod {
    /// Parse a configured method name, case-insensitively.
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_lowercase().as_str() {
            "log" => Some(Self::Log),
            "webhook" => Some(Self::Webhook),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct TextMessagePayload {
    msg_type: &'static str,
    content: TextContent,
}

#[derive(Debug, Serialize)]
struct TextContent {
    text: String,
}

/// Sends alerts through the configured channel
pub struct AlertDispatcher {
    client: Client,
}

impl AlertDispatcher {
    /// Create a new dispatcher
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Dispatch an alert. Fire-and-forget: every failure path is logged and
    /// swallowed so a delivery problem can never abort the cycle that
    /// detected the breach.
    pub async fn dispatch(&self, method: &str, message: &str, config: &MonitorConfig) {
        // Every alert lands in the log regardless of method.
        warn!("ALERT TRIGGERED: {message}");

        match AlertMethod::parse(method) {
            Some(AlertMethod::Log) => {}
            Some(AlertMethod::Webhook) => match config.alerting.webhook_url.as_deref() {
                Some(url) => {
                    if let Err(e) = self.send_webhook(url, message).await {
                        error!(error = %e, "failed to deliver webhook alert");
                    }
                }
                None => {
                    error!("alert method is webhook but no webhook_url is configured");
                }
            },
            None => {
                error!(method, "unsupported alerting method configured");
            }
        }
    }

    /// POST a Feishu-style text message to `url`.
    async fn send_webhook(&self, url: &str, message: &str) -> Result<()> {
        let payload = TextMessagePayload {
            msg_type: "text",
            content: TextContent {
                text: format!("🚨 OCI Billing Alert 🚨\n\n{message}"),
            },
        };

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::delivery(format!("webhook returned {status}: {body}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::delivery(format!("webhook response was not JSON: {e}")))?;

        // Feishu reports success as StatusCode 0 (legacy) or code 0.
        let provider_ok = body.get("StatusCode").and_then(serde_json::Value::as_i64) == Some(0)
            || body.get("code").and_then(serde_json::Value::as_i64) == Some(0);
        if !provider_ok {
            return Err(Error::delivery(format!("webhook rejected the message: {body}")));
        }

        info!("webhook alert delivered");
        Ok(())
    }
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
