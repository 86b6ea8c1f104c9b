//! Usage API client

use chrono::Utc;
use reqwest::{Client, StatusCode};
use tracing::{info, warn};
use url::Url;

use crate::config::MonitorConfig;
use crate::error::{Error, Result};

use super::auth;
use super::models::{SummarizedUsages, SummarizedUsagesRequest, UsageSummary};
use super::signer::RequestSigner;

/// Queries cumulative cost from the Usage API
pub struct UsageClient {
    http: Client,
    endpoint: Option<Url>,
}

impl UsageClient {
    /// Create a client against the regional endpoint derived from the
    /// resolved credentials. No request timeout is configured; the webhook
    /// path is the only outbound call with one.
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            endpoint: None,
        }
    }

    /// Create a client pinned to a fixed endpoint (dedicated endpoints,
    /// tests).
    pub fn with_endpoint(endpoint: Url) -> Self {
        Self {
            http: Client::new(),
            endpoint: Some(endpoint),
        }
    }

    /// Fetch the cumulative cost for the configured tenancy over
    /// `[start_time, now())`, summing only lines in the configured currency.
    pub async fn fetch_cumulative_cost(&self, config: &MonitorConfig) -> Result<f64> {
        let auth = auth::resolve(config, &self.http).await?;
        let signer = RequestSigner::new(auth.key_id, auth.private_key);

        let endpoint = match &self.endpoint {
            Some(url) => url.clone(),
            None => Url::parse(&format!(
                "https://usageapi.{}.oci.oraclecloud.com",
                auth.region
            ))
            .map_err(|e| Error::service(None, format!("invalid usage endpoint: {e}")))?,
        };
        let url = endpoint
            .join("/20200107/usage")
            .map_err(|e| Error::service(None, format!("invalid usage endpoint: {e}")))?;

        let now = Utc::now();
        info!(
            target_tenancy = %config.target_tenancy,
            from = %config.start_time_str(),
            "requesting summarized usage"
        );

        let request =
            SummarizedUsagesRequest::total_cost(config.target_tenancy.clone(), config.start_time, now);
        let body = serde_json::to_vec(&request)?;

        let mut builder = self.http.post(url.clone()).body(body.clone());
        for (name, value) in signer.sign_post(&url, &body)? {
            builder = builder.header(name, value);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::service(
                Some(status.as_u16()),
                format!(
                    "{detail}; check that tenancy {} has permission to read usage for tenancy {}",
                    config.auth_tenancy, config.target_tenancy
                ),
            ));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::service(Some(status.as_u16()), detail));
        }

        let usages: SummarizedUsages = response.json().await?;
        if usages.items.is_empty() {
            info!(target_tenancy = %config.target_tenancy, "no usage data in the requested window");
            return Ok(0.0);
        }

        info!(
            target_tenancy = %config.target_tenancy,
            lines = usages.items.len(),
            "received usage lines"
        );
        Ok(sum_matching_currency(&usages.items, &config.currency))
    }
}

impl Default for UsageClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Sum `computed_amount` over lines in `currency`; other currencies are
/// logged and skipped, never summed.
fn sum_matching_currency(items: &[UsageSummary], currency: &str) -> f64 {
    let mut total = 0.0;
    for item in items {
        let Some(amount) = item.computed_amount else {
            continue;
        };
        match item.currency.as_deref() {
            Some(line_currency) if line_currency == currency => total += amount,
            other => {
                warn!(
                    amount,
                    line_currency = other.unwrap_or("N/A"),
                    target_currency = currency,
                    "usage line currency does not match; skipped"
                );
            }
        }
    }
    total
}
