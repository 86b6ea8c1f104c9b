//! Wire types for the Usage API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::START_TIME_FORMAT;

/// Body of a `RequestSummarizedUsages` call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizedUsagesRequest {
    /// Tenancy whose usage is queried
    pub tenant_id: String,
    /// Inclusive start of the usage window (UTC)
    pub time_usage_started: String,
    /// Exclusive end of the usage window (UTC)
    pub time_usage_ended: String,
    /// Aggregation granularity
    pub granularity: String,
    /// Metric to summarize
    pub query_type: String,
}

impl SummarizedUsagesRequest {
    /// A total-cost summary over `[started, ended)`.
    pub fn total_cost(tenant_id: String, started: DateTime<Utc>, ended: DateTime<Utc>) -> Self {
        Self {
            tenant_id,
            time_usage_started: started.format(START_TIME_FORMAT).to_string(),
            time_usage_ended: ended.format(START_TIME_FORMAT).to_string(),
            granularity: "TOTAL".to_string(),
            query_type: "COST".to_string(),
        }
    }
}

/// Response of a `RequestSummarizedUsages` call
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizedUsages {
    /// Usage line items; absent or empty when nothing matched the window
    #[serde(default)]
    pub items: Vec<UsageSummary>,
}

/// One usage line item
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    /// Computed cost for the line, absent for zero-cost rows
    #[serde(default)]
    pub computed_amount: Option<f64>,
    /// ISO currency code of the amount
    #[serde(default)]
    pub currency: Option<String>,
}
