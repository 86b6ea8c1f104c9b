//! Monitor configuration loading and validation
//!
//! The monitor config is an INI file with `[OCI]`, `[Billing]` and
//! `[Alerting]` sections. It is reloaded and revalidated on every cycle, so
//! edits take effect without a restart.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use config::{File, FileFormat};
use serde::Deserialize;
use tracing::{info, warn};

use crate::alerting::{AlertMethod, FEISHU_WEBHOOK_PREFIX};
use crate::error::{Error, Result};

/// Timestamp format accepted for `start_time`
pub const START_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// How the usage API request is authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsRef {
    /// API-key signing with a named profile from an OCI credentials file
    ApiKeyFile {
        /// Path to the credentials file (after `~` expansion)
        path: PathBuf,
        /// Profile name within the file
        profile: String,
    },
    /// Instance-principal identity from the hosting environment
    InstancePrincipal,
}

/// Alerting section of the monitor config
#[derive(Debug, Clone)]
pub struct AlertingSettings {
    /// Alert method as configured (matched case-insensitively at dispatch)
    pub method: String,
    /// Webhook URL, present whenever the method is `webhook`
    pub webhook_url: Option<String>,
}

/// Validated monitor configuration for one cycle
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// How to authenticate
    pub credentials: CredentialsRef,
    /// Tenancy used for authentication
    pub auth_tenancy: String,
    /// Tenancy whose usage is queried (defaults to `auth_tenancy`)
    pub target_tenancy: String,
    /// Accumulate cost from this instant forward
    pub start_time: DateTime<Utc>,
    /// Alert when cumulative cost strictly exceeds this
    pub cost_threshold: f64,
    /// ISO currency code used to request and filter usage lines
    pub currency: String,
    /// Alerting settings
    pub alerting: AlertingSettings,
}

#[derive(Debug, Deserialize)]
struct RawMonitorConfig {
    oci: Option<RawOciSection>,
    billing: Option<RawBillingSection>,
    alerting: Option<RawAlertingSection>,
}

#[derive(Debug, Deserialize)]
struct RawOciSection {
    config_file: Option<String>,
    profile_name: Option<String>,
    tenancy_ocid: Option<String>,
    target_tenancy_ocid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBillingSection {
    start_time: Option<String>,
    cost_threshold: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAlertingSection {
    method: Option<String>,
    webhook_url: Option<String>,
}

impl MonitorConfig {
    /// Load and validate the monitor config at `path`.
    ///
    /// `instance_principal` selects ambient authentication; in that mode the
    /// `config_file` and `profile_name` keys are not required.
    pub fn load(path: &Path, instance_principal: bool) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let raw: RawMonitorConfig = config::Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Ini))
            .build()
            .map_err(|e| Error::config(format!("failed to parse {}: {e}", path.display())))?
            .try_deserialize()
            .map_err(|e| Error::config(format!("failed to parse {}: {e}", path.display())))?;

        let oci = raw
            .oci
            .ok_or_else(|| Error::config("missing required section [OCI]"))?;
        let billing = raw
            .billing
            .ok_or_else(|| Error::config("missing required section [Billing]"))?;
        let alerting = raw
            .alerting
            .ok_or_else(|| Error::config("missing required section [Alerting]"))?;

        let auth_tenancy = require(oci.tenancy_ocid, "tenancy_ocid", "OCI")?;
        let target_tenancy = oci
            .target_tenancy_ocid
            .unwrap_or_else(|| auth_tenancy.clone());

        let credentials = if instance_principal {
            CredentialsRef::InstancePrincipal
        } else {
            let config_file = require(oci.config_file, "config_file", "OCI")?;
            let profile = require(oci.profile_name, "profile_name", "OCI")?;
            CredentialsRef::ApiKeyFile {
                path: expand_tilde(&config_file),
                profile,
            }
        };

        let start_time_raw = require(billing.start_time, "start_time", "Billing")?;
        let start_time = NaiveDateTime::parse_from_str(&start_time_raw, START_TIME_FORMAT)
            .map_err(|_| {
                Error::config(format!(
                    "start_time `{start_time_raw}` does not match the format YYYY-MM-DDTHH:MM:SSZ"
                ))
            })?
            .and_utc();

        let threshold_raw = require(billing.cost_threshold, "cost_threshold", "Billing")?;
        let cost_threshold = threshold_raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
            .ok_or_else(|| {
                Error::config(format!("cost_threshold `{threshold_raw}` is not a number"))
            })?;
        if cost_threshold < 0.0 {
            return Err(Error::config(format!(
                "cost_threshold `{threshold_raw}` must be non-negative"
            )));
        }

        let currency = require(billing.currency, "currency", "Billing")?;

        let method = require(alerting.method, "method", "Alerting")?;
        if matches!(AlertMethod::parse(&method), Some(AlertMethod::Webhook)) {
            match &alerting.webhook_url {
                None => {
                    return Err(Error::config(
                        "method is webhook but webhook_url is not configured in [Alerting]",
                    ))
                }
                Some(url) if !url.starts_with(FEISHU_WEBHOOK_PREFIX) => {
                    // Advisory only; custom endpoints are allowed.
                    warn!(webhook_url = %url, "webhook_url does not look like a Feishu bot hook");
                }
                Some(_) => {}
            }
        }

        info!(path = %path.display(), "configuration loaded");

        Ok(Self {
            credentials,
            auth_tenancy,
            target_tenancy,
            start_time,
            cost_threshold,
            currency,
            alerting: AlertingSettings {
                method,
                webhook_url: alerting.webhook_url,
            },
        })
    }

    /// The configured start time, rendered back in the config file format
    pub fn start_time_str(&self) -> String {
        self.start_time.format(START_TIME_FORMAT).to_string()
    }
}

fn require(value: Option<String>, key: &str, section: &str) -> Result<String> {
    value.ok_or_else(|| Error::config(format!("missing required key `{key}` in [{section}]")))
}

/// Expand a leading `~/` to the user's home directory
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = directories::UserDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
