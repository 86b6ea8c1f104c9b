//! One billing check: load config, fetch usage, compare, dispatch

use std::path::PathBuf;

use tracing::{error, info};

use crate::alerting::AlertDispatcher;
use crate::config::MonitorConfig;
use crate::usage::UsageClient;

/// How a cycle ended. Purely observational; no path raises.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Config failed to load or validate; cycle skipped
    ConfigFailed,
    /// Usage fetch failed; cycle skipped without alerting
    FetchFailed,
    /// Cumulative cost at or below the threshold
    WithinThreshold(f64),
    /// Cumulative cost strictly above the threshold; alert dispatched
    ThresholdExceeded(f64),
}

/// Runs one evaluation of cost against threshold
pub struct CheckCycle {
    config_path: PathBuf,
    instance_principal: bool,
    usage: UsageClient,
    dispatcher: AlertDispatcher,
}

impl CheckCycle {
    /// Create a cycle reading its config from `config_path` on every run
    pub fn new(config_path: PathBuf, instance_principal: bool) -> Self {
        Self {
            config_path,
            instance_principal,
            usage: UsageClient::new(),
            dispatcher: AlertDispatcher::new(),
        }
    }

    /// Replace the usage client (dedicated endpoints, tests)
    #[must_use]
    pub fn with_usage_client(mut self, usage: UsageClient) -> Self {
        self.usage = usage;
        self
    }

    /// Execute one check. Never raises: every failure path is logged and the
    /// outcome returned so the scheduler (or a test) can observe it.
    pub async fn run_once(&self) -> CycleOutcome {
        info!(config = %self.config_path.display(), "starting billing check");
        let outcome = self.execute().await;
        info!("billing check finished");
        outcome
    }

    async fn execute(&self) -> CycleOutcome {
        // Reloaded every cycle so config edits apply without a restart.
        let config = match MonitorConfig::load(&self.config_path, self.instance_principal) {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "cannot run check: configuration failed to load");
                return CycleOutcome::ConfigFailed;
            }
        };

        let cost = match self.usage.fetch_cumulative_cost(&config).await {
            Ok(cost) => cost,
            Err(e) => {
                // No alert on fetch failure: an unreadable total is not a
                // breach, even if it masks one.
                error!(
                    error = %e,
                    target_tenancy = %config.target_tenancy,
                    "could not fetch cumulative usage; skipping this check"
                );
                return CycleOutcome::FetchFailed;
            }
        };

        info!(
            "Cumulative cost for tenancy {} since {}: {:.2} {}",
            config.target_tenancy,
            config.start_time_str(),
            cost,
            config.currency
        );

        if cost > config.cost_threshold {
            let message = breach_message(&config, cost);
            self.dispatcher
                .dispatch(&config.alerting.method, &message, &config)
                .await;
            CycleOutcome::ThresholdExceeded(cost)
        } else {
            info!(
                "Cumulative cost is within the threshold ({:.2} {})",
                config.cost_threshold, config.currency
            );
            CycleOutcome::WithinThreshold(cost)
        }
    }
}

fn breach_message(config: &MonitorConfig, cost: f64) -> String {
    format!(
        "OCI tenancy {} cumulative cost {:.2} {} has exceeded the threshold of {:.2} {} since {}.",
        config.target_tenancy,
        cost,
        config.currency,
        config.cost_threshold,
        config.currency,
        config.start_time_str()
    )
}
