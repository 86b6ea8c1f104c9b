//! # CostSentry
//!
//! Cost guard for OCI tenancies.
//!
//! CostSentry polls the OCI Usage API on a fixed schedule, accumulates cost
//! since a configured start date, and raises an alert through a log sink or
//! a Feishu-style webhook when a threshold is exceeded.
//!
//! ## Architecture
//!
//! - **Config**: INI monitor config, reloaded and revalidated every cycle
//! - **Usage**: signed `RequestSummarizedUsages` calls (API-key file or
//!   instance-principal authentication)
//! - **Alerting**: best-effort dispatch, log line or webhook POST
//! - **Monitor**: the check cycle and its fixed-interval scheduler
//!
//! ## Quick Start
//!
//! ```bash
//! # One check against the config next to the binary
//! costsentry --run-once
//!
//! # Check every 6 hours with an explicit config
//! costsentry --config /etc/costsentry/config.ini --interval 6
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod alerting;
pub mod config;
pub mod error;
pub mod monitor;
pub mod usage;

pub use config::MonitorConfig;
pub use error::{Error, Result};
