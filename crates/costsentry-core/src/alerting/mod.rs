//! Alerting for costsentry
//!
//! Formats threshold-breach messages and delivers them through the configured
//! channel. Delivery is best-effort: failures are logged, never propagated.

mod dispatcher;

pub use dispatcher::{AlertDispatcher, AlertMethod, FEISHU_WEBHOOK_PREFIX};
