//! OCI Usage API access
//!
//! Resolves a signing identity (API-key file or instance principal), signs
//! requests with the OCI HTTP-signature scheme, and sums the returned cost
//! lines for the configured currency.

mod auth;
mod client;
mod models;
mod signer;

pub use client::UsageClient;
pub use models::{SummarizedUsages, SummarizedUsagesRequest, UsageSummary};
pub use signer::RequestSigner;
