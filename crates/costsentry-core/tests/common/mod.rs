//! Shared fixtures for the mock-server integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::OnceLock;

use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;

pub const AUTH_TENANCY: &str = "ocid1.tenancy.oc1..auth";
pub const TARGET_TENANCY: &str = "ocid1.tenancy.oc1..target";
pub const START_TIME: &str = "2024-07-01T00:00:00Z";

/// Generating an RSA key is slow; share one across the tests in a binary.
fn key_pem() -> &'static str {
    static KEY_PEM: OnceLock<String> = OnceLock::new();
    KEY_PEM.get_or_init(|| {
        RsaPrivateKey::new(&mut rand::thread_rng(), 2048)
            .unwrap()
            .to_pkcs8_pem(LineEnding::LF)
            .unwrap()
            .as_str()
            .to_owned()
    })
}

/// A monitor config plus the credentials it points at, in a temp dir
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub config_path: PathBuf,
}

/// Write an API key, an OCI credentials file and a monitor config.
pub fn write_fixture(threshold: &str, method: &str, webhook_url: Option<&str>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();

    let key_path = dir.path().join("api_key.pem");
    std::fs::write(&key_path, key_pem()).unwrap();

    let creds_path = dir.path().join("oci_config");
    std::fs::write(
        &creds_path,
        format!(
            "[DEFAULT]\nuser = ocid1.user.oc1..tester\nfingerprint = aa:bb:cc:dd\n\
             tenancy = {AUTH_TENANCY}\nregion = us-ashburn-1\nkey_file = {}\n",
            key_path.display()
        ),
    )
    .unwrap();

    let mut config = format!(
        "[OCI]\nconfig_file = {}\nprofile_name = DEFAULT\ntenancy_ocid = {AUTH_TENANCY}\n\
         target_tenancy_ocid = {TARGET_TENANCY}\n\n\
         [Billing]\nstart_time = {START_TIME}\ncost_threshold = {threshold}\ncurrency = USD\n\n\
         [Alerting]\nmethod = {method}\n",
        creds_path.display()
    );
    if let Some(url) = webhook_url {
        config.push_str(&format!("webhook_url = {url}\n"));
    }

    let config_path = dir.path().join("config.ini");
    std::fs::write(&config_path, config).unwrap();

    Fixture { dir, config_path }
}

/// A Usage API response body with the given (amount, currency) lines.
pub fn usage_response(items: &[(f64, &str)]) -> serde_json::Value {
    serde_json::json!({
        "items": items
            .iter()
            .map(|(amount, currency)| serde_json::json!({
                "tenantId": TARGET_TENANCY,
                "computedAmount": amount,
                "currency": currency,
            }))
            .collect::<Vec<_>>()
    })
}
