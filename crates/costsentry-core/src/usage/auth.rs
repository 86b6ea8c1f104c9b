//! Credential resolution for the usage API
//!
//! Two mutually exclusive modes: an API-key profile from an OCI credentials
//! file, or the instance-principal identity of the hosting environment. Both
//! resolve to the same signing material, once per cycle.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use config::{File, FileFormat};
use reqwest::Client;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use crate::config::{expand_tilde, CredentialsRef, MonitorConfig};
use crate::error::{Error, Result};

use super::signer::RequestSigner;

/// Instance metadata service, reachable only from OCI compute
const METADATA_BASE: &str = "http://169.254.169.254/opc/v2";

/// Metadata lookups fail fast so a misconfigured ambient mode is prompt
const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Signing identity resolved for one cycle
#[derive(Debug)]
pub struct RequestAuth {
    /// Key id for the `Authorization` header
    pub key_id: String,
    /// RSA key the requests are signed with
    pub private_key: RsaPrivateKey,
    /// Home region, used to pick the usage endpoint
    pub region: String,
}

/// Resolve the signing identity selected by the monitor config.
pub async fn resolve(config: &MonitorConfig, http: &Client) -> Result<RequestAuth> {
    match &config.credentials {
        CredentialsRef::ApiKeyFile { path, profile } => {
            resolve_api_key(path, profile, &config.auth_tenancy)
        }
        CredentialsRef::InstancePrincipal => {
            resolve_instance_principal(&config.auth_tenancy, http).await
        }
    }
}

/// Load an API-key signing identity from a named profile.
fn resolve_api_key(path: &Path, profile: &str, auth_tenancy: &str) -> Result<RequestAuth> {
    if !path.exists() {
        return Err(Error::auth(format!(
            "credentials file not found: {}",
            path.display()
        )));
    }

    let profiles: HashMap<String, HashMap<String, String>> = config::Config::builder()
        .add_source(File::new(&path.to_string_lossy(), FileFormat::Ini))
        .build()
        .map_err(|e| Error::auth(format!("cannot parse credentials file {}: {e}", path.display())))?
        .try_deserialize()
        .map_err(|e| Error::auth(format!("cannot parse credentials file {}: {e}", path.display())))?;

    // The ini source stores section names lowercased.
    let section = profiles.get(&profile.to_ascii_lowercase()).ok_or_else(|| {
        Error::auth(format!(
            "profile `{profile}` not found in {}",
            path.display()
        ))
    })?;

    let user = profile_value(section, "user", profile)?;
    let fingerprint = profile_value(section, "fingerprint", profile)?;
    let region = profile_value(section, "region", profile)?;
    let key_file = expand_tilde(&profile_value(section, "key_file", profile)?);

    let pem = std::fs::read_to_string(&key_file).map_err(|e| {
        Error::auth(format!("cannot read key_file {}: {e}", key_file.display()))
    })?;
    let private_key = parse_private_key_pem(&pem)?;

    debug!(profile, region = %region, "resolved API-key credentials");

    Ok(RequestAuth {
        // The configured tenancy overrides the profile's, so a parent
        // tenancy's key can be used for cross-tenancy queries.
        key_id: format!("{auth_tenancy}/{user}/{fingerprint}"),
        private_key,
        region,
    })
}

fn profile_value(
    section: &HashMap<String, String>,
    key: &str,
    profile: &str,
) -> Result<String> {
    section.get(key).cloned().ok_or_else(|| {
        Error::auth(format!("profile `{profile}` is missing the `{key}` entry"))
    })
}

/// Accept PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1 (`BEGIN RSA PRIVATE KEY`).
fn parse_private_key_pem(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| Error::auth(format!("cannot parse RSA private key: {e}")))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FederationRequest {
    certificate: String,
    public_key: String,
    intermediate_certificates: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FederationResponse {
    token: String,
}

/// Resolve an instance-principal identity: fetch the instance certificates
/// from the metadata service, then exchange them for a security token signed
/// with a fresh session key.
async fn resolve_instance_principal(auth_tenancy: &str, http: &Client) -> Result<RequestAuth> {
    let region = metadata_get(http, "instance/canonicalRegionName").await?;
    let leaf_pem = metadata_get(http, "identity/cert.pem").await?;
    let leaf_key_pem = metadata_get(http, "identity/key.pem").await?;
    let intermediate_pem = metadata_get(http, "identity/intermediate.pem").await?;

    let leaf_key = parse_private_key_pem(&leaf_key_pem)?;
    let fingerprint = certificate_fingerprint(&leaf_pem)?;

    let session_key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048)
        .map_err(|e| Error::auth(format!("failed to generate session key: {e}")))?;
    let session_public_pem = session_key
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| Error::auth(format!("failed to encode session key: {e}")))?;

    let federation_url = Url::parse(&format!("https://auth.{region}.oraclecloud.com/v1/x509"))
        .map_err(|e| Error::auth(format!("invalid federation endpoint for region {region}: {e}")))?;

    let body = serde_json::to_vec(&FederationRequest {
        certificate: strip_pem_armor(&leaf_pem),
        public_key: strip_pem_armor(&session_public_pem),
        intermediate_certificates: vec![strip_pem_armor(&intermediate_pem)],
    })?;

    let signer = RequestSigner::new(
        format!("{auth_tenancy}/fed-x509-sha256/{fingerprint}"),
        leaf_key,
    );
    let mut request = http.post(federation_url.clone()).body(body.clone());
    for (name, value) in signer.sign_post(&federation_url, &body)? {
        request = request.header(name, value);
    }

    let response = request
        .send()
        .await
        .map_err(|e| Error::auth(format!("security token exchange failed: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(Error::auth(format!(
            "security token exchange returned {status}: {detail}"
        )));
    }
    let federation: FederationResponse = response
        .json()
        .await
        .map_err(|e| Error::auth(format!("malformed security token response: {e}")))?;

    info!(region = %region, "resolved instance-principal identity");

    Ok(RequestAuth {
        key_id: format!("ST${}", federation.token),
        private_key: session_key,
        region,
    })
}

async fn metadata_get(http: &Client, path: &str) -> Result<String> {
    let url = format!("{METADATA_BASE}/{path}");
    let response = http
        .get(&url)
        .header("Authorization", "Bearer Oracle")
        .timeout(METADATA_TIMEOUT)
        .send()
        .await
        .map_err(|e| {
            Error::auth(format!(
                "instance metadata service unreachable ({url}): {e}; \
                 instance-principal authentication is only available on OCI compute"
            ))
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::auth(format!(
            "instance metadata service returned {status} for {url}"
        )));
    }
    response
        .text()
        .await
        .map_err(|e| Error::auth(format!("failed reading metadata response from {url}: {e}")))
}

/// Drop the BEGIN/END armor lines, leaving the concatenated base64 body.
fn strip_pem_armor(pem: &str) -> String {
    pem.lines()
        .filter(|line| !line.starts_with("-----"))
        .collect()
}

/// Colon-separated uppercase SHA-256 fingerprint of the certificate DER.
fn certificate_fingerprint(pem: &str) -> Result<String> {
    let der = BASE64
        .decode(strip_pem_armor(pem))
        .map_err(|e| Error::auth(format!("invalid certificate PEM: {e}")))?;
    let encoded = hex::encode_upper(Sha256::digest(der));

    let mut fingerprint = String::with_capacity(encoded.len() + encoded.len() / 2);
    for (i, ch) in encoded.chars().enumerate() {
        if i > 0 && i % 2 == 0 {
            fingerprint.push(':');
        }
        fingerprint.push(ch);
    }
    Ok(fingerprint)
}
