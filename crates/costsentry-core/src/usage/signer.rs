//! OCI HTTP-signature request signing
//!
//! Implements the draft-cavage signature scheme the OCI APIs require:
//! rsa-sha256 over a fixed header list, carried in an `Authorization:
//! Signature ...` header.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{Error, Result};

/// Headers covered by the signature on a POST, in signing-string order
const SIGNED_HEADERS: &str =
    "date (request-target) host content-length content-type x-content-sha256";

/// Signs requests for one resolved identity
pub struct RequestSigner {
    key_id: String,
    key: RsaPrivateKey,
}

impl RequestSigner {
    /// Create a signer from a key id and its RSA private key
    pub fn new(key_id: String, key: RsaPrivateKey) -> Self {
        Self { key_id, key }
    }

    /// Sign a JSON POST to `url`, returning the headers to attach.
    ///
    /// The returned set includes `date`, `content-type`, `x-content-sha256`
    /// and `authorization`; `host` and `content-length` are emitted by the
    /// HTTP client and must match what was signed, so the body passed here
    /// has to be sent byte-for-byte.
    pub fn sign_post(&self, url: &Url, body: &[u8]) -> Result<Vec<(&'static str, String)>> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        self.sign_post_at(url, body, &date)
    }

    fn sign_post_at(
        &self,
        url: &Url,
        body: &[u8],
        date: &str,
    ) -> Result<Vec<(&'static str, String)>> {
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(Error::auth(format!("endpoint URL has no host: {url}"))),
        };

        let content_sha256 = BASE64.encode(Sha256::digest(body));
        let signing_string = format!(
            "date: {date}\n\
             (request-target): post {path}\n\
             host: {host}\n\
             content-length: {length}\n\
             content-type: application/json\n\
             x-content-sha256: {content_sha256}",
            path = url.path(),
            length = body.len(),
        );

        let digest = Sha256::digest(signing_string.as_bytes());
        let signature = self
            .key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| Error::auth(format!("request signing failed: {e}")))?;

        let authorization = format!(
            "Signature version=\"1\",headers=\"{SIGNED_HEADERS}\",keyId=\"{key_id}\",\
             algorithm=\"rsa-sha256\",signature=\"{signature}\"",
            key_id = self.key_id,
            signature = BASE64.encode(signature),
        );

        Ok(vec![
            ("date", date.to_string()),
            ("content-type", "application/json".to_string()),
            ("x-content-sha256", content_sha256),
            ("authorization", authorization),
        ])
    }
}
