//! V4 signed download links for Cloud Storage, using an HMAC key.
//!
//! Follows the `GOOG4-HMAC-SHA256` scheme: canonical request → string to
//! sign → HMAC chain over date / region / service. Only `host` is signed and
//! the payload is unsigned, so the link works for a plain browser GET.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Url;
use sha2::{Digest, Sha256};

use needu_common::error::{AppError, Result};

const ALGORITHM: &str = "GOOG4-HMAC-SHA256";
const REGION: &str = "auto";
const SERVICE: &str = "storage";
const REQUEST_TYPE: &str = "goog4_request";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Longest lifetime the service accepts for a V4 signature (7 days).
pub const MAX_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// RFC 3986 unreserved characters stay as-is.
pub(crate) const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Same as the query set, but object names keep their `/` separators.
const PATH_ENCODE_SET: &AsciiSet = &QUERY_ENCODE_SET.remove(b'/');

/// Produces read-only signed URLs for objects.
#[derive(Clone)]
pub struct UrlSigner {
    access_id: String,
    secret: String,
    endpoint: Url,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("access_id", &self.access_id)
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl UrlSigner {
    pub fn new(access_id: impl Into<String>, secret: impl Into<String>, endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| AppError::Config(format!("Invalid storage endpoint {}: {}", endpoint, e)))?;
        if endpoint.host_str().is_none() {
            return Err(AppError::Config(format!(
                "Storage endpoint {} has no host",
                endpoint
            )));
        }

        Ok(Self {
            access_id: access_id.into(),
            secret: secret.into(),
            endpoint,
        })
    }

    /// Sign a GET link for `bucket/object` valid for `ttl` from now.
    pub fn sign_read(&self, bucket: &str, object: &str, ttl: Duration) -> Result<String> {
        self.sign_read_at(bucket, object, ttl, Utc::now())
    }

    /// Same as [`UrlSigner::sign_read`] with an explicit signing time.
    pub fn sign_read_at(
        &self,
        bucket: &str,
        object: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let expires = if ttl > MAX_EXPIRY {
            tracing::warn!(
                requested_secs = ttl.as_secs(),
                "Signed URL lifetime capped at 7 days"
            );
            MAX_EXPIRY
        } else {
            ttl
        };

        let datetime = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{}/{}/{}/{}", date, REGION, SERVICE, REQUEST_TYPE);
        let credential = format!("{}/{}", self.access_id, scope);

        let canonical_uri = format!(
            "{}/{}/{}",
            self.endpoint.path().trim_end_matches('/'),
            utf8_percent_encode(bucket, PATH_ENCODE_SET),
            utf8_percent_encode(object, PATH_ENCODE_SET)
        );

        // Already in sorted order.
        let params = [
            ("X-Goog-Algorithm", ALGORITHM.to_string()),
            ("X-Goog-Credential", credential),
            ("X-Goog-Date", datetime.clone()),
            ("X-Goog-Expires", expires.as_secs().to_string()),
            ("X-Goog-SignedHeaders", "host".to_string()),
        ];
        let canonical_query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, utf8_percent_encode(v, QUERY_ENCODE_SET)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "GET\n{}\n{}\nhost:{}\n\nhost\n{}",
            canonical_uri,
            canonical_query,
            self.host(),
            UNSIGNED_PAYLOAD
        );

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            datetime,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signature = self.signature(&date, &string_to_sign);

        Ok(format!(
            "{}://{}{}?{}&X-Goog-Signature={}",
            self.endpoint.scheme(),
            self.host(),
            canonical_uri,
            canonical_query,
            signature
        ))
    }

    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    fn signature(&self, date: &str, string_to_sign: &str) -> String {
        let k_date = hmac_sha256(format!("GOOG4{}", self.secret).as_bytes(), date.as_bytes());
        let k_region = hmac_sha256(&k_date, REGION.as_bytes());
        let k_service = hmac_sha256(&k_region, SERVICE.as_bytes());
        let k_signing = hmac_sha256(&k_service, REQUEST_TYPE.as_bytes());
        hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()))
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
