//! OAuth bearer tokens for Google APIs.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use needu_common::error::{AppError, Result};

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh this long before the server-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Where bearer tokens come from.
#[derive(Debug)]
enum Source {
    /// A fixed token, e.g. from `gcloud auth print-access-token`.
    Static(String),
    /// The instance metadata server of the runtime's service account.
    Metadata { client: Client, url: String },
}

/// Supplies bearer tokens for the storage and Firestore clients.
#[derive(Debug)]
pub struct TokenSource {
    source: Source,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn from_static(token: impl Into<String>) -> Self {
        Self {
            source: Source::Static(token.into()),
            cache: Mutex::new(None),
        }
    }

    pub fn metadata(client: Client) -> Self {
        Self::metadata_at(client, METADATA_TOKEN_URL)
    }

    pub fn metadata_at(client: Client, url: impl Into<String>) -> Self {
        Self {
            source: Source::Metadata {
                client,
                url: url.into(),
            },
            cache: Mutex::new(None),
        }
    }

    /// Return a valid access token, fetching a new one when the cache is stale.
    pub async fn token(&self) -> Result<String> {
        let (client, url) = match &self.source {
            Source::Static(token) => return Ok(token.clone()),
            Source::Metadata { client, url } => (client, url),
        };

        let mut cached = self.cache.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let response = client
            .get(url.as_str())
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AppError::Auth(format!(
                "Metadata server returned {}",
                response.status()
            )));
        }

        let fetched: MetadataToken = response.json().await?;
        let lifetime = Duration::from_secs(fetched.expires_in).saturating_sub(EXPIRY_MARGIN);
        tracing::debug!(expires_in = fetched.expires_in, "Fetched access token");

        *cached = Some(CachedToken {
            value: fetched.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(fetched.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let source = TokenSource::from_static("ya29.test");
        assert_eq!(source.token().await.unwrap(), "ya29.test");
    }

    #[tokio::test]
    async fn test_metadata_unreachable() {
        // Port 9 (discard) on localhost is not serving HTTP.
        let source = TokenSource::metadata_at(Client::new(), "http://127.0.0.1:9/token");
        assert!(source.token().await.is_err());
    }
}
