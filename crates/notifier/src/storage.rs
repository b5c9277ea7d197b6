//! Blob storage collaborator.
//!
//! The dispatcher only needs three things from the store: list a session
//! folder, read an object's creation time, and mint a download link.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::utf8_percent_encode;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use needu_common::error::{AppError, Result};
use needu_common::types::ObjectMetadata;

use crate::auth::TokenSource;
use crate::signing::{QUERY_ENCODE_SET, UrlSigner};

/// Blob store operations used by the dispatcher.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Names of every object under `prefix`.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Creation metadata for one object.
    async fn metadata(&self, bucket: &str, name: &str) -> Result<ObjectMetadata>;

    /// Read-only link to `name` that stops working after `ttl`.
    async fn signed_url(&self, bucket: &str, name: &str, ttl: Duration) -> Result<String>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    items: Vec<ListItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    name: String,
}

/// Cloud Storage over the JSON API, with locally signed links.
#[derive(Debug, Clone)]
pub struct GcsBlobStore {
    client: Client,
    base_url: String,
    tokens: Arc<TokenSource>,
    signer: UrlSigner,
}

impl GcsBlobStore {
    pub fn new(client: Client, base_url: &str, tokens: Arc<TokenSource>, signer: UrlSigner) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            signer,
        }
    }

    fn objects_url(&self, bucket: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o",
            self.base_url,
            utf8_percent_encode(bucket, QUERY_ENCODE_SET)
        )
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("prefix", prefix.to_string()),
                ("fields", "items(name),nextPageToken".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .client
                .get(self.objects_url(bucket))
                .bearer_auth(self.tokens.token().await?)
                .query(&query)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::Storage(format!(
                    "List {}/{} failed with {}: {}",
                    bucket, prefix, status, body
                )));
            }

            let page: ListPage = response.json().await?;
            names.extend(page.items.into_iter().map(|item| item.name));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(bucket, prefix, count = names.len(), "Listed objects");
        Ok(names)
    }

    async fn metadata(&self, bucket: &str, name: &str) -> Result<ObjectMetadata> {
        let url = format!(
            "{}/{}",
            self.objects_url(bucket),
            utf8_percent_encode(name, QUERY_ENCODE_SET)
        );

        let response = self
            .client
            .get(url)
            .bearer_auth(self.tokens.token().await?)
            .query(&[("fields", "name,timeCreated")])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::NOT_FOUND => Err(AppError::Storage(format!(
                "Object {}/{} not found",
                bucket, name
            ))),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AppError::Storage(format!(
                    "Metadata for {}/{} failed with {}: {}",
                    bucket, name, status, body
                )))
            }
        }
    }

    async fn signed_url(&self, bucket: &str, name: &str, ttl: Duration) -> Result<String> {
        self.signer.sign_read(bucket, name, ttl)
    }
}
