//! Shared application state for the Axum trigger service.

use std::sync::Arc;
use std::time::Duration;

use needu_common::config::AppConfig;
use needu_notifier::auth::TokenSource;
use needu_notifier::signing::UrlSigner;
use needu_notifier::sms::TextbeltGateway;
use needu_notifier::storage::GcsBlobStore;
use needu_notifier::users::FirestoreUserStore;
use needu_notifier::{DispatcherConfig, NotificationDispatcher};

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<NotificationDispatcher>,
}

impl AppState {
    pub fn new(dispatcher: NotificationDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Wire the production collaborators (Cloud Storage, Firestore, Textbelt).
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let tokens = Arc::new(match &config.gcp_access_token {
            Some(token) => TokenSource::from_static(token.clone()),
            None => TokenSource::metadata(client.clone()),
        });

        let signer = UrlSigner::new(
            config.gcs_hmac_access_id.clone(),
            config.gcs_hmac_secret.clone(),
            &config.storage_api_url,
        )?;

        let storage = GcsBlobStore::new(
            client.clone(),
            &config.storage_api_url,
            tokens.clone(),
            signer,
        );

        let users = FirestoreUserStore::new(
            client,
            &config.firestore_api_url,
            &config.gcp_project_id,
            &config.users_collection,
            tokens,
        );

        let gateway = TextbeltGateway::new(
            config.textbelt_url.clone(),
            config.textbelt_key.clone(),
            Duration::from_secs(config.sms_timeout_secs),
        )?;

        let dispatcher = NotificationDispatcher::new(
            Arc::new(storage),
            Arc::new(users),
            Arc::new(gateway),
            DispatcherConfig {
                default_bucket: config.storage_bucket.clone(),
                link_ttl: Duration::from_secs(config.signed_url_ttl_hours * 60 * 60),
            },
        );

        tracing::info!(
            project = %config.gcp_project_id,
            collection = %config.users_collection,
            "Dispatcher configured"
        );

        Ok(Self::new(dispatcher))
    }
}
