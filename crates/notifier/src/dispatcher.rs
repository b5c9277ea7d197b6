//! SOS notification pipeline.
//!
//! For each finalize event:
//! 1. Validate the object path against the recording layout
//! 2. Resolve the session's newest file and drop superseded triggers
//! 3. Sign a download link for that file
//! 4. Look up the user and their emergency contacts
//! 5. Text every contact and collect per-contact results
//!
//! Early exits are reported as `Outcome::Skipped`; only SMS failures are
//! tolerated per contact, every other error aborts the invocation.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use serde_json::Value;

use needu_common::error::Result;
use needu_common::types::{
    DispatchReport, NotificationResult, Outcome, SkipReason, UploadEvent,
};

use crate::contacts;
use crate::group::RecordingGroup;
use crate::path::RecordingPath;
use crate::sms::SmsGateway;
use crate::storage::BlobStore;
use crate::users::UserStore;

/// Default lifetime of the link sent to contacts (24 hours).
pub const DEFAULT_LINK_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Dispatcher settings that do not belong to any collaborator.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Bucket to use when the event does not carry one
    pub default_bucket: Option<String>,
    /// Lifetime of signed download links
    pub link_ttl: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_bucket: None,
            link_ttl: DEFAULT_LINK_TTL,
        }
    }
}

/// Turns finalize events into SMS alerts for a user's emergency contacts.
#[derive(Clone)]
pub struct NotificationDispatcher {
    storage: Arc<dyn BlobStore>,
    users: Arc<dyn UserStore>,
    gateway: Arc<dyn SmsGateway>,
    config: DispatcherConfig,
}

impl NotificationDispatcher {
    pub fn new(
        storage: Arc<dyn BlobStore>,
        users: Arc<dyn UserStore>,
        gateway: Arc<dyn SmsGateway>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            storage,
            users,
            gateway,
            config,
        }
    }

    /// Run one event to completion. Never fails: skips and errors both
    /// come back as `None`.
    pub async fn handle(&self, event: &UploadEvent) -> Option<DispatchReport> {
        match self.process(event).await {
            Ok(Outcome::Notified(report)) => {
                tracing::info!(
                    object = %event.object_path,
                    attempted = report.results.len(),
                    delivered = report.delivered_count(),
                    "SOS notifications sent"
                );
                Some(report)
            }
            Ok(Outcome::Skipped(reason)) => {
                tracing::info!(object = %event.object_path, reason = %reason, "No notification sent");
                None
            }
            Err(e) => {
                tracing::error!(object = %event.object_path, error = %e, "SOS dispatch failed");
                None
            }
        }
    }

    /// Run the pipeline and report exactly how it ended.
    pub async fn process(&self, event: &UploadEvent) -> Result<Outcome> {
        tracing::info!(object = %event.object_path, "Uploaded object");

        let Some(path) = RecordingPath::parse(&event.object_path) else {
            tracing::info!(
                object = %event.object_path,
                "Object path doesn't match sos_recordings/{{uid}}/Triggered_on_{{date}}/... pattern"
            );
            return Ok(Outcome::Skipped(SkipReason::MalformedPath));
        };

        let Some(bucket) = event
            .bucket_name
            .as_deref()
            .or(self.config.default_bucket.as_deref())
        else {
            tracing::warn!(object = %event.object_path, "Event has no bucket and no default is configured");
            return Ok(Outcome::Skipped(SkipReason::MissingBucket));
        };

        tracing::info!(uid = %path.uid, date_folder = %path.date_folder, "Recording session");

        let prefix = path.group_prefix();
        let names = self.storage.list(bucket, &prefix).await?;
        if names.is_empty() {
            tracing::info!(prefix = %prefix, "No files found in prefix");
            return Ok(Outcome::Skipped(SkipReason::EmptyGroup));
        }

        let metadata = try_join_all(names.iter().map(|name| self.storage.metadata(bucket, name))).await?;
        let group = RecordingGroup::new(metadata);

        let Some(newest) = group.newest() else {
            return Ok(Outcome::Skipped(SkipReason::EmptyGroup));
        };
        tracing::info!(newest = %newest.name, files = group.len(), "Newest file by creation time");

        if !group.admits(&event.object_path) {
            tracing::info!(object = %event.object_path, "Uploaded file is not newest, skipping notification");
            return Ok(Outcome::Skipped(SkipReason::Superseded));
        }

        let link = self
            .storage
            .signed_url(bucket, &newest.name, self.config.link_ttl)
            .await?;
        tracing::info!("Signed URL created");

        let Some(profile) = self.users.fetch(&path.uid).await? else {
            tracing::info!(uid = %path.uid, "User record not found");
            return Ok(Outcome::Skipped(SkipReason::UserNotFound));
        };

        let sender = contacts::phone_value(&profile.phone_number)
            .unwrap_or_else(|| path.uid.clone());

        if contacts::normalize(&profile.emergency_contacts).is_empty() {
            tracing::info!(uid = %path.uid, "No emergency contacts to notify");
            return Ok(Outcome::Skipped(SkipReason::NoContacts));
        }

        let recipients = contacts::recipients(&profile.emergency_contacts);
        let message = compose_message(&sender, &link);
        let results = self.send_all(&recipients, &message).await;

        Ok(Outcome::Notified(DispatchReport::new(results)))
    }

    /// One attempt per recipient; a failed send never stops the rest.
    async fn send_all(&self, recipients: &[String], message: &str) -> Vec<NotificationResult> {
        let mut results = Vec::with_capacity(recipients.len());

        for phone in recipients {
            let result = match self.gateway.send(phone, message).await {
                Ok(response) => {
                    tracing::info!(phone = %phone, response = %response.body, "Gateway response");
                    NotificationResult {
                        phone: phone.clone(),
                        delivered: response.success,
                        detail: response.body,
                    }
                }
                Err(e) => {
                    tracing::error!(phone = %phone, error = %e, "Failed to send SMS");
                    NotificationResult {
                        phone: phone.clone(),
                        delivered: false,
                        detail: Value::String(e.to_string()),
                    }
                }
            };
            results.push(result);
        }

        results
    }
}

/// Text sent to every emergency contact.
pub fn compose_message(sender: &str, link: &str) -> String {
    format!("SOS audio from {}. Listen:{}", sender, link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_message() {
        assert_eq!(
            compose_message("+15550000", "https://example.test/clip"),
            "SOS audio from +15550000. Listen:https://example.test/clip"
        );
    }

    #[test]
    fn test_default_config() {
        let config = DispatcherConfig::default();
        assert!(config.default_bucket.is_none());
        assert_eq!(config.link_ttl, Duration::from_secs(86_400));
    }
}
