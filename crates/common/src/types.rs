use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Object-finalize event delivered by the storage platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadEvent {
    /// Full object path, e.g. `sos_recordings/{uid}/Triggered_on_{date}/{file}`
    #[serde(rename = "name")]
    pub object_path: String,
    /// Bucket holding the object (some event sources omit it)
    #[serde(rename = "bucket", default)]
    pub bucket_name: Option<String>,
}

/// Creation metadata for a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub name: String,
    pub time_created: DateTime<Utc>,
}

/// A user record as far as SOS delivery is concerned.
///
/// Both fields are kept as raw JSON. `emergency_contacts` has been written as
/// a list of strings, a list of objects and a keyed map over time, and
/// `phone_number` is sometimes stored as an integer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub phone_number: serde_json::Value,
    #[serde(default)]
    pub emergency_contacts: serde_json::Value,
}

/// Per-contact outcome of an SMS send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationResult {
    pub phone: String,
    pub delivered: bool,
    /// Gateway response body, or the error message when the send failed
    pub detail: serde_json::Value,
}

/// Aggregate result of a completed dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub success: bool,
    pub results: Vec<NotificationResult>,
}

impl DispatchReport {
    pub fn new(results: Vec<NotificationResult>) -> Self {
        Self {
            success: true,
            results,
        }
    }

    /// Number of contacts the gateway accepted.
    pub fn delivered_count(&self) -> usize {
        self.results.iter().filter(|r| r.delivered).count()
    }
}

/// Why an invocation finished without notifying anyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MalformedPath,
    MissingBucket,
    EmptyGroup,
    Superseded,
    UserNotFound,
    NoContacts,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MalformedPath => write!(f, "malformed_path"),
            SkipReason::MissingBucket => write!(f, "missing_bucket"),
            SkipReason::EmptyGroup => write!(f, "empty_group"),
            SkipReason::Superseded => write!(f, "superseded"),
            SkipReason::UserNotFound => write!(f, "user_not_found"),
            SkipReason::NoContacts => write!(f, "no_contacts"),
        }
    }
}

/// Result of running one finalize event through the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Notified(DispatchReport),
    Skipped(SkipReason),
}

impl Outcome {
    /// The report to hand back to the platform; skips become `None`.
    pub fn into_report(self) -> Option<DispatchReport> {
        match self {
            Outcome::Notified(report) => Some(report),
            Outcome::Skipped(_) => None,
        }
    }
}
