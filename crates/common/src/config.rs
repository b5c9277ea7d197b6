use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Textbelt API key (pre-shared secret)
    pub textbelt_key: String,

    /// Textbelt send endpoint
    pub textbelt_url: String,

    /// Per-send timeout for the SMS gateway, in seconds (default: 15)
    pub sms_timeout_secs: u64,

    /// Google Cloud project hosting the Firestore user records
    pub gcp_project_id: String,

    /// Firestore collection holding user profiles (default: "users")
    pub users_collection: String,

    /// Bucket used when a finalize event does not name one
    pub storage_bucket: Option<String>,

    /// HMAC access id used to sign download links
    pub gcs_hmac_access_id: String,

    /// HMAC secret paired with `gcs_hmac_access_id`
    pub gcs_hmac_secret: String,

    /// Lifetime of generated download links in hours (default: 24)
    pub signed_url_ttl_hours: u64,

    /// Cloud Storage API base URL (override for emulators)
    pub storage_api_url: String,

    /// Firestore API base URL (override for emulators)
    pub firestore_api_url: String,

    /// Static OAuth access token; when unset the metadata server is used
    pub gcp_access_token: Option<String>,

    /// HTTP listen port (default: 8080)
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            textbelt_key: std::env::var("TEXTBELT_KEY")
                .map_err(|_| anyhow::anyhow!("TEXTBELT_KEY environment variable is required"))?,
            textbelt_url: std::env::var("TEXTBELT_URL")
                .unwrap_or_else(|_| "https://textbelt.com/text".to_string()),
            sms_timeout_secs: std::env::var("SMS_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SMS_TIMEOUT_SECS must be a valid u64"))?,
            gcp_project_id: std::env::var("GCP_PROJECT_ID")
                .map_err(|_| anyhow::anyhow!("GCP_PROJECT_ID environment variable is required"))?,
            users_collection: std::env::var("USERS_COLLECTION")
                .unwrap_or_else(|_| "users".to_string()),
            storage_bucket: std::env::var("STORAGE_BUCKET").ok(),
            gcs_hmac_access_id: std::env::var("GCS_HMAC_ACCESS_ID").map_err(|_| {
                anyhow::anyhow!("GCS_HMAC_ACCESS_ID environment variable is required")
            })?,
            gcs_hmac_secret: std::env::var("GCS_HMAC_SECRET")
                .map_err(|_| anyhow::anyhow!("GCS_HMAC_SECRET environment variable is required"))?,
            signed_url_ttl_hours: std::env::var("SIGNED_URL_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SIGNED_URL_TTL_HOURS must be a valid u64"))?,
            storage_api_url: std::env::var("STORAGE_API_URL")
                .unwrap_or_else(|_| "https://storage.googleapis.com".to_string()),
            firestore_api_url: std::env::var("FIRESTORE_API_URL")
                .unwrap_or_else(|_| "https://firestore.googleapis.com".to_string()),
            gcp_access_token: std::env::var("GCP_ACCESS_TOKEN").ok(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid u16"))?,
        })
    }
}
