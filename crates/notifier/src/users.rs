//! User record lookup backed by Firestore.

use std::sync::Arc;

use async_trait::async_trait;
use percent_encoding::utf8_percent_encode;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};

use needu_common::error::{AppError, Result};
use needu_common::types::UserProfile;

use crate::auth::TokenSource;
use crate::signing::QUERY_ENCODE_SET;

/// Point lookup of user profiles.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch the profile for `uid`; `None` when no record exists.
    async fn fetch(&self, uid: &str) -> Result<Option<UserProfile>>;
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Reads `{collection}/{uid}` documents through the Firestore REST API.
#[derive(Debug, Clone)]
pub struct FirestoreUserStore {
    client: Client,
    documents_url: String,
    collection: String,
    tokens: Arc<TokenSource>,
}

impl FirestoreUserStore {
    pub fn new(
        client: Client,
        base_url: &str,
        project_id: &str,
        collection: &str,
        tokens: Arc<TokenSource>,
    ) -> Self {
        Self {
            client,
            documents_url: format!(
                "{}/v1/projects/{}/databases/(default)/documents",
                base_url.trim_end_matches('/'),
                project_id
            ),
            collection: collection.to_string(),
            tokens,
        }
    }
}

#[async_trait]
impl UserStore for FirestoreUserStore {
    async fn fetch(&self, uid: &str) -> Result<Option<UserProfile>> {
        let url = format!(
            "{}/{}/{}",
            self.documents_url,
            self.collection,
            utf8_percent_encode(uid, QUERY_ENCODE_SET)
        );

        let response = self
            .client
            .get(url)
            .bearer_auth(self.tokens.token().await?)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let document: Document = response.json().await?;
                let profile = serde_json::from_value(decode_fields(document.fields))?;
                Ok(Some(profile))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AppError::UserStore(format!(
                    "Lookup of {}/{} failed with {}: {}",
                    self.collection, uid, status, body
                )))
            }
        }
    }
}

/// Convert a Firestore `fields` map into plain JSON.
pub fn decode_fields(fields: Map<String, Value>) -> Value {
    Value::Object(
        fields
            .into_iter()
            .map(|(key, value)| (key, decode_value(value)))
            .collect(),
    )
}

/// Convert one typed Firestore value (`{"stringValue": "..."}` etc.) into plain JSON.
pub fn decode_value(value: Value) -> Value {
    let Value::Object(mut typed) = value else {
        return Value::Null;
    };

    if let Some(v) = typed.remove("stringValue") {
        return v;
    }
    if let Some(v) = typed.remove("integerValue") {
        // Int64 travels as a decimal string.
        return match &v {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(v),
            _ => v,
        };
    }
    if let Some(v) = typed.remove("doubleValue") {
        return v;
    }
    if let Some(v) = typed.remove("booleanValue") {
        return v;
    }
    if typed.contains_key("nullValue") {
        return Value::Null;
    }
    if let Some(v) = typed.remove("mapValue") {
        let fields = match v {
            Value::Object(mut map) => match map.remove("fields") {
                Some(Value::Object(fields)) => fields,
                _ => Map::new(),
            },
            _ => Map::new(),
        };
        return decode_fields(fields);
    }
    if let Some(v) = typed.remove("arrayValue") {
        let values = match v {
            Value::Object(mut map) => match map.remove("values") {
                Some(Value::Array(values)) => values,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        return Value::Array(values.into_iter().map(decode_value).collect());
    }

    for key in ["timestampValue", "referenceValue", "bytesValue", "geoPointValue"] {
        if let Some(v) = typed.remove(key) {
            return v;
        }
    }

    Value::Null
}
