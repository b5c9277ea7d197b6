//! SMS delivery through the Textbelt HTTP gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use needu_common::error::{AppError, Result};

/// What the gateway said about one send.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    /// Gateway accepted the message for delivery
    pub success: bool,
    /// Full response body
    pub body: Value,
}

/// Outbound SMS gateway.
///
/// `Err` means no usable answer came back (transport failure, timeout or a
/// non-2xx status). A 2xx answer is always `Ok`, even when it reports
/// `success: false`.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> Result<GatewayResponse>;
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    phone: &'a str,
    message: &'a str,
    key: &'a str,
}

/// Textbelt client (`POST {phone, message, key}` → `{success, ...}`).
#[derive(Clone)]
pub struct TextbeltGateway {
    client: Client,
    url: String,
    key: String,
}

impl std::fmt::Debug for TextbeltGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextbeltGateway")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl TextbeltGateway {
    pub fn new(url: impl Into<String>, key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build SMS HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            key: key.into(),
        })
    }
}

#[async_trait]
impl SmsGateway for TextbeltGateway {
    async fn send(&self, phone: &str, message: &str) -> Result<GatewayResponse> {
        let response = self
            .client
            .post(&self.url)
            .json(&SendRequest {
                phone,
                message,
                key: &self.key,
            })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let detail = if text.is_empty() {
                status.to_string()
            } else {
                text
            };
            return Err(AppError::Gateway(format!(
                "Gateway returned {}: {}",
                status.as_u16(),
                detail
            )));
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| AppError::Gateway(format!("Unreadable gateway response: {}", e)))?;
        let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);

        Ok(GatewayResponse { success, body })
    }
}
