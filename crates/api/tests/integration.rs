//! Integration tests for the trigger routes.
//!
//! Uses `tower::ServiceExt` to drive the Axum router without a real HTTP
//! server; storage, user records and the SMS gateway are in-memory fakes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

use needu_api::routes::create_router;
use needu_api::routes::events::{FINALIZED_EVENT_TYPE, MAX_EVENT_BYTES};
use needu_api::state::AppState;
use needu_common::error::{AppError, Result};
use needu_common::types::{ObjectMetadata, UserProfile};
use needu_notifier::sms::{GatewayResponse, SmsGateway};
use needu_notifier::storage::BlobStore;
use needu_notifier::users::UserStore;
use needu_notifier::{DispatcherConfig, NotificationDispatcher};

// ============================================================
// Helpers
// ============================================================

struct MemoryStore {
    objects: Vec<ObjectMetadata>,
    reads: AtomicUsize,
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn list(&self, _bucket: &str, prefix: &str) -> Result<Vec<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .objects
            .iter()
            .filter(|o| o.name.starts_with(prefix))
            .map(|o| o.name.clone())
            .collect())
    }

    async fn metadata(&self, _bucket: &str, name: &str) -> Result<ObjectMetadata> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.objects
            .iter()
            .find(|o| o.name == name)
            .cloned()
            .ok_or_else(|| AppError::Storage(format!("{} not found", name)))
    }

    async fn signed_url(&self, bucket: &str, name: &str, _ttl: Duration) -> Result<String> {
        Ok(format!("https://signed.test/{}/{}", bucket, name))
    }
}

struct MemoryUsers(HashMap<String, UserProfile>);

#[async_trait]
impl UserStore for MemoryUsers {
    async fn fetch(&self, uid: &str) -> Result<Option<UserProfile>> {
        Ok(self.0.get(uid).cloned())
    }
}

#[derive(Default)]
struct RecordingGateway {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl SmsGateway for RecordingGateway {
    async fn send(&self, phone: &str, message: &str) -> Result<GatewayResponse> {
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), message.to_string()));
        Ok(GatewayResponse {
            success: true,
            body: json!({ "success": true }),
        })
    }
}

struct TestApp {
    state: AppState,
    store: Arc<MemoryStore>,
    gateway: Arc<RecordingGateway>,
}

fn test_app() -> TestApp {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let store = Arc::new(MemoryStore {
        objects: vec![
            ObjectMetadata {
                name: "sos_recordings/u1/Triggered_on_2024-01-01/clip1.mp3".to_string(),
                time_created: base,
            },
            ObjectMetadata {
                name: "sos_recordings/u1/Triggered_on_2024-01-01/clip2.mp3".to_string(),
                time_created: base + chrono::Duration::seconds(5),
            },
        ],
        reads: AtomicUsize::new(0),
    });
    let users = Arc::new(MemoryUsers(HashMap::from([(
        "u1".to_string(),
        UserProfile {
            phone_number: json!("+15550000"),
            emergency_contacts: json!(["+15551111", { "phone": "+15552222" }]),
        },
    )])));
    let gateway = Arc::new(RecordingGateway::default());

    let dispatcher = NotificationDispatcher::new(
        store.clone(),
        users,
        gateway.clone(),
        DispatcherConfig::default(),
    );

    TestApp {
        state: AppState::new(dispatcher),
        store,
        gateway,
    }
}

fn finalize_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .header("ce-type", FINALIZED_EVENT_TYPE)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// ============================================================
// Routes
// ============================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(test_app().state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "needu-sos-relay");
}

#[tokio::test]
async fn test_finalize_notifies_contacts() {
    let t = test_app();
    let app = create_router(t.state.clone());

    let response = app
        .oneshot(finalize_request(json!({
            "name": "sos_recordings/u1/Triggered_on_2024-01-01/clip2.mp3",
            "bucket": "needu.firebasestorage.app",
            "contentType": "audio/mpeg"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
    assert_eq!(json["results"][0]["phone"], "+15551111");
    assert_eq!(json["results"][1]["phone"], "+15552222");

    let sent = t.gateway.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|(_, message)| message.contains("+15550000")
        && message.contains(
            "https://signed.test/needu.firebasestorage.app/sos_recordings/u1/Triggered_on_2024-01-01/clip2.mp3"
        )));
}

#[tokio::test]
async fn test_superseded_upload_returns_null() {
    let t = test_app();
    let app = create_router(t.state.clone());

    let response = app
        .oneshot(finalize_request(json!({
            "name": "sos_recordings/u1/Triggered_on_2024-01-01/clip1.mp3",
            "bucket": "needu.firebasestorage.app"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, Value::Null);
    assert!(t.gateway.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unrelated_path_returns_null_without_reads() {
    let t = test_app();
    let app = create_router(t.state.clone());

    let response = app
        .oneshot(finalize_request(json!({
            "name": "profile_pictures/u1/avatar.png",
            "bucket": "needu.firebasestorage.app"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, Value::Null);
    assert_eq!(t.store.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_other_event_type_is_ignored() {
    let t = test_app();
    let app = create_router(t.state.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .header("ce-type", "google.cloud.storage.object.v1.deleted")
                .body(Body::from(
                    json!({
                        "name": "sos_recordings/u1/Triggered_on_2024-01-01/clip2.mp3",
                        "bucket": "needu.firebasestorage.app"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, Value::Null);
    assert_eq!(t.store.reads.load(Ordering::SeqCst), 0);
    assert!(t.gateway.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unparsable_body_returns_null() {
    let t = test_app();
    let app = create_router(t.state.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from("{\"bucket\": \"b\"}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, Value::Null);
    assert_eq!(t.store.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oversized_body_returns_null() {
    let t = test_app();
    let app = create_router(t.state.clone());

    let padding = "x".repeat(2 * MAX_EVENT_BYTES);
    let response = app
        .oneshot(finalize_request(json!({
            "name": "sos_recordings/u1/Triggered_on_2024-01-01/clip2.mp3",
            "bucket": "needu.firebasestorage.app",
            "metadata": { "padding": padding }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, Value::Null);
    assert_eq!(t.store.reads.load(Ordering::SeqCst), 0);
    assert!(t.gateway.sent.lock().unwrap().is_empty());
}
