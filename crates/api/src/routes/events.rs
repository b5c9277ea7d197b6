//! Storage finalize trigger.
//!
//! Eventarc delivers the finished object as the request body. Whatever
//! happens, the response is `200` with the dispatch report or `null`, so the
//! platform never records a failed (and retried) delivery.

use axum::body::Body;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use tracing::Instrument;
use uuid::Uuid;

use needu_common::types::{DispatchReport, UploadEvent};

use crate::state::AppState;

/// CloudEvent type emitted when an upload completes.
pub const FINALIZED_EVENT_TYPE: &str = "google.cloud.storage.object.v1.finalized";

/// Finalize payloads are small JSON documents; anything larger is dropped.
pub const MAX_EVENT_BYTES: usize = 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(handle_finalize))
}

/// POST / — Run one finalize event through the dispatcher.
async fn handle_finalize(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Json<Option<DispatchReport>> {
    let invocation_id = Uuid::new_v4();
    let span = tracing::info_span!("sos_upload", invocation_id = %invocation_id);

    async move {
        if let Some(event_type) = headers.get("ce-type").and_then(|v| v.to_str().ok()) {
            if event_type != FINALIZED_EVENT_TYPE {
                tracing::info!(event_type, "Ignoring non-finalize event");
                return Json(None);
            }
        }

        let body = match axum::body::to_bytes(body, MAX_EVENT_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, limit = MAX_EVENT_BYTES, "Unreadable event body");
                return Json(None);
            }
        };

        let event: UploadEvent = match serde_json::from_slice(&body) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "No object or name in event");
                return Json(None);
            }
        };

        // Run on its own task so a panic inside the pipeline is contained here.
        let dispatcher = state.dispatcher.clone();
        let task = tokio::spawn(async move { dispatcher.handle(&event).await }.in_current_span());

        match task.await {
            Ok(report) => Json(report),
            Err(e) => {
                tracing::error!(error = %e, "Dispatcher task aborted");
                Json(None)
            }
        }
    }
    .instrument(span)
    .await
}
