//! HTTP ingress for event-bus push notifications.
//!
//! `POST /notifications` processes a delivery and answers 200 with the
//! reports. Processing failures answer 500 so the bus redelivers; payloads
//! that can never succeed answer 400.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::PipelineError;
use crate::pipeline::EventProcessor;
use crate::pipeline::event::Notification;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<EventProcessor>,
    /// Events are processed one at a time.
    pub gate: Arc<Mutex<()>>,
}

/// Build the Axum router.
pub fn routes(processor: Arc<EventProcessor>) -> Router {
    let state = AppState {
        processor,
        gate: Arc::new(Mutex::new(())),
    };

    Router::new()
        .route("/health", get(health))
        .route("/notifications", post(notify))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn notify(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let notification = match Notification::parse(&body) {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "Rejected notification");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            );
        }
    };

    let _guard = state.gate.lock().await;
    match state.processor.process_notification(&notification).await {
        Ok(reports) => (
            StatusCode::OK,
            Json(serde_json::json!({ "reports": reports })),
        ),
        Err(e) => (
            status_for(&e),
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

/// Malformed payloads fail identically on redelivery; everything else may not.
fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::InvalidEvent(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn invalid_events_are_client_errors() {
        assert_eq!(
            status_for(&PipelineError::InvalidEvent("x".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn processing_failures_ask_for_redelivery() {
        assert_eq!(
            status_for(&PipelineError::UnknownRecipient("a@b".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&PipelineError::PolicyLookup(StoreError::Query("down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
