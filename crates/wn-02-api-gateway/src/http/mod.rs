//! Publish and status handlers for the API listener.

use crate::domain::error::{ApiError, ApiResult};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use wn_01_subscriptions::{Event, RelayStatus, SubscriptionApi};

/// Shared state for the API routes
#[derive(Clone)]
pub struct ApiState {
    pub manager: Arc<dyn SubscriptionApi>,
}

/// Body of a successful publish
#[derive(Debug, Serialize)]
pub struct PublishResponse {
    /// Payload enqueues performed, one per matching (connection, tag) pair
    pub deliveries: usize,
}

/// `POST /event`
///
/// The body has already been size-checked by the body limit layer.
pub async fn publish_event(
    State(state): State<ApiState>,
    body: Bytes,
) -> ApiResult<Json<PublishResponse>> {
    let event = decode_event(&body).inspect_err(|e| {
        warn!(status = %e.status, error = %e.message, "Rejected publish request");
    })?;

    debug!(event = %event.name, tags = ?event.tags, "API event");

    let deliveries = state.manager.distribute(&event).await?;
    Ok(Json(PublishResponse { deliveries }))
}

/// `GET /status`
pub async fn status(State(state): State<ApiState>) -> Json<RelayStatus> {
    Json(state.manager.status())
}

/// `GET /health`
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Decode a publish body into an [`Event`].
///
/// Whitespace-only bodies count as empty.
pub fn decode_event(body: &[u8]) -> ApiResult<Event> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::empty_body());
    }
    Ok(serde_json::from_slice(body)?)
}
