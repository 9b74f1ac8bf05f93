use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay::{
    DealId, DealRelay, RelayError, RelayId, StageTransitionEvent, WebhookError, WebhookOutcome,
};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

/// JSON body of every webhook response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookResponse {
    /// `success`, `ignored`, `malformed`, `fetch failed` or `delivery failed`.
    pub status: &'static str,
    /// Correlates the response with log lines.
    pub relay_id: RelayId,
    /// The deal concerned, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<DealId>,
    /// Human-readable failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl WebhookResponse {
    fn new(status: &'static str, relay_id: RelayId) -> Self {
        Self {
            status,
            relay_id,
            deal_id: None,
            detail: None,
        }
    }

    fn with_deal(mut self, deal_id: DealId) -> Self {
        self.deal_id = Some(deal_id);
        self
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub(crate) async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
    }))
}

/// The body is taken raw so that every decoding problem maps to 400,
/// whatever the request's content type.
pub(crate) async fn handle_webhook(State(relay): State<Arc<DealRelay>>, body: Bytes) -> Response {
    let relay_id = RelayId::new_random();
    let span = info_span!("webhook", %relay_id);
    process(&relay, relay_id, &body).instrument(span).await
}

async fn process(relay: &DealRelay, relay_id: RelayId, body: &[u8]) -> Response {
    let event = match StageTransitionEvent::parse(body) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "rejecting malformed webhook");
            return respond(
                StatusCode::BAD_REQUEST,
                WebhookResponse::new("malformed", relay_id).with_detail(err.to_string()),
            );
        }
    };

    match relay.handle_event(&event).await {
        Ok(WebhookOutcome::Ignored) => {
            respond(StatusCode::OK, WebhookResponse::new("ignored", relay_id))
        }
        Ok(WebhookOutcome::Delivered(receipt)) => {
            info!(deal_id = %receipt.deal_id, "webhook relayed");
            respond(
                StatusCode::OK,
                WebhookResponse::new("success", relay_id).with_deal(receipt.deal_id),
            )
        }
        Err(err) => {
            let (status, label) = failure_status(&err);
            warn!(http_status = status.as_u16(), error = %err, "webhook failed");
            let mut response = WebhookResponse::new(label, relay_id).with_detail(err.to_string());
            if let WebhookError::Relay(relay_err) = &err {
                response = response.with_deal(relay_err.deal_id());
            }
            respond(status, response)
        }
    }
}

fn failure_status(err: &WebhookError) -> (StatusCode, &'static str) {
    match err {
        WebhookError::Malformed(_) => (StatusCode::BAD_REQUEST, "malformed"),
        WebhookError::Relay(RelayError::FetchFailed { last, .. }) if last.is_not_found() => {
            (StatusCode::NOT_FOUND, "fetch failed")
        }
        WebhookError::Relay(RelayError::FetchFailed { .. }) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "fetch failed")
        }
        WebhookError::Relay(RelayError::DeliveryFailed { .. }) => {
            (StatusCode::BAD_GATEWAY, "delivery failed")
        }
    }
}

fn respond(status: StatusCode, body: WebhookResponse) -> Response {
    (status, Json(body)).into_response()
}
