//! HTTP handlers for membership endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::handlers::membership::{
    DispatchWebhookCommand, DispatchWebhookResult, GetCustomerGroupsHandler,
    GetCustomerGroupsQuery, GetMembershipStatusHandler, GetMembershipStatusQuery,
    WebhookDispatcher,
};
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode};
use crate::domain::membership::SignatureError;

use super::dto::{CustomerGroupsResponse, ErrorResponse, MembershipStatusResponse, WebhookAck};

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state.
///
/// Handlers are built once at startup and shared across requests.
#[derive(Clone)]
pub struct MembershipAppState {
    pub dispatcher: Arc<WebhookDispatcher>,
    pub status_handler: Arc<GetMembershipStatusHandler>,
    pub groups_handler: Arc<GetCustomerGroupsHandler>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Handler
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/stripe - Handle subscription lifecycle webhooks
///
/// The body is taken as raw bytes so the signature covers exactly what the
/// provider sent.
pub async fn handle_stripe_webhook(
    State(state): State<MembershipAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // An unreadable header is still a header; it must not pass as a test ping.
    let signature = match headers.get(SIGNATURE_HEADER).map(|v| v.to_str()) {
        None => None,
        Some(Ok(value)) => Some(value.to_string()),
        Some(Err(_)) => {
            let err = SignatureError::MalformedHeader("non-ASCII header".to_string());
            tracing::warn!(reason = err.reason(), error = %err, "Rejected webhook");
            return WebhookRejection(err).into_response();
        }
    };

    let cmd = DispatchWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    match state.dispatcher.handle(cmd).await {
        Ok(DispatchWebhookResult::TestPing) => (StatusCode::OK, "ok-test").into_response(),
        Ok(_) => (StatusCode::OK, Json(WebhookAck::received())).into_response(),
        Err(err) => WebhookRejection(err).into_response(),
    }
}

/// Signature failure rendered as a plain-text 400.
pub struct WebhookRejection(pub SignatureError);

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response {
        (self.0.status_code(), format!("Webhook Error: {}", self.0)).into_response()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /membership/customers/:id/status - Live membership status
pub async fn get_membership_status(
    State(state): State<MembershipAppState>,
    Path(customer_id): Path<String>,
) -> Result<impl IntoResponse, MembershipApiError> {
    let query = GetMembershipStatusQuery {
        customer_id: parse_customer_id(customer_id)?,
    };

    let view = state.status_handler.handle(query).await?;

    Ok(Json(MembershipStatusResponse::from(view)))
}

/// GET /membership/customers/:id/groups - Tier groups and tier field
pub async fn get_customer_groups(
    State(state): State<MembershipAppState>,
    Path(customer_id): Path<String>,
) -> Result<impl IntoResponse, MembershipApiError> {
    let query = GetCustomerGroupsQuery {
        customer_id: parse_customer_id(customer_id)?,
    };

    let view = state.groups_handler.handle(query).await?;

    Ok(Json(CustomerGroupsResponse::from(view)))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

fn parse_customer_id(raw: String) -> Result<CustomerId, MembershipApiError> {
    CustomerId::new(raw)
        .map_err(|e| MembershipApiError(DomainError::validation("customer_id", e.to_string())))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct MembershipApiError(pub DomainError);

impl From<DomainError> for MembershipApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for MembershipApiError {
    fn into_response(self) -> Response {
        let status = match self.0.code {
            ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::CustomerNotFound | ErrorCode::GroupNotFound => StatusCode::NOT_FOUND,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::ExternalServiceError => StatusCode::BAD_GATEWAY,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Membership request failed");
        }

        let body = if self.0.details.is_empty() {
            ErrorResponse::new(self.0.code.to_string(), self.0.message)
        } else {
            let details = serde_json::to_value(&self.0.details).unwrap_or_default();
            ErrorResponse::with_details(self.0.code.to_string(), self.0.message, details)
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ════════════════════════════════════════════════════════════════════════════
    // Error Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    fn status_for(code: ErrorCode) -> StatusCode {
        MembershipApiError(DomainError::new(code, "boom"))
            .into_response()
            .status()
    }

    #[test]
    fn api_error_maps_not_found_to_404() {
        assert_eq!(status_for(ErrorCode::CustomerNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorCode::GroupNotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn api_error_maps_validation_failed_to_400() {
        assert_eq!(status_for(ErrorCode::ValidationFailed), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_maps_timeout_to_504() {
        assert_eq!(status_for(ErrorCode::Timeout), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn api_error_maps_external_service_to_502() {
        assert_eq!(status_for(ErrorCode::ExternalServiceError), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn api_error_maps_infrastructure_to_500() {
        assert_eq!(status_for(ErrorCode::DatabaseError), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(ErrorCode::InternalError), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn webhook_rejection_is_400() {
        let response = WebhookRejection(SignatureError::NoMatchingSignature).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn blank_customer_id_is_rejected() {
        let err = parse_customer_id("  ".to_string()).unwrap_err();
        assert_eq!(err.0.code, ErrorCode::ValidationFailed);
    }
}
