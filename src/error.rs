//! Pipeline error taxonomy.
//!
//! Every rejection is produced locally by the stage that detects it and is
//! rendered as a JSON envelope. None of them is retried.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::response::json_rejection;
use crate::http::upstream::UpstreamError;
use crate::routing::RouteError;
use crate::security::rate_limit::RateLimitDecision;

/// Message of the authentication rejection body.
pub const INVALID_TOKEN: &str = "invalid token";

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or wrong token on a path that is not whitelisted.
    #[error("invalid token")]
    AuthRejected,

    /// No route prefix matches the request path.
    #[error("no route matches path `{path}`")]
    RouteNotFound { path: String },

    /// The client's bucket is exhausted.
    #[error("rate limit exceeded for `{key}`")]
    RateLimited {
        key: String,
        decision: RateLimitDecision,
    },

    /// The forward target could not be built from the route.
    #[error(transparent)]
    ForwardTarget(#[from] RouteError),

    /// The backend could not be reached or failed mid-response.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[from] UpstreamError),

    /// The backend did not answer within the configured deadline.
    #[error("backend timed out after {0:?}")]
    BackendTimeout(Duration),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::AuthRejected => StatusCode::FORBIDDEN,
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::ForwardTarget(_) | GatewayError::BackendUnavailable(_) => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::BackendTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            GatewayError::AuthRejected => "auth",
            GatewayError::RouteNotFound { .. } => "not_found",
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::ForwardTarget(_) | GatewayError::BackendUnavailable(_) => {
                "backend_unavailable"
            }
            GatewayError::BackendTimeout(_) => "backend_timeout",
        }
    }

    /// Message placed in the JSON envelope sent to the client.
    fn client_message(&self) -> &'static str {
        match self {
            GatewayError::AuthRejected => INVALID_TOKEN,
            GatewayError::RouteNotFound { .. } => "not found",
            GatewayError::RateLimited { .. } => "too many requests",
            GatewayError::ForwardTarget(_) | GatewayError::BackendUnavailable(_) => {
                "bad gateway"
            }
            GatewayError::BackendTimeout(_) => "gateway timeout",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        json_rejection(self.status(), self.client_message())
    }
}
