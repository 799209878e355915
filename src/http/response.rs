//! Response handling and transformation.
//!
//! # Responsibilities
//! - Render locally generated rejections as JSON envelopes
//! - Add CORS headers to every response before it leaves the gateway
//!
//! # Design Decisions
//! - Decoration is an explicit final pipeline stage, applied to backend
//!   responses and rejections alike
//! - CORS headers overwrite backend-supplied values so they are never duplicated
//! - Envelope encoding failures degrade to a plain-text response

use axum::body::Body;
use axum::http::header::{self, HeaderValue};
use axum::http::{Response, StatusCode};
use serde::Serialize;

use crate::config::CorsConfig;

/// Content type of JSON rejection bodies.
pub const JSON_UTF8: &str = "application/json;charset=utf-8";

/// Body of every locally generated rejection.
#[derive(Debug, Serialize)]
pub struct RejectionBody<'a> {
    pub code: u16,
    pub data: &'a str,
    pub message: &'a str,
}

/// Build a JSON rejection response for `status`.
pub fn json_rejection(status: StatusCode, message: &str) -> Response<Body> {
    let envelope = RejectionBody {
        code: status.as_u16(),
        data: "",
        message,
    };

    match serde_json::to_vec(&envelope) {
        Ok(bytes) => with_content_type(status, HeaderValue::from_static(JSON_UTF8), Body::from(bytes)),
        Err(e) => {
            tracing::error!(status = %status, error = %e, "Failed to encode rejection body");
            plain_rejection(status, message)
        }
    }
}

/// Plain-text fallback used when the JSON envelope cannot be produced.
pub fn plain_rejection(status: StatusCode, message: &str) -> Response<Body> {
    with_content_type(
        status,
        HeaderValue::from_static("text/plain;charset=utf-8"),
        Body::from(message.to_string()),
    )
}

fn with_content_type(status: StatusCode, content_type: HeaderValue, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    response
}

/// Final pipeline stage: cross-origin headers.
#[derive(Debug, Clone)]
pub struct ResponseDecorator {
    allow_origin: HeaderValue,
    allow_credentials: HeaderValue,
}

impl ResponseDecorator {
    pub fn new(config: &CorsConfig) -> Self {
        let allow_origin = HeaderValue::from_str(&config.allow_origin).unwrap_or_else(|_| {
            tracing::warn!(
                allow_origin = %config.allow_origin,
                "Invalid CORS origin, falling back to '*'"
            );
            HeaderValue::from_static("*")
        });
        let allow_credentials = if config.allow_credentials {
            HeaderValue::from_static("true")
        } else {
            HeaderValue::from_static("false")
        };

        Self {
            allow_origin,
            allow_credentials,
        }
    }

    /// Add the CORS headers to a finalized response.
    pub fn decorate(&self, response: &mut Response<Body>) {
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            self.allow_credentials.clone(),
        );
    }
}

impl Default for ResponseDecorator {
    fn default() -> Self {
        Self::new(&CorsConfig::default())
    }
}
