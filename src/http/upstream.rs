//! Backend calls.
//!
//! # Responsibilities
//! - Send a prepared request to a backend and hand back its response
//! - Bound connection establishment with the configured connect timeout
//! - Strip hop-by-hop headers from backend responses
//!
//! # Design Decisions
//! - Response deadlines, head and body, are enforced by the pipeline, not here
//! - Bodies are streamed in both directions, never buffered
//! - Dropping the returned future aborts the in-flight request

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::security::headers::strip_hop_by_hop;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Transport-level failure talking to a backend.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct UpstreamError {
    #[source]
    source: BoxError,
}

impl UpstreamError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Something that can carry a request to a backend.
pub trait Upstream: Send + Sync + 'static {
    fn send(
        &self,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, UpstreamError>> + Send;
}

/// Hyper client forwarding to plain-HTTP backends.
#[derive(Clone)]
pub struct HttpUpstream {
    client: Client<HttpConnector, Body>,
}

impl HttpUpstream {
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }
}

impl Upstream for HttpUpstream {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, UpstreamError> {
        let response = self.client.request(request).await.map_err(UpstreamError::new)?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

impl std::fmt::Debug for HttpUpstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpUpstream").finish_non_exhaustive()
    }
}
