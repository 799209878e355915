//! Request handling and transformation.
//!
//! # Responsibilities
//! - Hold the per-request state carried through the pipeline
//! - Expose routing-relevant information (path, query, headers, peer)
//! - Prepare the request for forwarding to a backend
//!
//! # Design Decisions
//! - The context owns the request; stages mutate headers in place
//! - The body is never buffered, it is streamed to the backend as-is
//! - Created at pipeline entry, consumed when the request is forwarded

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, request::Parts, HeaderMap, Method, Request, Uri};

use crate::security::headers::{append_forwarded_headers, strip_hop_by_hop};

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Transient per-request record flowing through the pipeline stages.
#[derive(Debug)]
pub struct RequestContext {
    parts: Parts,
    body: Body,
    remote_addr: SocketAddr,
}

impl RequestContext {
    /// Wrap an inbound request together with the connecting peer address.
    pub fn new(request: Request<Body>, remote_addr: SocketAddr) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body,
            remote_addr,
        }
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    /// Address of the connecting peer.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Correlation ID assigned by the request-id layer, if any.
    pub fn request_id(&self) -> &str {
        self.parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }

    /// Turn the context into the request sent to the backend.
    ///
    /// Method, body and end-to-end headers are kept; hop-by-hop headers and
    /// `host` are dropped so the client derives the backend's own host.
    pub fn into_forward_request(self, target: Uri, x_forwarded_headers: bool) -> Request<Body> {
        let Self {
            mut parts,
            body,
            remote_addr,
        } = self;

        let original_host = parts.headers.remove(header::HOST);
        strip_hop_by_hop(&mut parts.headers);
        if x_forwarded_headers {
            append_forwarded_headers(&mut parts.headers, remote_addr.ip(), original_host);
        }

        parts.uri = target;
        Request::from_parts(parts, body)
    }
}
