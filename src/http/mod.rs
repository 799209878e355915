//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (RequestContext wraps request + peer address)
//!     → [pipeline: auth → routing → rate limit]
//!     → upstream.rs (backend call)
//!     → response.rs (CORS decoration, rejection bodies)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use request::{RequestContext, X_REQUEST_ID};
pub use response::ResponseDecorator;
pub use server::HttpServer;
pub use upstream::{HttpUpstream, Upstream, UpstreamError};
