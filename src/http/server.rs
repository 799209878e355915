//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener
//! - Hand every request, with its peer address, to the pipeline
//! - Stop accepting and drain on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::request::RequestContext;
use crate::http::upstream::HttpUpstream;
use crate::pipeline::Pipeline;
use crate::routing::RouteError;

/// Application state injected into handlers.
pub type AppState = Arc<Pipeline<HttpUpstream>>;

/// HTTP server for the edge gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, RouteError> {
        let upstream = HttpUpstream::new(Duration::from_secs(config.timeouts.connect_secs));
        let pipeline = Pipeline::from_config(&config, upstream)?;

        tracing::info!(
            routes = pipeline.routes().len(),
            whitelist = config.auth.whitelist.len(),
            rate_limit = config.rate_limit.enabled,
            "Pipeline initialized"
        );

        let router = Self::build_router(Arc::new(pipeline));
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// None of these layers produces responses of its own; every response
    /// comes out of the pipeline and is therefore decorated.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every request goes through the pipeline.
///
/// If the client disconnects, hyper drops this future and with it the
/// in-flight backend call.
async fn gateway_handler(
    State(pipeline): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response<Body> {
    pipeline.handle(RequestContext::new(request, addr)).await
}
