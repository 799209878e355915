//! Request-processing pipeline.
//!
//! # State Machine
//! ```text
//! Received → Authorizing ─┬─ Rejected(403) ─────────────────────────────┐
//!                         └─ Routing ─┬─ Rejected(404) ─────────────────┤
//!                                     └─ RateChecking ─┬─ Rejected(429) ┤
//!                                                      └─ Forwarding ───┤
//!                                                                       ▼
//!                                                Decorating → Completed
//! ```
//!
//! # Design Decisions
//! - Stages run in a fixed order coded here, not registered dynamically
//! - Each stage returns the context or a terminal rejection
//! - Rejections are decorated exactly like backend responses
//! - One pass per request, no retries
//! - The backend deadline covers the response head and each body read

mod stage;

#[cfg(test)]
mod tests;

pub use stage::Stage;

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::Response;
use axum::response::IntoResponse;
use tower_http::timeout::TimeoutBody;
use tracing::Instrument;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::request::RequestContext;
use crate::http::response::ResponseDecorator;
use crate::http::upstream::Upstream;
use crate::observability::metrics;
use crate::routing::{RouteError, RouteTable};
use crate::security::auth::AuthFilter;
use crate::security::key_resolver::KeyResolver;
use crate::security::rate_limit::{RateLimitDecision, RateLimiter, TokenBucketLimiter};

/// The composed filter chain.
#[derive(Debug)]
pub struct Pipeline<U> {
    auth: AuthFilter,
    routes: RouteTable,
    key_resolver: KeyResolver,
    limiter: Arc<dyn RateLimiter>,
    upstream: U,
    decorator: ResponseDecorator,
    backend_timeout: Duration,
    rate_limit_headers: bool,
    x_forwarded_headers: bool,
}

/// What the forward half of the pipeline produced.
struct Outcome {
    route: Option<String>,
    decision: Option<RateLimitDecision>,
    result: Result<Response<Body>, GatewayError>,
}

impl<U: Upstream> Pipeline<U> {
    /// Build a pipeline from validated configuration with an in-process limiter.
    pub fn from_config(config: &GatewayConfig, upstream: U) -> Result<Self, RouteError> {
        Self::with_limiter(config, upstream, Arc::new(TokenBucketLimiter::new()))
    }

    /// Build a pipeline using a caller-supplied rate limiter.
    pub fn with_limiter(
        config: &GatewayConfig,
        upstream: U,
        limiter: Arc<dyn RateLimiter>,
    ) -> Result<Self, RouteError> {
        Ok(Self {
            auth: AuthFilter::from_config(&config.auth),
            routes: RouteTable::from_config(config)?,
            key_resolver: KeyResolver,
            limiter,
            upstream,
            decorator: ResponseDecorator::new(&config.cors),
            backend_timeout: Duration::from_secs(config.timeouts.backend_secs),
            rate_limit_headers: config.rate_limit.include_headers,
            x_forwarded_headers: config.forwarding.x_forwarded_headers,
        })
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Run one request through every stage and return the decorated response.
    pub async fn handle(&self, ctx: RequestContext) -> Response<Body> {
        let span = tracing::info_span!(
            "pipeline",
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            peer = %ctx.remote_addr(),
        );
        self.run(ctx).instrument(span).await
    }

    async fn run(&self, ctx: RequestContext) -> Response<Body> {
        let start = Instant::now();
        let method = ctx.method().to_string();
        tracing::info!(stage = %Stage::Received, timestamp_ms = epoch_millis(), "Request received");

        let outcome = self.process(ctx).await;

        let mut response = match outcome.result {
            Ok(response) => response,
            Err(err) => {
                metrics::record_rejection(err.reason());
                match &err {
                    GatewayError::BackendUnavailable(_)
                    | GatewayError::BackendTimeout(_)
                    | GatewayError::ForwardTarget(_) => {
                        tracing::error!(error = %err, status = %err.status(), "Request failed");
                    }
                    _ => tracing::warn!(error = %err, status = %err.status(), "Request rejected"),
                }
                err.into_response()
            }
        };

        if let (true, Some(decision)) = (self.rate_limit_headers, outcome.decision) {
            decision.write_headers(response.headers_mut());
        }

        tracing::trace!(stage = %Stage::Decorating);
        self.decorator.decorate(&mut response);

        let route = outcome.route.as_deref().unwrap_or("none");
        metrics::record_request(&method, response.status().as_u16(), route, start);
        tracing::info!(
            stage = %Stage::Completed,
            timestamp_ms = epoch_millis(),
            status = %response.status(),
            route = %route,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );

        response
    }

    async fn process(&self, ctx: RequestContext) -> Outcome {
        let mut outcome = Outcome {
            route: None,
            decision: None,
            result: Err(GatewayError::AuthRejected),
        };

        tracing::trace!(stage = %Stage::Authorizing);
        let ctx = match self.auth.apply(ctx) {
            Ok((ctx, _)) => ctx,
            Err(err) => {
                outcome.result = Err(err);
                return outcome;
            }
        };

        tracing::trace!(stage = %Stage::Routing);
        let Some(route) = self.routes.match_path(ctx.path()) else {
            outcome.result = Err(GatewayError::RouteNotFound {
                path: ctx.path().to_string(),
            });
            return outcome;
        };
        outcome.route = Some(route.id.clone());

        if let Some(policy) = route.rate_limit {
            tracing::trace!(stage = %Stage::RateChecking);
            let key = self.key_resolver.resolve(ctx.remote_addr());
            let decision = self.limiter.allow(&key, policy);
            outcome.decision = Some(decision);
            if !decision.allowed {
                outcome.result = Err(GatewayError::RateLimited { key, decision });
                return outcome;
            }
        }

        tracing::trace!(stage = %Stage::Forwarding);
        let target = match route.target_uri(ctx.path(), ctx.query()) {
            Ok(target) => target,
            Err(err) => {
                outcome.result = Err(err.into());
                return outcome;
            }
        };
        tracing::debug!(route = %route.id, target = %target, "Forwarding request");

        let request = ctx.into_forward_request(target, self.x_forwarded_headers);
        outcome.result = match tokio::time::timeout(self.backend_timeout, self.upstream.send(request)).await {
            // The body gets the same bound on every wait for the next frame.
            Ok(Ok(response)) => {
                let timeout = self.backend_timeout;
                Ok(response.map(|body| Body::new(TimeoutBody::new(timeout, body))))
            }
            Ok(Err(err)) => Err(GatewayError::BackendUnavailable(err)),
            Err(_) => Err(GatewayError::BackendTimeout(self.backend_timeout)),
        };
        outcome
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
