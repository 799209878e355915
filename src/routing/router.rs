//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in declaration order
//! - Look up matching route for a request path
//! - Build the backend URI a matched request is forwarded to
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - First declared match wins; overlapping prefixes are not reordered
//! - Explicit no-match rather than silent default

use axum::http::Uri;
use thiserror::Error;
use url::{Position, Url};

use crate::config::{GatewayConfig, RateLimitPolicy, RouteConfig};
use crate::routing::matcher::PathPrefixMatcher;

/// Error raised while compiling routes.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route `{id}` has an invalid backend uri: {source}")]
    BackendUri {
        id: String,
        #[source]
        source: url::ParseError,
    },
    #[error("cannot build forward uri `{target}`: {source}")]
    ForwardUri {
        target: String,
        #[source]
        source: axum::http::uri::InvalidUri,
    },
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    /// Route identifier.
    pub id: String,
    /// Path matcher.
    pub matcher: PathPrefixMatcher,
    /// Backend base, without trailing slash (e.g. `http://10.0.0.1:801/api`).
    pub backend_base: String,
    /// Remove the matched prefix before forwarding.
    pub strip_prefix: bool,
    /// Effective rate-limit policy, if rate limiting applies to this route.
    pub rate_limit: Option<RateLimitPolicy>,
}

impl Route {
    /// Compile a route definition.
    ///
    /// `default_policy` is used when the route does not carry its own policy;
    /// pass `None` to disable rate limiting entirely.
    pub fn from_config(
        config: &RouteConfig,
        default_policy: Option<RateLimitPolicy>,
    ) -> Result<Self, RouteError> {
        let url = Url::parse(&config.uri).map_err(|source| RouteError::BackendUri {
            id: config.id.clone(),
            source,
        })?;
        let backend_base = url[..Position::AfterPath].trim_end_matches('/').to_string();
        let rate_limit = default_policy.map(|default| config.rate_limit.unwrap_or(default));

        Ok(Self {
            id: config.id.clone(),
            matcher: PathPrefixMatcher::new(config.path.as_str()),
            backend_base,
            strip_prefix: config.strip_prefix,
            rate_limit,
        })
    }

    /// Build the URI the request should be forwarded to.
    pub fn target_uri(&self, path: &str, query: Option<&str>) -> Result<Uri, RouteError> {
        let forwarded = if self.strip_prefix {
            self.matcher.strip(path)
        } else {
            path.to_string()
        };

        let mut target = format!("{}{}", self.backend_base, forwarded);
        if let Some(query) = query {
            target.push('?');
            target.push_str(query);
        }

        target
            .parse::<Uri>()
            .map_err(|source| RouteError::ForwardUri { target, source })
    }
}

/// Ordered routing table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Create a routing table from already compiled routes, keeping their order.
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Compile all configured routes.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, RouteError> {
        let default_policy = config
            .rate_limit
            .enabled
            .then(|| config.rate_limit.default_policy());

        let routes = config
            .routes
            .iter()
            .map(|route| Route::from_config(route, default_policy))
            .collect::<Result<Vec<_>, _>>()?;

        for route in &routes {
            tracing::debug!(
                route = %route.id,
                prefix = %route.matcher.prefix(),
                backend = %route.backend_base,
                strip_prefix = route.strip_prefix,
                rate_limit = ?route.rate_limit,
                "Route compiled"
            );
        }

        Ok(Self::new(routes))
    }

    /// Find the first route, in declaration order, whose prefix matches.
    pub fn match_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matcher.matches(path))
    }

    /// Number of configured routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no routes are configured.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
