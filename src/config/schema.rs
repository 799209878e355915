//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Shared-token authentication and the auth whitelist.
    pub auth: AuthConfig,

    /// Default rate limiting policy.
    pub rate_limit: RateLimitConfig,

    /// Route definitions, matched in declaration order.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Cross-origin response headers.
    pub cors: CorsConfig,

    /// Headers added to forwarded requests.
    pub forwarding: ForwardingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret expected in the `token` request header.
    pub token: String,

    /// Paths that bypass authentication (exact match).
    pub whitelist: Vec<String>,
}

/// Token bucket parameters applied to one route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimitPolicy {
    /// Tokens added per second.
    pub replenish_rate: u32,

    /// Maximum tokens a bucket holds (burst size).
    pub burst_capacity: u32,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            replenish_rate: 4,
            burst_capacity: 16,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Tokens added per second for routes without their own policy.
    pub replenish_rate: u32,

    /// Burst capacity for routes without their own policy.
    pub burst_capacity: u32,

    /// Add `X-RateLimit-*` headers to rate-checked responses.
    pub include_headers: bool,
}

impl RateLimitConfig {
    /// The policy used by routes that do not declare one.
    pub fn default_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            replenish_rate: self.replenish_rate,
            burst_capacity: self.burst_capacity,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let policy = RateLimitPolicy::default();
        Self {
            enabled: true,
            replenish_rate: policy.replenish_rate,
            burst_capacity: policy.burst_capacity,
            include_headers: true,
        }
    }
}

/// Route configuration mapping a path prefix to a backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging, metrics and rate-limit buckets.
    pub id: String,

    /// Path prefix to match. A trailing `/**` covers the whole subtree.
    pub path: String,

    /// Backend base URL (e.g., "http://127.0.0.1:3000").
    pub uri: String,

    /// Remove the matched prefix before forwarding.
    #[serde(default)]
    pub strip_prefix: bool,

    /// Route-specific policy, overriding the default one.
    #[serde(default)]
    pub rate_limit: Option<RateLimitPolicy>,
}

/// Timeout configuration for backend calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total time allowed for the backend to produce a response, in seconds.
    pub backend_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            backend_secs: 30,
        }
    }
}

/// CORS headers added to every response.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Value of `Access-Control-Allow-Origin`.
    pub allow_origin: String,

    /// Value of `Access-Control-Allow-Credentials`.
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_credentials: true,
        }
    }
}

/// Forwarded request decoration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Add X-Forwarded-For, X-Forwarded-Proto and X-Forwarded-Host.
    pub x_forwarded_headers: bool,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            x_forwarded_headers: true,
        }
    }
}

/// Log output flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Full,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
