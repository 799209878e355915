//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, rates >= 1, addresses parse)
//! - Check route identity and backend URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, RateLimitPolicy};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`")]
    BindAddress(String),
    #[error("auth.token must not be empty")]
    EmptyToken,
    #[error("whitelist entry `{0}` must start with '/'")]
    WhitelistPath(String),
    #[error("route #{0} has an empty id")]
    EmptyRouteId(usize),
    #[error("duplicate route id `{0}`")]
    DuplicateRouteId(String),
    #[error("route `{id}` path `{path}` must start with '/'")]
    RoutePath { id: String, path: String },
    #[error("route `{id}` uri `{uri}` is invalid: {reason}")]
    RouteUri { id: String, uri: String, reason: String },
    #[error("{scope} rate limit must have replenish_rate >= 1 and burst_capacity >= 1")]
    RateLimitPolicy { scope: String },
    #[error("timeouts.{0} must be greater than zero")]
    Timeout(&'static str),
    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.auth.token.is_empty() {
        errors.push(ValidationError::EmptyToken);
    }
    for path in &config.auth.whitelist {
        if !path.starts_with('/') {
            errors.push(ValidationError::WhitelistPath(path.clone()));
        }
    }

    if !policy_is_valid(&config.rate_limit.default_policy()) {
        errors.push(ValidationError::RateLimitPolicy { scope: "default".into() });
    }

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.id.is_empty() {
            errors.push(ValidationError::EmptyRouteId(index));
        } else if !seen.insert(route.id.as_str()) {
            errors.push(ValidationError::DuplicateRouteId(route.id.clone()));
        }

        if !route.path.starts_with('/') {
            errors.push(ValidationError::RoutePath {
                id: route.id.clone(),
                path: route.path.clone(),
            });
        }

        if let Err(reason) = check_backend_uri(&route.uri) {
            errors.push(ValidationError::RouteUri {
                id: route.id.clone(),
                uri: route.uri.clone(),
                reason,
            });
        }

        if let Some(policy) = &route.rate_limit {
            if !policy_is_valid(policy) {
                errors.push(ValidationError::RateLimitPolicy {
                    scope: format!("route `{}`", route.id),
                });
            }
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Timeout("connect_secs"));
    }
    if config.timeouts.backend_secs == 0 {
        errors.push(ValidationError::Timeout("backend_secs"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn policy_is_valid(policy: &RateLimitPolicy) -> bool {
    policy.replenish_rate >= 1 && policy.burst_capacity >= 1
}

fn check_backend_uri(uri: &str) -> Result<(), String> {
    let url = Url::parse(uri).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() {
        return Err("query strings are not allowed".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    fn route(id: &str, path: &str, uri: &str) -> RouteConfig {
        RouteConfig {
            id: id.into(),
            path: path.into(),
            uri: uri.into(),
            strip_prefix: false,
            rate_limit: None,
        }
    }

    fn valid_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.auth.token = "abc".into();
        config.auth.whitelist = vec!["/h5/login".into()];
        config.routes.push(route("h5", "/h5/**", "http://127.0.0.1:801"));
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert_eq!(validate_config(&valid_config()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = valid_config();
        config.auth.token.clear();
        config.routes.push(route("h5", "otc", "https://example.com"));
        config.timeouts.backend_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyToken));
        assert!(errors.contains(&ValidationError::DuplicateRouteId("h5".into())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::RoutePath { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::RouteUri { .. })));
        assert!(errors.contains(&ValidationError::Timeout("backend_secs")));
    }

    #[test]
    fn test_zero_rate_policy_rejected() {
        let mut config = valid_config();
        config.routes[0].rate_limit = Some(RateLimitPolicy {
            replenish_rate: 0,
            burst_capacity: 16,
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::RateLimitPolicy { scope: "route `h5`".into() }]
        );
    }

    #[test]
    fn test_whitelist_entry_must_be_absolute() {
        let mut config = valid_config();
        config.auth.whitelist.push("login".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::WhitelistPath("login".into())]);
    }
}
