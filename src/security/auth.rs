//! Shared-token authentication stage.
//! Whitelisted paths pass untouched; everything else needs the shared token.

use axum::http::HeaderValue;

use crate::config::AuthConfig;
use crate::error::GatewayError;
use crate::http::request::RequestContext;
use crate::security::whitelist::WhitelistAuthorizer;

/// Request header carrying the shared token.
pub const TOKEN_HEADER: &str = "token";

/// Header injected for authenticated requests (`userId` on the wire is
/// case-insensitive; header names are stored lowercase).
pub const USER_ID_HEADER: &str = "userid";

/// User id attached to token-authenticated requests.
const AUTHENTICATED_USER_ID: &str = "0";

/// How a request got through the auth stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Path is whitelisted; request left unchanged.
    Exempt,
    /// Token matched; headers rewritten.
    Authenticated,
}

/// First pipeline stage.
#[derive(Debug, Clone)]
pub struct AuthFilter {
    whitelist: WhitelistAuthorizer,
    token: String,
}

impl AuthFilter {
    pub fn new(whitelist: WhitelistAuthorizer, token: impl Into<String>) -> Self {
        Self {
            whitelist,
            token: token.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            WhitelistAuthorizer::new(config.whitelist.iter().cloned()),
            config.token.clone(),
        )
    }

    /// Run the stage, returning the (possibly rewritten) context or a 403.
    pub fn apply(&self, mut ctx: RequestContext) -> Result<(RequestContext, AuthOutcome), GatewayError> {
        if self.whitelist.is_exempt(ctx.path()) {
            tracing::debug!(path = %ctx.path(), "Whitelisted path, skipping auth");
            return Ok((ctx, AuthOutcome::Exempt));
        }

        // Only the first value counts; non-ASCII values can never match.
        let presented = ctx
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        match presented {
            Some(token) if token == self.token => {
                tracing::info!(token = %token, "Token accepted");
                let headers = ctx.headers_mut();
                headers.remove(TOKEN_HEADER);
                headers.insert(USER_ID_HEADER, HeaderValue::from_static(AUTHENTICATED_USER_ID));
                Ok((ctx, AuthOutcome::Authenticated))
            }
            _ => Err(GatewayError::AuthRejected),
        }
    }
}
