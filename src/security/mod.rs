//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → auth.rs (whitelist.rs bypass, else shared token check)
//!     → [route matched]
//!     → key_resolver.rs (client IP) → rate_limit.rs (token bucket)
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → Forward to backend
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Whitelist is exact-match only
//! - Rate limiting keys on the socket peer, never on client-supplied headers

pub mod auth;
pub mod headers;
pub mod key_resolver;
pub mod rate_limit;
pub mod whitelist;

pub use auth::{AuthFilter, AuthOutcome};
pub use key_resolver::KeyResolver;
pub use rate_limit::{RateLimitDecision, RateLimiter, TokenBucketLimiter};
pub use whitelist::WhitelistAuthorizer;
