//! Rate-limit key derivation.

use std::net::SocketAddr;

/// Derives the rate-limiting key from the connecting peer.
///
/// Forwarded-for headers are ignored; the key is the socket peer IP.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyResolver;

impl KeyResolver {
    pub fn resolve(&self, remote_addr: SocketAddr) -> String {
        remote_addr.ip().to_string()
    }
}
