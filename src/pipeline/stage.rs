//! Pipeline stages, in the order a request visits them.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Received,
    Authorizing,
    Routing,
    RateChecking,
    Forwarding,
    Decorating,
    Completed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Authorizing => "authorizing",
            Stage::Routing => "routing",
            Stage::RateChecking => "rate_checking",
            Stage::Forwarding => "forwarding",
            Stage::Decorating => "decorating",
            Stage::Completed => "completed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
