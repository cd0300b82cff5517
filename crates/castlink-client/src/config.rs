//! Client configuration.

use std::time::Duration;

use crate::DEFAULT_REQUEST_TIMEOUT;

/// Settings for a [`CastClient`](crate::CastClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// How long a correlated request waits for its response.
    pub request_timeout: Duration,
    /// Record rejected inbound messages in the debug log.
    pub debug: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { request_timeout: DEFAULT_REQUEST_TIMEOUT, debug: false }
    }
}

impl ClientConfig {
    /// Override the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enable or disable debug logging of rejected traffic.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
