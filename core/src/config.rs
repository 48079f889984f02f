//! Session configuration for the default transport.

use std::collections::HashMap;
use std::time::Duration;

/// Settings fixed for the lifetime of a transport session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Redirects followed before the response is returned as-is.
    pub max_redirects: u32,

    /// Upper bound on establishing a connection. `None` leaves it to the
    /// per-request timeout.
    pub connect_timeout: Option<Duration>,

    /// Headers sent with every request unless the request sets a header of
    /// the same name.
    pub additional_headers: HashMap<String, String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            connect_timeout: None,
            additional_headers: HashMap::new(),
        }
    }
}

impl SessionConfig {
    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.max_redirects, 10);
        assert!(config.connect_timeout.is_none());
        assert!(config.additional_headers.is_empty());
    }

    #[test]
    fn setters_chain() {
        let config = SessionConfig::default()
            .with_max_redirects(0)
            .with_connect_timeout(Duration::from_secs(5))
            .with_header("user-agent", "courier/0.1");
        assert_eq!(config.max_redirects, 0);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.additional_headers["user-agent"], "courier/0.1");
    }
}
