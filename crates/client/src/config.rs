//! Client configuration.
//!
//! The server URL comes from the environment in deployments; tests and
//! embedders construct the config directly. The request timeout bounds how
//! long an [`crate::Ack`] waits before settling with
//! [`crate::RequestError::TimedOut`].

use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable holding the server WebSocket URL.
pub const WS_URL_ENV: &str = "GRIDLOCK_WS_URL";
/// Environment variable holding the request timeout in milliseconds.
pub const REQUEST_TIMEOUT_ENV: &str = "GRIDLOCK_REQUEST_TIMEOUT_MS";
/// Environment variable holding the optional login authorization token.
pub const AUTH_TOKEN_ENV: &str = "GRIDLOCK_AUTH_TOKEN";

const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a [`crate::GameClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the game server.
    pub ws_url: String,
    /// Deadline applied when awaiting a correlated reply.
    pub request_timeout: Duration,
    /// Optional token forwarded in the login request.
    pub authorization: Option<String>,
}

impl ClientConfig {
    /// Create a config for the given server URL.
    pub fn new(ws_url: impl Into<String>) -> Result<Self, ConfigError> {
        let ws_url = ws_url.into();
        let parsed = url::Url::parse(&ws_url).map_err(|source| ConfigError::InvalidUrl {
            url: ws_url.clone(),
            source,
        })?;
        match parsed.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(ConfigError::UnsupportedScheme {
                    scheme: other.to_string(),
                });
            }
        }
        Ok(Self {
            ws_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            authorization: None,
        })
    }

    /// Read the config from the environment, falling back to a local server.
    pub fn from_env() -> Result<Self, ConfigError> {
        let ws_url =
            std::env::var(WS_URL_ENV).unwrap_or_else(|_| DEFAULT_WS_URL.to_string());
        let mut config = Self::new(ws_url)?;

        if let Ok(raw) = std::env::var(REQUEST_TIMEOUT_ENV) {
            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout { value: raw.clone() })?;
            config.request_timeout = Duration::from_millis(millis);
        }

        if let Ok(token) = std::env::var(AUTH_TOKEN_ENV) {
            config.authorization = Some(token);
        }

        Ok(config)
    }

    /// Override the reply deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Attach a login authorization token.
    pub fn with_authorization(mut self, token: impl Into<String>) -> Self {
        self.authorization = Some(token.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ws_and_wss_urls() {
        assert!(ClientConfig::new("ws://localhost:8080/ws").is_ok());
        assert!(ClientConfig::new("wss://play.example.net/ws").is_ok());
    }

    #[test]
    fn rejects_non_websocket_scheme() {
        let err = ClientConfig::new("http://localhost:8080/ws");
        assert!(matches!(
            err,
            Err(ConfigError::UnsupportedScheme { scheme }) if scheme == "http"
        ));
    }

    #[test]
    fn rejects_unparseable_url() {
        assert!(matches!(
            ClientConfig::new("not a url"),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn builder_overrides_apply() {
        let config = ClientConfig::new("ws://localhost:8080/ws")
            .unwrap()
            .with_request_timeout(Duration::from_millis(250))
            .with_authorization("token-1");

        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.authorization.as_deref(), Some("token-1"));
    }
}
