//! HTTP client with connection pooling

use kratos_config::NetworkConfig;
use kratos_errors::{Error, NetworkError};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Whole-request bound; `None` leaves requests unbounded
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: None,
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: format!("kratos/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&NetworkConfig> for NetConfig {
    fn from(config: &NetworkConfig) -> Self {
        let defaults = Self::default();
        Self {
            timeout: config.timeout(),
            connect_timeout: config.connect_timeout(),
            user_agent: config
                .user_agent
                .clone()
                .unwrap_or(defaults.user_agent.clone()),
            ..defaults
        }
    }
}

/// HTTP client wrapper issuing single GET requests
///
/// There is no transport-level retry: a failed request is reported once and
/// retry decisions belong to the verification session.
#[derive(Clone)]
pub struct NetClient {
    client: Client,
    config: NetConfig,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let client = builder
            .build()
            .map_err(|e| NetworkError::ClientBuild(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(NetConfig::default())
    }

    /// Issue one GET request and wait for the response headers
    ///
    /// The status is not inspected here.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, connection failure or any other transport fault.
    pub async fn get(&self, url: &Url, headers: &HeaderMap) -> Result<Response, Error> {
        tracing::debug!(url = %url, "sending GET request");

        self.client
            .get(url.clone())
            .headers(headers.clone())
            .send()
            .await
            .map_err(|e| transport_error(&e, url))
    }

    #[must_use]
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Get the underlying reqwest client for advanced usage
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Map a reqwest failure onto the transport error variants
pub(crate) fn transport_error(error: &reqwest::Error, url: &Url) -> Error {
    if error.is_timeout() {
        NetworkError::Timeout {
            url: url.to_string(),
        }
        .into()
    } else if error.is_connect() {
        NetworkError::ConnectionRefused(format!("request to {url} failed: {error}")).into()
    } else {
        NetworkError::DownloadFailed(format!("request to {url} failed: {error}")).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_network_section() {
        let section = NetworkConfig {
            timeout: Some(30),
            connect_timeout: None,
            user_agent: Some("launcher/2.0".to_string()),
        };
        let config = NetConfig::from(&section);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.connect_timeout, None);
        assert_eq!(config.user_agent, "launcher/2.0");
    }

    #[test]
    fn test_default_has_no_timeouts() {
        let config = NetConfig::from(&NetworkConfig::default());
        assert!(config.timeout.is_none());
        assert!(config.user_agent.starts_with("kratos/"));
        assert!(NetClient::new(config).is_ok());
    }
}
