//! Client configuration

use std::fmt;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Account credentials for the authentication endpoint
#[derive(Clone)]
pub struct Credentials {
    /// Authentication endpoint URL (e.g. "https://store.example/auth/v1.0/")
    pub host: String,
    /// Value sent as `X-Auth-User`
    pub username: String,
    /// Value sent as `X-Auth-Key`
    pub password: String,
}

impl Credentials {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Client configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Account credentials
    pub credentials: Credentials,
    /// Request timeout, applied to authentication and every storage call
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Config {
    /// Create a new config for the given account
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            credentials: Credentials::new(host, username, password),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("swift-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Authentication endpoint URL
    pub fn auth_url(&self) -> &str {
        &self.credentials.host
    }
}
