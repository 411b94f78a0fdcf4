//! Token lifecycle: authentication handshake and cached credentials

use crate::{AuthState, ClientError, Config, Credentials, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Auth token header, sent on every storage call and returned by the auth endpoint
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
/// Storage URL header returned by the auth endpoint
pub const STORAGE_URL_HEADER: &str = "X-Storage-Url";
const AUTH_USER_HEADER: &str = "X-Auth-User";
const AUTH_KEY_HEADER: &str = "X-Auth-Key";

/// Capability a request needs from its session: read the token, obtain a new one
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Cached token, without I/O
    fn current_token(&self) -> Option<String>;

    /// Run the authentication handshake and cache its result
    async fn authenticate(&self) -> Result<AuthState>;

    /// Replace a token the server rejected.
    ///
    /// `stale` is the token the caller sent. Implementations may skip the
    /// handshake when the cached token has already moved past it.
    async fn refresh(&self, _stale: Option<&str>) -> Result<AuthState> {
        self.authenticate().await
    }
}

/// Authenticated session for one account.
///
/// Holds the credentials and the `(storage_url, token)` pair issued by the
/// last successful handshake. Handshakes are serialized, so concurrent
/// callers that hit an expired token share a single re-authentication.
pub struct Session {
    credentials: Credentials,
    timeout: Duration,
    http: Client,
    state: RwLock<Option<AuthState>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl Session {
    /// Create a session with nothing cached; the first call authenticates
    pub fn new(config: &Config, http: Client) -> Self {
        Self {
            credentials: config.credentials.clone(),
            timeout: config.timeout,
            http,
            state: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Account credentials
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Timeout applied to the handshake
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cached storage URL and token, if authenticated
    pub fn auth_state(&self) -> Option<AuthState> {
        self.state.read().clone()
    }

    /// Seed the cache with a previously issued pair
    pub fn restore(&self, state: AuthState) {
        *self.state.write() = Some(state);
    }

    /// Drop the cached pair; the next call authenticates again
    pub fn clear(&self) {
        *self.state.write() = None;
    }

    /// Storage URL, authenticating first if none is cached
    pub async fn storage_url(&self) -> Result<String> {
        if let Some(state) = self.auth_state() {
            return Ok(state.storage_url);
        }
        Ok(self.refresh(None).await?.storage_url)
    }

    #[instrument(skip(self), fields(host = %self.credentials.host))]
    async fn handshake(&self) -> Result<AuthState> {
        let host = &self.credentials.host;
        debug!("Requesting new auth token");

        let response = self
            .http
            .get(host)
            .header(header::ACCEPT, "application/json")
            .header(AUTH_USER_HEADER, &self.credentials.username)
            .header(AUTH_KEY_HEADER, &self.credentials.password)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_failure(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Auth {
                message: format!(
                    "GET {} responded with statusCode: {}, body: {}",
                    host,
                    status.as_u16(),
                    body
                ),
                status: Some(status.as_u16()),
            });
        }

        let headers = response.headers();
        let storage_url = required_header(headers, STORAGE_URL_HEADER)?;
        let token = required_header(headers, AUTH_TOKEN_HEADER)?;

        let state = AuthState { storage_url, token };
        *self.state.write() = Some(state.clone());
        info!(storage_url = %state.storage_url, "Authenticated");
        Ok(state)
    }

    fn transport_failure(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            return ClientError::Timeout {
                method: "GET".to_string(),
                url: self.credentials.host.clone(),
                timeout: self.timeout,
            };
        }
        ClientError::Auth {
            message: format!("GET {} failed: {}", self.credentials.host, err),
            status: None,
        }
    }
}

#[async_trait]
impl Authenticator for Session {
    fn current_token(&self) -> Option<String> {
        self.state.read().as_ref().map(|s| s.token.clone())
    }

    async fn authenticate(&self) -> Result<AuthState> {
        let _guard = self.refresh_lock.lock().await;
        self.handshake().await
    }

    async fn refresh(&self, stale: Option<&str>) -> Result<AuthState> {
        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while this one waited for the lock
        if let Some(state) = self.auth_state() {
            if stale != Some(state.token.as_str()) {
                debug!("Reusing token refreshed by a concurrent caller");
                return Ok(state);
            }
        }
        self.handshake().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .field("state", &*self.state.read())
            .finish()
    }
}

fn required_header(headers: &header::HeaderMap, name: &str) -> Result<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ClientError::Auth {
            message: format!("authentication response is missing {}", name),
            status: None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(&Config::new("http://127.0.0.1:9/auth", "user", "pass"), Client::new())
    }

    #[tokio::test]
    async fn test_cached_url_needs_no_io() {
        let session = session();
        session.restore(AuthState::new("http://store", "token"));

        assert_eq!(session.storage_url().await.unwrap(), "http://store");
        assert_eq!(session.current_token().as_deref(), Some("token"));
    }

    #[tokio::test]
    async fn test_refresh_reuses_newer_token() {
        let session = session();
        session.restore(AuthState::new("http://store", "fresh"));

        // "stale" was already replaced, so no handshake against the unreachable host
        let state = session.refresh(Some("stale")).await.unwrap();
        assert_eq!(state.token, "fresh");
    }

    #[tokio::test]
    async fn test_resume_persisted_state() {
        let saved = serde_json::to_string(&AuthState::new("http://store", "token")).unwrap();

        let session = session();
        session.restore(serde_json::from_str(&saved).unwrap());

        assert_eq!(session.storage_url().await.unwrap(), "http://store");
        assert_eq!(session.current_token().as_deref(), Some("token"));
    }

    #[test]
    fn test_clear_drops_both_values() {
        let session = session();
        session.restore(AuthState::new("http://store", "token"));
        session.clear();

        assert!(session.auth_state().is_none());
        assert!(session.current_token().is_none());
    }

    #[test]
    fn test_required_header_is_case_insensitive() {
        let mut headers = header::HeaderMap::new();
        headers.insert("x-storage-url", "http://store".parse().unwrap());

        assert_eq!(required_header(&headers, STORAGE_URL_HEADER).unwrap(), "http://store");
        assert!(required_header(&headers, AUTH_TOKEN_HEADER).is_err());
    }
}
