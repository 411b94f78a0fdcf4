//! One authenticated storage call with a single replay on token expiry

use crate::{session::AUTH_TOKEN_HEADER, Authenticator, ClientError, Result, StorageResponse};
use futures::TryStreamExt;
use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Body, Client, Method, StatusCode,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// First attempt plus at most one replay after re-authentication
const MAX_ATTEMPTS: u8 = 2;

/// Callback invoked after every exchange, including rejected ones and
/// attempts that failed before a response arrived
pub type ResponseObserver = Arc<dyn Fn(&ResponseEvent<'_>) + Send + Sync>;

/// What an observer sees for each exchange
#[derive(Debug)]
pub struct ResponseEvent<'a> {
    pub method: &'a Method,
    pub url: &'a str,
    /// `None` when no response arrived (transport failure, timeout, unreadable attachment)
    pub status: Option<StatusCode>,
    /// Response headers, empty when no response arrived
    pub headers: &'a HeaderMap,
    /// 1 for the first attempt, 2 for the replay
    pub attempt: u8,
}

/// A storage call bound to a session.
///
/// Built with the chaining setters, then run once with [`execute`](Self::execute).
/// A 401 on the first attempt makes the request refresh the session token and
/// replay itself; any other failure, or a 401 on the replay, is returned.
pub struct AuthenticatedRequest {
    session: Arc<dyn Authenticator>,
    http: Client,
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    attachment: Option<PathBuf>,
    timeout: Duration,
    observer: Option<ResponseObserver>,
}

impl AuthenticatedRequest {
    pub fn new(session: Arc<dyn Authenticator>, http: Client) -> Self {
        Self {
            session,
            http,
            method: Method::GET,
            url: String::new(),
            headers: Vec::new(),
            attachment: None,
            timeout: crate::config::DEFAULT_TIMEOUT,
            observer: None,
        }
    }

    /// Set method and absolute URL
    pub fn configure(mut self, method: Method, url: impl Into<String>) -> Self {
        self.method = method;
        self.url = url.into();
        self
    }

    pub fn get(self, url: impl Into<String>) -> Self {
        self.configure(Method::GET, url)
    }

    pub fn put(self, url: impl Into<String>) -> Self {
        self.configure(Method::PUT, url)
    }

    pub fn delete(self, url: impl Into<String>) -> Self {
        self.configure(Method::DELETE, url)
    }

    pub fn head(self, url: impl Into<String>) -> Self {
        self.configure(Method::HEAD, url)
    }

    /// Set a header, replacing any earlier value under the same name (ignoring case)
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&key));
        self.headers.push((key, value.into()));
        self
    }

    /// Set several headers at once
    pub fn headers<K, V>(self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .fold(self, |req, (k, v)| req.header(k, v))
    }

    /// Stream the file at `path` as the request body
    pub fn attach(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachment = Some(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn observer(mut self, observer: Option<ResponseObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Headers the next attempt would send, with the session's current token
    pub fn outgoing_headers(&self) -> Result<HeaderMap> {
        self.build_headers(self.session.current_token().as_deref())
    }

    fn build_headers(&self, token: Option<&str>) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.headers.len() + 2);
        for (key, value) in &self.headers {
            map.insert(parse_name(key)?, parse_value(key, value)?);
        }
        if let Some(token) = token {
            map.insert(AUTH_TOKEN_HEADER, parse_value(AUTH_TOKEN_HEADER, token)?);
        }
        map.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        Ok(map)
    }

    /// Run the call, replaying it once if the first attempt gets a 401
    pub async fn execute(self) -> Result<StorageResponse> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let token = self.session.current_token();
            let response = match self.send(token.as_deref()).await {
                Ok(response) => response,
                Err(err) => {
                    debug!(method = %self.method, url = %self.url, attempt, error = %err, "Storage call failed");
                    self.notify(None, &HeaderMap::new(), attempt);
                    return Err(err);
                }
            };
            debug!(
                method = %self.method,
                url = %self.url,
                status = response.status.as_u16(),
                attempt,
                "Storage response"
            );
            self.notify(Some(response.status), &response.headers, attempt);

            if response.status.is_success() {
                return Ok(response);
            }

            if response.status == StatusCode::UNAUTHORIZED && attempt < MAX_ATTEMPTS {
                warn!(method = %self.method, url = %self.url, "Auth token rejected, re-authenticating");
                self.session.refresh(token.as_deref()).await?;
                continue;
            }

            return Err(ClientError::HttpStatus {
                method: self.method.as_str().to_uppercase(),
                url: self.url.clone(),
                status: response.status.as_u16(),
                body: response.text(),
            });
        }
    }

    fn notify(&self, status: Option<StatusCode>, headers: &HeaderMap, attempt: u8) {
        if let Some(observer) = &self.observer {
            observer(&ResponseEvent {
                method: &self.method,
                url: &self.url,
                status,
                headers,
                attempt,
            });
        }
    }

    async fn send(&self, token: Option<&str>) -> Result<StorageResponse> {
        let mut builder = self
            .http
            .request(self.method.clone(), &self.url)
            .headers(self.build_headers(token)?)
            .timeout(self.timeout);

        // The file is owned by the body stream and closed when the body is dropped
        let read_failure = Arc::new(parking_lot::Mutex::new(None::<std::io::Error>));
        if let Some(path) = &self.attachment {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|source| ClientError::Stream {
                    path: path.clone(),
                    source,
                })?;
            let slot = Arc::clone(&read_failure);
            let stream = ReaderStream::new(file).map_err(move |err| {
                let forwarded = std::io::Error::new(err.kind(), err.to_string());
                *slot.lock() = Some(err);
                forwarded
            });
            builder = builder.body(Body::wrap_stream(stream));
        }

        let method = self.method.as_str();
        let result = match builder.send().await {
            Ok(response) => {
                let status = response.status();
                let headers = response.headers().clone();
                response
                    .bytes()
                    .await
                    .map(|body| StorageResponse {
                        status,
                        headers,
                        body,
                    })
            }
            Err(err) => Err(err),
        };

        result.map_err(|err| match (read_failure.lock().take(), &self.attachment) {
            (Some(source), Some(path)) => ClientError::Stream {
                path: path.clone(),
                source,
            },
            _ => ClientError::from_reqwest(err, method, &self.url, self.timeout),
        })
    }
}

fn parse_name(key: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(key.as_bytes())
        .map_err(|_| ClientError::Config(format!("invalid header name: {}", key)))
}

fn parse_value(key: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| ClientError::Config(format!("invalid value for header {}", key)))
}
