//! High-level storage operations

use crate::{
    request::{AuthenticatedRequest, ResponseEvent, ResponseObserver},
    Authenticator, ClientError, Config, Listing, ListOptions, PutFile, Result, Session,
};
use bytes::Bytes;
use reqwest::{header, Client};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// Swift-style object storage client
pub struct StorageClient {
    config: Config,
    http: Client,
    session: Arc<Session>,
    observer: Option<ResponseObserver>,
}

impl StorageClient {
    /// Create a new client with the given configuration.
    ///
    /// No I/O happens here; the first operation authenticates.
    pub fn new(config: Config) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            config
                .user_agent
                .parse()
                .map_err(|_| ClientError::Config(format!("invalid user agent: {}", config.user_agent)))?,
        );

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        let session = Arc::new(Session::new(&config, http.clone()));
        Ok(Self {
            config,
            http,
            session,
            observer: None,
        })
    }

    /// Report every storage exchange to `observer`
    pub fn with_observer(
        mut self,
        observer: impl Fn(&ResponseEvent<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Session holding the cached storage URL and token
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Storage URL, authenticating on first use
    pub async fn get_url(&self) -> Result<String> {
        self.session.storage_url().await
    }

    // ==================== Metadata ====================

    /// Read metadata of the account (no path), a container or an object
    #[instrument(skip(self, headers))]
    pub async fn get_meta(
        &self,
        path: Option<&str>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<header::HeaderMap> {
        let (req, url) = self.request().await?;
        let response = req
            .head(format!("{}{}", url, slash(path.unwrap_or_default())))
            .headers(headers.into_iter().flatten().map(|(k, v)| (k.as_str(), v.as_str())))
            .execute()
            .await?;
        Ok(response.headers)
    }

    /// Write metadata headers on a container or object.
    ///
    /// Sent as PUT, which is what deployed servers of this API have always received.
    #[instrument(skip(self, headers))]
    pub async fn set_meta(
        &self,
        path: &str,
        headers: &HashMap<String, String>,
    ) -> Result<header::HeaderMap> {
        let (req, url) = self.request().await?;
        let response = req
            .put(format!("{}{}", url, slash(path)))
            .headers(headers.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .execute()
            .await?;
        Ok(response.headers)
    }

    // ==================== Objects ====================

    /// Delete an object (or an empty container)
    #[instrument(skip(self))]
    pub async fn delete_file(&self, path: &str) -> Result<()> {
        let (req, url) = self.request().await?;
        req.delete(format!("{}{}", url, slash(path))).execute().await?;
        Ok(())
    }

    /// Upload a local file, returning the object's absolute URL
    #[instrument(skip(self, upload), fields(src = %upload.src.display(), dst = %upload.dst))]
    pub async fn put_file(&self, upload: PutFile) -> Result<String> {
        let (req, url) = self.request().await?;
        let object_url = format!("{}{}", url, slash(&upload.dst));
        req.put(object_url.clone())
            .attach(upload.src)
            .headers(upload.headers)
            .execute()
            .await?;
        Ok(object_url)
    }

    /// Download an object's content
    #[instrument(skip(self))]
    pub async fn get_file(&self, path: &str) -> Result<Bytes> {
        let (req, url) = self.request().await?;
        let response = req.get(format!("{}{}", url, slash(path))).execute().await?;
        Ok(response.body)
    }

    /// Server-side copy of `src` to `dst`
    #[instrument(skip(self))]
    pub async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let (req, url) = self.request().await?;
        req.put(format!("{}{}", url, slash(dst)))
            .header("X-Copy-From", slash(src))
            .header(header::CONTENT_LENGTH.as_str(), "0")
            .execute()
            .await?;
        Ok(())
    }

    // ==================== Containers ====================

    /// Create a container
    #[instrument(skip(self))]
    pub async fn create(&self, container: &str) -> Result<()> {
        let (req, url) = self.request().await?;
        req.put(format!("{}{}", url, slash(container)))
            .execute()
            .await?;
        Ok(())
    }

    /// List containers of the account, or objects of `container`.
    ///
    /// JSON responses are parsed; any other content type comes back as text.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        container: Option<&str>,
        options: Option<&ListOptions>,
    ) -> Result<Listing> {
        let (req, url) = self.request().await?;
        let mut target = format!("{}{}", url, slash(container.unwrap_or_default()));
        if let Some(query) = options.map(ListOptions::to_query).filter(|q| !q.is_empty()) {
            target.push('?');
            target.push_str(&query);
        }

        let response = req.get(target).execute().await?;
        let content_type = response.header(header::CONTENT_TYPE.as_str()).unwrap_or_default();
        if is_json(content_type) {
            let value = serde_json::from_slice(&response.body)
                .map_err(|e| ClientError::InvalidResponse(format!("listing is not valid JSON: {}", e)))?;
            Ok(Listing::Json(value))
        } else {
            Ok(Listing::Text(response.text()))
        }
    }

    // ==================== Helper Methods ====================

    async fn request(&self) -> Result<(AuthenticatedRequest, String)> {
        let url = self.session.storage_url().await?;
        let session: Arc<dyn Authenticator> = self.session.clone();
        let req = AuthenticatedRequest::new(session, self.http.clone())
            .timeout(self.config.timeout)
            .observer(self.observer.clone());
        Ok((req, url))
    }
}

/// Ensure `path` starts with exactly one slash
pub fn slash(path: &str) -> Cow<'_, str> {
    if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{}", path))
    }
}

fn is_json(content_type: &str) -> bool {
    content_type
        .strip_prefix("application/json")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(';'))
}
