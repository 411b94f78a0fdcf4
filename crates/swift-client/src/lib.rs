//! # Swift Client SDK
//!
//! A client for Swift-style account/container/object storage over HTTP.
//!
//! ## Features
//!
//! - **Lazy authentication**: the first operation fetches the storage URL and token
//! - **Token expiry**: a 401 triggers one re-authentication and one replay
//! - **Single-flight refresh**: concurrent callers share one re-authentication
//! - **Streaming**: uploads are streamed from disk, never buffered whole
//!
//! ## Example
//!
//! ```rust,ignore
//! use swift_client::{Config, PutFile, StorageClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = StorageClient::new(Config::new(
//!         "https://objectstorage.example/auth/v1.0/",
//!         "account:user",
//!         "secret",
//!     ))?;
//!
//!     client.create("photos").await?;
//!     let url = client
//!         .put_file(PutFile::new("small.jpg", "photos/small.jpg").with_header("Content-Type", "image/jpeg"))
//!         .await?;
//!     println!("Uploaded to {}", url);
//!
//!     let listing = client.list(Some("photos"), None).await?;
//!     println!("{:?}", listing.names());
//!
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod request;
mod session;
mod storage;
mod types;

pub use config::{Config, Credentials, DEFAULT_TIMEOUT};
pub use error::{ClientError, Result};
pub use request::{AuthenticatedRequest, ResponseEvent, ResponseObserver};
pub use session::{Authenticator, Session, AUTH_TOKEN_HEADER, STORAGE_URL_HEADER};
pub use storage::{slash, StorageClient};
pub use types::*;

// Re-export so callers can name header maps and methods without depending on reqwest
pub use reqwest::{header::HeaderMap, Method, StatusCode};
