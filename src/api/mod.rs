//! HTTP client for the wardrobe backend and the external fashion chat service.
//!
//! Every backend call attaches the bearer token stored under [`TOKEN_KEY`] in
//! the injected [`Storage`], so logging in or out anywhere is seen by the next
//! request.
//!
//! # Layout
//!
//! - `auth`, `profile`, `upload`, `wardrobe`, `avatar` - REST backend calls
//! - `suggest` - wardrobe-aware suggestions (plain and streaming)
//! - `fashion` - the separate fashion chat service (plain and streaming)
mod auth;
mod avatar;
mod fashion;
mod profile;
mod suggest;
mod upload;
mod wardrobe;

pub use avatar::RenderOptions;
pub use profile::ProfileUpdate;
pub use upload::{MAX_UPLOAD_FILES, UploadFile};
pub use wardrobe::WardrobeQuery;

use crate::config::ClientConfig;
use crate::storage::Storage;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

pub const TOKEN_KEY: &str = "token";

/// Number of extra attempts for retryable chat requests.
const MAX_RETRIES: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error! status: {status}, message: {body}")]
    Http { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Validation(String),

    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// True when the request never reached the server.
    pub fn is_connection(&self) -> bool {
        matches!(self, ApiError::Network(err) if err.is_connect() || err.is_timeout())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Request body shared by the suggest and fashion chat endpoints.
#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<&'a [String]>,
}

impl<'a> ChatRequest<'a> {
    fn new(message: &'a str, session_id: &'a str, images: Option<&'a [String]>) -> Self {
        Self {
            message,
            session_id,
            images: images.filter(|list| !list.is_empty()),
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    store: Arc<dyn Storage>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, store: Arc<dyn Storage>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: Arc::new(config),
            store,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Storage> {
        &self.store
    }

    pub fn token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).filter(|token| !token.is_empty())
    }

    fn set_token(&self, token: &str) {
        if let Err(err) = self.store.set(TOKEN_KEY, token) {
            warn!(error = %err, "failed to persist auth token");
        }
    }

    fn remove_token(&self) {
        if let Err(err) = self.store.remove(TOKEN_KEY) {
            warn!(error = %err, "failed to remove auth token");
        }
    }

    fn backend_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }

    /// Backend URL of `path` followed by `segment`, percent-encoded so ids
    /// containing `/` or `?` stay one path segment.
    fn backend_url_with(&self, path: &str, segment: &str) -> ApiResult<Url> {
        let mut url = Url::parse(&self.backend_url(path))
            .map_err(|err| ApiError::Validation(format!("invalid backend URL: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Validation("backend URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    fn chat_url(&self, path: &str) -> String {
        format!("{}{}", self.config.fashion_chat_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request, retrying once after the configured delay when the
    /// service answers 502/503 or cannot be reached.
    async fn send_with_retry<F>(&self, build: F) -> ApiResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let result = build().send().await;
            let retryable = match &result {
                Ok(response) => matches!(
                    response.status(),
                    StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE
                ),
                Err(err) => err.is_connect() || err.is_timeout(),
            };
            if retryable && attempt < MAX_RETRIES {
                attempt += 1;
                warn!(attempt, "service unavailable, retrying");
                tokio::time::sleep(self.config.retry_delay).await;
                continue;
            }
            return result.map_err(ApiError::from);
        }
    }
}

/// Decode a JSON body, failing on any non-2xx status.
async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ApiError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

/// Decode a backend `{ success, error, .. }` envelope. Error statuses that
/// still carry an envelope are returned as data so callers can show `error`.
async fn read_envelope<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    let body = response.text().await?;
    match serde_json::from_str(&body) {
        Ok(parsed) => Ok(parsed),
        Err(_) if !status.is_success() => Err(ApiError::Http {
            status: status.as_u16(),
            body,
        }),
        Err(err) => Err(err.into()),
    }
}

/// Reject a streaming response before its body is consumed.
async fn ensure_success(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Http {
        status: status.as_u16(),
        body,
    })
}
