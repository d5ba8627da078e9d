use crate::api::{ApiClient, ApiError, ApiResult};
use crate::stream::{EventStream, STREAM_FAILURE_MESSAGE};
use crate::types::WardrobeItem;
use async_trait::async_trait;
use tracing::debug;

const SUGGESTION_FALLBACK: &str = "I'm here to help with outfit suggestions!";

/// A complete, non-streamed assistant reply.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub content: String,
    pub selected_items: Option<Vec<WardrobeItem>>,
}

/// The service a chat session talks to.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(
        &self,
        message: &str,
        session_id: &str,
        images: Option<&[String]>,
    ) -> ApiResult<Reply>;

    async fn stream(
        &self,
        message: &str,
        session_id: &str,
        images: Option<&[String]>,
    ) -> ApiResult<EventStream>;
}

/// Outfit suggestions drawn from the signed-in user's wardrobe.
pub struct WardrobeBackend {
    api: ApiClient,
}

impl WardrobeBackend {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ChatBackend for WardrobeBackend {
    async fn complete(
        &self,
        message: &str,
        session_id: &str,
        images: Option<&[String]>,
    ) -> ApiResult<Reply> {
        let response = self.api.get_suggestion(message, session_id, images).await?;
        if !response.success {
            return Err(ApiError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| STREAM_FAILURE_MESSAGE.to_string()),
            ));
        }
        let content = response
            .suggestion
            .and_then(|s| s.message.or(s.response))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| SUGGESTION_FALLBACK.to_string());
        Ok(Reply {
            content,
            selected_items: response.selected_items,
        })
    }

    async fn stream(
        &self,
        message: &str,
        session_id: &str,
        images: Option<&[String]>,
    ) -> ApiResult<EventStream> {
        self.api.suggest_stream(message, session_id, images).await
    }
}

/// General fashion advice from the external chat service, no wardrobe access.
pub struct FashionBackend {
    api: ApiClient,
}

impl FashionBackend {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ChatBackend for FashionBackend {
    async fn complete(
        &self,
        message: &str,
        session_id: &str,
        images: Option<&[String]>,
    ) -> ApiResult<Reply> {
        let reply = self.api.fashion_chat(message, session_id, images).await?;
        match reply.text() {
            Some(text) => Ok(Reply {
                content: text.to_string(),
                selected_items: None,
            }),
            None => Err(ApiError::Rejected(STREAM_FAILURE_MESSAGE.to_string())),
        }
    }

    async fn stream(
        &self,
        message: &str,
        session_id: &str,
        images: Option<&[String]>,
    ) -> ApiResult<EventStream> {
        if images.is_some_and(|list| !list.is_empty()) {
            debug!("fashion chat stream does not forward images");
        }
        self.api.fashion_chat_stream(message, session_id).await
    }
}
