use super::{ApiClient, ApiResult, ChatRequest, ensure_success, read_json};
use crate::stream::{EventStream, decode_events};
use crate::types::FashionReply;
use reqwest::multipart::Form;
use tracing::debug;

// The fashion chat service lives on its own origin and takes no bearer token.
impl ApiClient {
    pub async fn fashion_chat(
        &self,
        message: &str,
        session_id: &str,
        images: Option<&[String]>,
    ) -> ApiResult<FashionReply> {
        let url = self.chat_url("/chat");
        let body = ChatRequest::new(message, session_id, images);
        let response = self
            .send_with_retry(|| self.http.post(&url).json(&body))
            .await?;
        read_json(response).await
    }

    pub async fn fashion_chat_stream(
        &self,
        message: &str,
        session_id: &str,
    ) -> ApiResult<EventStream> {
        debug!(session_id, "opening fashion chat stream");
        let form = Form::new()
            .text("message", message.to_string())
            .text("session_id", session_id.to_string());
        let response = self
            .http
            .post(self.chat_url("/chat/upload/stream"))
            .header("accept", "text/event-stream")
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(decode_events(response.bytes_stream()))
    }
}
