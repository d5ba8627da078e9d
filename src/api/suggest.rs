use super::{ApiClient, ApiResult, ChatRequest, ensure_success, read_json};
use crate::stream::{EventStream, decode_events};
use crate::types::SuggestResponse;
use tracing::debug;

impl ApiClient {
    /// Wardrobe-aware outfit suggestion, retried once on 502/503.
    pub async fn get_suggestion(
        &self,
        message: &str,
        session_id: &str,
        images: Option<&[String]>,
    ) -> ApiResult<SuggestResponse> {
        let url = self.backend_url("/api/suggest");
        let body = ChatRequest::new(message, session_id, images);
        let response = self
            .send_with_retry(|| self.authorized(self.http.post(&url)).json(&body))
            .await?;
        read_json(response).await
    }

    /// Streaming variant of [`ApiClient::get_suggestion`]. Not retried.
    pub async fn suggest_stream(
        &self,
        message: &str,
        session_id: &str,
        images: Option<&[String]>,
    ) -> ApiResult<EventStream> {
        debug!(session_id, "opening suggestion stream");
        let response = self
            .authorized(self.http.post(self.backend_url("/api/suggest/stream")))
            .header("accept", "text/event-stream")
            .json(&ChatRequest::new(message, session_id, images))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(decode_events(response.bytes_stream()))
    }
}
