use super::{ApiClient, ApiResult, read_envelope};
use crate::types::{DeleteResponse, WardrobeResponse};
use serde::Serialize;

/// Search filters for the wardrobe listing. Blank filters are not sent.
#[derive(Clone, Debug, Default, Serialize)]
pub struct WardrobeQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl WardrobeQuery {
    pub fn new(q: Option<&str>, style: Option<&str>) -> Self {
        let keep = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            q: keep(q),
            style: keep(style),
        }
    }
}

impl ApiClient {
    pub async fn list_wardrobe(&self, query: &WardrobeQuery) -> ApiResult<WardrobeResponse> {
        let response = self
            .authorized(self.http.get(self.backend_url("/api/wardrobe")))
            .query(query)
            .send()
            .await?;
        read_envelope(response).await
    }

    pub async fn delete_wardrobe_item(&self, item_id: &str) -> ApiResult<DeleteResponse> {
        let url = self.backend_url_with("/api/wardrobe", item_id)?;
        let response = self.authorized(self.http.delete(url)).send().await?;
        read_envelope(response).await
    }
}
