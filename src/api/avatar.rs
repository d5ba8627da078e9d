use super::{ApiClient, ApiResult, read_envelope};
use crate::types::{AvatarResponse, RenderResponse};
use serde::Serialize;

/// Render parameters passed through to the avatar provider.
#[derive(Clone, Debug, Serialize)]
pub struct RenderOptions {
    pub size: u32,
    pub quality: u32,
    pub camera: String,
}

impl Default for RenderOptions {
    /// Portrait used for profile pictures.
    fn default() -> Self {
        Self {
            size: 400,
            quality: 90,
            camera: "portrait".to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAvatarRequest<'a> {
    avatar_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TryOnRequest<'a> {
    asset_ids: &'a [String],
}

impl ApiClient {
    /// Link an avatar exported by the provider's creator to the current user.
    pub async fn create_avatar(&self, avatar_id: &str) -> ApiResult<AvatarResponse> {
        let response = self
            .authorized(self.http.post(self.backend_url("/api/avatar")))
            .json(&CreateAvatarRequest { avatar_id })
            .send()
            .await?;
        read_envelope(response).await
    }

    pub async fn avatar_render(&self, options: &RenderOptions) -> ApiResult<RenderResponse> {
        let response = self
            .authorized(self.http.get(self.backend_url("/api/avatar/render")))
            .query(options)
            .send()
            .await?;
        read_envelope(response).await
    }

    /// Render the user's avatar wearing the given wardrobe assets.
    pub async fn try_on(&self, asset_ids: &[String]) -> ApiResult<RenderResponse> {
        let response = self
            .authorized(self.http.post(self.backend_url("/api/avatar/try-on")))
            .json(&TryOnRequest { asset_ids })
            .send()
            .await?;
        read_envelope(response).await
    }
}
