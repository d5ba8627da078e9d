use super::upload::UploadFile;
use super::{ApiClient, ApiResult, read_envelope};
use crate::types::ProfileResponse;
use reqwest::multipart::Form;

/// Fields of a profile edit; unset fields are left out of the form.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub picture: Option<UploadFile>,
    pub remove_picture: bool,
}

impl ProfileUpdate {
    fn into_form(self) -> ApiResult<Form> {
        let mut form = Form::new();
        if let Some(name) = self.name.filter(|name| !name.is_empty()) {
            form = form.text("name", name);
        }
        if let Some(picture) = self.picture {
            form = form.part("profilePicture", picture.into_part()?);
        }
        if self.remove_picture {
            form = form.text("removePicture", "true");
        }
        Ok(form)
    }
}

impl ApiClient {
    pub async fn get_profile(&self) -> ApiResult<ProfileResponse> {
        let response = self
            .authorized(self.http.get(self.backend_url("/api/profile")))
            .send()
            .await?;
        read_envelope(response).await
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> ApiResult<ProfileResponse> {
        let form = update.into_form()?;
        let response = self
            .authorized(self.http.put(self.backend_url("/api/profile")))
            .multipart(form)
            .send()
            .await?;
        read_envelope(response).await
    }
}
