use super::{ApiClient, ApiError, ApiResult, read_envelope};
use crate::types::UploadResponse;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tracing::info;

/// Largest number of images accepted in one upload.
pub const MAX_UPLOAD_FILES: usize = 20;
const DEFAULT_STYLE: &str = "casual";

/// An in-memory file ready to be sent as a multipart part.
#[derive(Clone, Debug)]
pub struct UploadFile {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its image type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image")
            .to_string();
        Ok(Self::new(file_name, guess_mime(path), bytes))
    }

    pub(crate) fn into_part(self) -> ApiResult<Part> {
        Ok(Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime)?)
    }
}

fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

impl ApiClient {
    /// Upload garment photos for classification. `style` defaults to casual.
    pub async fn upload_images(
        &self,
        files: Vec<UploadFile>,
        style: Option<&str>,
    ) -> ApiResult<UploadResponse> {
        if files.is_empty() {
            return Err(ApiError::Validation(
                "Please select at least one image".to_string(),
            ));
        }
        if files.len() > MAX_UPLOAD_FILES {
            return Err(ApiError::Validation(format!(
                "Maximum {MAX_UPLOAD_FILES} images allowed per upload"
            )));
        }

        let count = files.len();
        let mut form = Form::new();
        for file in files {
            form = form.part("image", file.into_part()?);
        }
        form = form.text("style", style.unwrap_or(DEFAULT_STYLE).to_string());

        info!(count, "uploading wardrobe images");
        let response = self
            .authorized(self.http.post(self.backend_url("/api/upload")))
            .multipart(form)
            .send()
            .await?;
        read_envelope(response).await
    }
}
