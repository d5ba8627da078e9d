use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Ai,
}

/// One entry of a chat transcript, persisted in the same camelCase shape the
/// browser client stores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_items: Option<Vec<WardrobeItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_preview_url: Option<String>,
    #[serde(default)]
    pub is_streaming: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, images: Option<Vec<String>>) -> Self {
        Self {
            kind: MessageKind::User,
            content: content.into(),
            images: images.filter(|list| !list.is_empty()),
            selected_items: None,
            avatar_preview_url: None,
            is_streaming: false,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Ai,
            content: content.into(),
            images: None,
            selected_items: None,
            avatar_preview_url: None,
            is_streaming: false,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Empty AI message that a stream is about to fill.
    pub fn ai_pending() -> Self {
        Self {
            is_streaming: true,
            ..Self::ai(String::new())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WardrobeItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_player_me_asset_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_player_me_avatar_id: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

// ---------------
// Backend response envelopes
// ---------------

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    pub token: Option<String>,
    pub user: Option<User>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileResponse {
    #[serde(default)]
    pub success: bool,
    pub user: Option<User>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub count: usize,
    pub failed: Option<usize>,
    #[serde(default)]
    pub items: Vec<WardrobeItem>,
    pub error: Option<String>,
}

impl UploadResponse {
    /// Status line shown after an upload, mirroring the partial-failure wording.
    pub fn summary(&self) -> String {
        if !self.success {
            return self
                .error
                .clone()
                .unwrap_or_else(|| "Upload failed. Please try again.".to_string());
        }
        match self.failed {
            Some(failed) if failed > 0 => format!(
                "Successfully uploaded {} item(s)! {} item(s) failed.",
                self.count, failed
            ),
            _ => format!("Successfully uploaded {} item(s)!", self.count),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WardrobeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub items: Vec<WardrobeItem>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Suggestion {
    pub message: Option<String>,
    pub response: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestResponse {
    #[serde(default)]
    pub success: bool,
    pub suggestion: Option<Suggestion>,
    pub selected_items: Option<Vec<WardrobeItem>>,
    pub error: Option<String>,
}

/// Reply of the external fashion chat service; either key may carry the text.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FashionReply {
    pub message: Option<String>,
    pub response: Option<String>,
}

impl FashionReply {
    pub fn text(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.response.as_deref())
            .filter(|text| !text.is_empty())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AvatarResponse {
    #[serde(default)]
    pub success: bool,
    pub user: Option<User>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    #[serde(default)]
    pub success: bool,
    pub render_url: Option<String>,
    pub error: Option<String>,
}
