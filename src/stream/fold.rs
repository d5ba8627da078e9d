use super::StreamEvent;
use crate::api::{ApiError, ApiResult};
use crate::format::clean_trailing_fragment;
use crate::types::ChatMessage;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Shown in place of a reply when the service reports an error or sends nothing.
pub const STREAM_FAILURE_MESSAGE: &str =
    "Sorry, I couldn't process your request. Please try again.";

/// Folds stream events into the in-progress AI message.
///
/// Chunks grow the message text as they arrive, `done` attaches the matched
/// items and avatar preview without touching the text, and `error` replaces
/// whatever was shown with [`STREAM_FAILURE_MESSAGE`]. After an error every
/// later event is ignored.
#[derive(Debug, Default)]
pub struct MessageFolder {
    accumulated: String,
    failed: bool,
}

impl MessageFolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text received so far, before any cleanup.
    pub fn text(&self) -> &str {
        &self.accumulated
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Apply one event; returns whether `message` changed.
    pub fn apply(&mut self, event: StreamEvent, message: &mut ChatMessage) -> bool {
        if self.failed {
            return false;
        }
        match event {
            StreamEvent::Chunk { content } => {
                if content.is_empty() {
                    return false;
                }
                self.accumulated.push_str(&content);
                message.content.clone_from(&self.accumulated);
                true
            }
            StreamEvent::Done {
                selected_items,
                avatar_preview_url,
            } => {
                if selected_items.is_none() && avatar_preview_url.is_none() {
                    return false;
                }
                if let Some(items) = selected_items {
                    message.selected_items = Some(items);
                }
                if let Some(url) = avatar_preview_url {
                    message.avatar_preview_url = Some(url);
                }
                true
            }
            StreamEvent::Error { message: reason } => {
                warn!(reason = %reason, "chat stream reported an error");
                self.failed = true;
                message.content = STREAM_FAILURE_MESSAGE.to_string();
                message.is_streaming = false;
                true
            }
        }
    }

    /// Settle the message once no more events will come.
    pub fn finish(self, message: &mut ChatMessage) {
        message.is_streaming = false;
        if self.failed {
            return;
        }
        let cleaned = clean_trailing_fragment(&self.accumulated);
        message.content = if cleaned.trim().is_empty() {
            STREAM_FAILURE_MESSAGE.to_string()
        } else {
            cleaned
        };
    }
}

#[derive(Debug)]
pub enum FoldOutcome {
    /// The body ended normally.
    Completed,
    /// The service sent an `error` event.
    Failed,
    /// The transport broke mid-body; the partial text was kept.
    Interrupted(ApiError),
    /// The caller cancelled; the partial text was kept.
    Cancelled,
}

/// Drive `events` into `message`, calling `on_change` after every visible
/// update and once more after the message is settled.
pub async fn fold_events<S, F>(
    mut events: S,
    message: &mut ChatMessage,
    cancel: &CancellationToken,
    mut on_change: F,
) -> FoldOutcome
where
    S: Stream<Item = ApiResult<StreamEvent>> + Unpin,
    F: FnMut(&ChatMessage),
{
    let mut folder = MessageFolder::new();
    let outcome = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break FoldOutcome::Cancelled,
            next = events.next() => next,
        };
        match next {
            None => break FoldOutcome::Completed,
            Some(Ok(event)) => {
                if folder.apply(event, message) {
                    on_change(message);
                }
                if folder.is_failed() {
                    break FoldOutcome::Failed;
                }
            }
            Some(Err(err)) => {
                warn!(error = %err, "chat stream interrupted");
                break FoldOutcome::Interrupted(err);
            }
        }
    };
    debug!(?outcome, chars = folder.text().len(), "chat stream settled");
    folder.finish(message);
    on_change(message);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WardrobeItem;
    use futures::stream;

    fn chunk(text: &str) -> ApiResult<StreamEvent> {
        Ok(StreamEvent::Chunk {
            content: text.to_string(),
        })
    }

    #[test]
    fn folder_concatenates_chunks_in_order() {
        let mut message = ChatMessage::ai_pending();
        let mut folder = MessageFolder::new();
        for piece in ["Try ", "the ", "camel ", "coat."] {
            folder.apply(
                StreamEvent::Chunk {
                    content: piece.into(),
                },
                &mut message,
            );
            assert_eq!(message.content, folder.text());
        }
        assert_eq!(folder.text(), "Try the camel coat.");
        assert!(message.is_streaming);
    }

    #[test]
    fn done_attaches_extras_without_touching_text() {
        let mut message = ChatMessage::ai_pending();
        let mut folder = MessageFolder::new();
        folder.apply(
            StreamEvent::Chunk {
                content: "Wear this.".into(),
            },
            &mut message,
        );
        let item = WardrobeItem {
            id: "1".into(),
            category: "blazer".into(),
            style: "formal".into(),
            image_url: "/b.png".into(),
            processed_image_url: None,
            ready_player_me_asset_id: Some("asset-9".into()),
        };
        folder.apply(
            StreamEvent::Done {
                selected_items: Some(vec![item.clone()]),
                avatar_preview_url: Some("https://r/p.png".into()),
            },
            &mut message,
        );
        assert_eq!(message.content, "Wear this.");
        assert_eq!(message.selected_items, Some(vec![item]));
        assert_eq!(message.avatar_preview_url.as_deref(), Some("https://r/p.png"));
    }

    #[test]
    fn error_replaces_content_and_ignores_later_events() {
        let mut message = ChatMessage::ai_pending();
        let mut folder = MessageFolder::new();
        folder.apply(
            StreamEvent::Chunk {
                content: "Partial".into(),
            },
            &mut message,
        );
        folder.apply(
            StreamEvent::Error {
                message: "model crashed".into(),
            },
            &mut message,
        );
        assert_eq!(message.content, STREAM_FAILURE_MESSAGE);
        assert!(!message.is_streaming);

        let changed = folder.apply(
            StreamEvent::Chunk {
                content: " more".into(),
            },
            &mut message,
        );
        assert!(!changed);
        folder.finish(&mut message);
        assert_eq!(message.content, STREAM_FAILURE_MESSAGE);
    }

    #[test]
    fn finish_cleans_trailing_garbage() {
        let mut message = ChatMessage::ai_pending();
        let mut folder = MessageFolder::new();
        for piece in ["Hello world. ", "Thisisgarbledfragment"] {
            folder.apply(
                StreamEvent::Chunk {
                    content: piece.into(),
                },
                &mut message,
            );
        }
        folder.finish(&mut message);
        assert_eq!(message.content, "Hello world.");
        assert!(!message.is_streaming);
    }

    #[tokio::test]
    async fn fold_events_reports_each_update() {
        let events = stream::iter(vec![chunk("Yes"), chunk("."), Ok(StreamEvent::Done {
            selected_items: None,
            avatar_preview_url: None,
        })]);
        let mut message = ChatMessage::ai_pending();
        let mut seen = Vec::new();
        let outcome = fold_events(events, &mut message, &CancellationToken::new(), |msg| {
            seen.push(msg.content.clone())
        })
        .await;
        assert!(matches!(outcome, FoldOutcome::Completed));
        assert_eq!(seen, vec!["Yes", "Yes.", "Yes."]);
        assert_eq!(message.content, "Yes.");
    }

    #[tokio::test]
    async fn fold_events_stops_at_error_frame() {
        let events = stream::iter(vec![
            chunk("Half"),
            Ok(StreamEvent::Error {
                message: "boom".into(),
            }),
            chunk(" never shown"),
        ]);
        let mut message = ChatMessage::ai_pending();
        let outcome =
            fold_events(events, &mut message, &CancellationToken::new(), |_| {}).await;
        assert!(matches!(outcome, FoldOutcome::Failed));
        assert_eq!(message.content, STREAM_FAILURE_MESSAGE);
        assert!(!message.is_streaming);
    }

    #[tokio::test]
    async fn fold_events_keeps_partial_text_on_transport_error() {
        let events = stream::iter(vec![
            chunk("Pair it with loafers."),
            Err(ApiError::Rejected("reset".into())),
        ]);
        let mut message = ChatMessage::ai_pending();
        let outcome =
            fold_events(events, &mut message, &CancellationToken::new(), |_| {}).await;
        assert!(matches!(outcome, FoldOutcome::Interrupted(_)));
        assert_eq!(message.content, "Pair it with loafers.");
    }

    #[tokio::test]
    async fn fold_events_honours_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let events = stream::pending::<ApiResult<StreamEvent>>();
        let mut message = ChatMessage::ai_pending();
        let outcome = fold_events(events, &mut message, &cancel, |_| {}).await;
        assert!(matches!(outcome, FoldOutcome::Cancelled));
        assert!(!message.is_streaming);
    }
}
