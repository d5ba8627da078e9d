//! Chat sessions for the two assistant modes.
//!
//! A [`ChatSession`] owns one conversation: its persisted session id, the
//! message list, and the loading flag that keeps a single reply in flight.
//! Every change to the list is persisted and published on a
//! [`tokio::sync::watch`] channel so a front-end can re-render.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stylegpt::{ApiClient, ChatMode, ChatSession, ClientConfig, MemoryStorage};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let api = ApiClient::new(ClientConfig::from_env(), Arc::new(MemoryStorage::new()));
//! let session = ChatSession::open(&api, ChatMode::Fashion, "42");
//! session.send_streaming("How do I style a blazer?", None).await?;
//! println!("{}", session.messages().last().map(|m| m.content.as_str()).unwrap_or(""));
//! # Ok(())
//! # }
//! ```
mod backend;

pub use backend::{ChatBackend, FashionBackend, Reply, WardrobeBackend};

use crate::api::{ApiClient, ApiError};
use crate::format::format_message;
use crate::session::{
    clear_messages, clear_session, get_session_id, load_messages, save_messages, user_key,
};
use crate::storage::Storage;
use crate::stream::{FoldOutcome, fold_events};
use crate::types::ChatMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const CONNECTION_ERROR_MESSAGE: &str =
    "Unable to reach the styling service. Please check your connection and try again.";
const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("a reply is still in progress")]
    Busy,

    #[error("message is empty")]
    EmptyMessage,
}

pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatMode {
    /// Suggestions built from the user's uploaded wardrobe.
    Wardrobe,
    /// General fashion advice from the external chat service.
    Fashion,
}

impl ChatMode {
    /// Base storage key of the session id; stored per user.
    pub fn session_key(self) -> &'static str {
        match self {
            ChatMode::Wardrobe => "chat_session_id",
            ChatMode::Fashion => "fashion_session_id",
        }
    }

    /// Base storage key of the history; stored per user.
    pub fn messages_key(self) -> &'static str {
        match self {
            ChatMode::Wardrobe => "chat_messages",
            ChatMode::Fashion => "fashion_messages",
        }
    }

    fn backend(self, api: &ApiClient) -> Arc<dyn ChatBackend> {
        match self {
            ChatMode::Wardrobe => Arc::new(WardrobeBackend::new(api.clone())),
            ChatMode::Fashion => Arc::new(FashionBackend::new(api.clone())),
        }
    }
}

pub struct ChatSession {
    mode: ChatMode,
    user_id: String,
    messages_key: String,
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn Storage>,
    session_id: Mutex<String>,
    messages: Mutex<Vec<ChatMessage>>,
    loading: AtomicBool,
    updates: watch::Sender<Vec<ChatMessage>>,
    shutdown: CancellationToken,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl ChatSession {
    /// Open the session for `user_id`, restoring its id and history.
    pub fn open(api: &ApiClient, mode: ChatMode, user_id: &str) -> Self {
        Self::with_backend(mode.backend(api), api.store().clone(), mode, user_id)
    }

    pub fn with_backend(
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn Storage>,
        mode: ChatMode,
        user_id: &str,
    ) -> Self {
        let session_id = get_session_id(store.as_ref(), mode.session_key(), user_id);
        let messages_key = user_key(mode.messages_key(), user_id);
        let mut messages = load_messages(store.as_ref(), &messages_key);
        // A reply interrupted by a crash can never finish now.
        for message in messages.iter_mut().filter(|m| m.is_streaming) {
            message.is_streaming = false;
        }
        let (updates, _) = watch::channel(messages.clone());

        Self {
            mode,
            user_id: user_id.to_string(),
            messages_key,
            backend,
            store,
            session_id: Mutex::new(session_id),
            messages: Mutex::new(messages),
            loading: AtomicBool::new(false),
            updates,
            shutdown: CancellationToken::new(),
            in_flight: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn session_id(&self) -> String {
        lock(&self.session_id).clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        lock(&self.messages).clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.updates.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Send `text` and stream the reply into the transcript.
    ///
    /// The AI message grows as chunks arrive and is persisted after every
    /// change. Service failures become chat messages rather than errors; only
    /// an empty message or a send while another reply is in flight is
    /// rejected.
    pub async fn send_streaming(
        &self,
        text: &str,
        images: Option<Vec<String>>,
    ) -> ChatResult<FoldOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let _guard = self.begin()?;
        let cancel = self.track_reply();

        let session_id = self.session_id();
        self.push(ChatMessage::user(text, images.clone()));
        let index = self.push(ChatMessage::ai_pending());

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = self.backend.stream(text, &session_id, images.as_deref()) => Some(opened),
        };
        let outcome = match opened {
            None => {
                self.update(index, |message| {
                    message.content = GENERIC_ERROR_MESSAGE.to_string();
                    message.is_streaming = false;
                });
                FoldOutcome::Cancelled
            }
            Some(Err(err)) => {
                warn!(mode = ?self.mode, error = %err, "could not open reply stream");
                let content = failure_text(&err);
                self.update(index, |message| {
                    message.content = content;
                    message.is_streaming = false;
                });
                FoldOutcome::Interrupted(err)
            }
            Some(Ok(events)) => {
                let mut message = self.message_at(index).unwrap_or_else(ChatMessage::ai_pending);
                fold_events(events, &mut message, &cancel, |current| {
                    self.update(index, |slot| *slot = current.clone());
                })
                .await
            }
        };

        lock(&self.in_flight).take();
        Ok(outcome)
    }

    /// Send `text` and append the whole reply once it arrives.
    ///
    /// A reply cancelled by [`ChatSession::cancel_reply`], [`ChatSession::clear`]
    /// or [`ChatSession::close`] is dropped instead of appended.
    pub async fn send(&self, text: &str, images: Option<Vec<String>>) -> ChatResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let _guard = self.begin()?;
        let cancel = self.track_reply();

        let session_id = self.session_id();
        self.push(ChatMessage::user(text, images.clone()));
        let completed = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            completed = self.backend.complete(text, &session_id, images.as_deref()) => Some(completed),
        };
        lock(&self.in_flight).take();

        let Some(completed) = completed else {
            info!(mode = ?self.mode, "reply abandoned");
            return Ok(());
        };
        let reply = match completed {
            Ok(reply) => {
                let mut message = ChatMessage::ai(format_message(&reply.content));
                message.selected_items = reply.selected_items;
                message
            }
            Err(err) => {
                warn!(mode = ?self.mode, error = %err, "chat request failed");
                ChatMessage::ai(failure_text(&err))
            }
        };
        self.push(reply);
        Ok(())
    }

    /// Stop reading the reply currently streaming; its partial text is kept.
    pub fn cancel_reply(&self) {
        if let Some(cancel) = lock(&self.in_flight).as_ref() {
            cancel.cancel();
        }
    }

    /// Wipe the transcript and start a new session id.
    pub fn clear(&self) {
        self.cancel_reply();
        lock(&self.messages).clear();
        clear_messages(self.store.as_ref(), &self.messages_key);
        clear_session(self.store.as_ref(), self.mode.session_key(), &self.user_id);
        let fresh = get_session_id(self.store.as_ref(), self.mode.session_key(), &self.user_id);
        info!(mode = ?self.mode, session_id = %fresh, "conversation cleared");
        *lock(&self.session_id) = fresh;
        self.updates.send_replace(Vec::new());
    }

    /// Tear the session down, abandoning any reply still streaming.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Token that stops the reply about to be requested.
    fn track_reply(&self) -> CancellationToken {
        let cancel = self.shutdown.child_token();
        *lock(&self.in_flight) = Some(cancel.clone());
        cancel
    }

    fn begin(&self) -> ChatResult<LoadingGuard<'_>> {
        if self.loading.swap(true, Ordering::SeqCst) {
            return Err(ChatError::Busy);
        }
        Ok(LoadingGuard(&self.loading))
    }

    fn message_at(&self, index: usize) -> Option<ChatMessage> {
        lock(&self.messages).get(index).cloned()
    }

    fn push(&self, message: ChatMessage) -> usize {
        let mut messages = lock(&self.messages);
        messages.push(message);
        self.persist(&messages);
        messages.len() - 1
    }

    fn update(&self, index: usize, change: impl FnOnce(&mut ChatMessage)) {
        let mut messages = lock(&self.messages);
        // The list may have been cleared while the reply was streaming.
        let Some(slot) = messages.get_mut(index) else {
            return;
        };
        change(slot);
        self.persist(&messages);
    }

    fn persist(&self, messages: &[ChatMessage]) {
        save_messages(self.store.as_ref(), &self.messages_key, messages);
        self.updates.send_replace(messages.to_vec());
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn failure_text(err: &ApiError) -> String {
    match err {
        _ if err.is_connection() => CONNECTION_ERROR_MESSAGE.to_string(),
        ApiError::Rejected(reason) if !reason.is_empty() => reason.clone(),
        ApiError::Http { .. } => err.to_string(),
        _ => GENERIC_ERROR_MESSAGE.to_string(),
    }
}
