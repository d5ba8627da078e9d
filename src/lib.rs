//! Client core of the StyleGPT wardrobe assistant.
//!
//! Talks to the wardrobe backend and the fashion chat service, streams chat
//! replies into an evolving transcript, and keeps tokens, session ids and
//! history in a pluggable [`Storage`].

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod format;
pub mod session;
pub mod storage;
pub mod stream;
pub mod types;

pub use api::{ApiClient, ApiError, ApiResult};
pub use auth::{AuthContext, AuthOutcome};
pub use chat::{ChatError, ChatMode, ChatSession};
pub use config::ClientConfig;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use types::{ChatMessage, MessageKind, User, WardrobeItem};
