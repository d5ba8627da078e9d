use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage::FileStorage;

pub const DEFAULT_FASHION_CHAT_URL: &str = "https://nexusbert-stylegpt-milestone1.hf.space";
const DEFAULT_RETRY_DELAY_MS: u64 = 2000;

/// Endpoints and client behaviour, normally read from the environment.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the wardrobe REST backend; empty means same origin.
    pub api_url: String,
    /// Base URL of the external fashion chat service.
    pub fashion_chat_url: String,
    /// Fixed pause before the single retry of a non-streaming chat request.
    pub retry_delay: Duration,
    pub storage_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            fashion_chat_url: DEFAULT_FASHION_CHAT_URL.to_string(),
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            storage_dir: FileStorage::default_dir(),
        }
    }
}

impl ClientConfig {
    /// Build config from `STYLEGPT_*` environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_url = env::var("STYLEGPT_API_URL").unwrap_or(defaults.api_url);
        let fashion_chat_url =
            env::var("STYLEGPT_FASHION_CHAT_URL").unwrap_or(defaults.fashion_chat_url);
        let retry_delay = env::var("STYLEGPT_RETRY_DELAY_MS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_delay);
        let storage_dir = env::var("STYLEGPT_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_dir);

        Self {
            api_url: trim_base(api_url),
            fashion_chat_url: trim_base(fashion_chat_url),
            retry_delay,
            storage_dir,
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = trim_base(url.into());
        self
    }

    pub fn with_fashion_chat_url(mut self, url: impl Into<String>) -> Self {
        self.fashion_chat_url = trim_base(url.into());
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

fn trim_base(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
