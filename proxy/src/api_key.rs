use std::fmt;
use std::sync::Arc;

/// Environment variable holding the Google Sheets API key.
pub const API_KEY_ENV_VAR: &str = "GOOGLE_SHEETS_API_KEY";

/// Secret API key. Never printed, only exposed when building the upstream URL.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(Arc<str>);

impl ApiKey {
    /// Returns `None` for an empty or whitespace-only key.
    pub fn new(key: &str) -> Option<Self> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(ApiKey(Arc::from(key)))
    }

    /// Reads the key from [`API_KEY_ENV_VAR`]. Unset and empty are the same.
    pub fn from_env() -> Option<Self> {
        std::env::var(API_KEY_ENV_VAR)
            .ok()
            .and_then(|key| Self::new(&key))
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}
