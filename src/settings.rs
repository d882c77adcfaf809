//! Credential resolution and shared HTTP client construction.
//!
//! The only ambient input this crate reads is the model API key; every
//! other value (base URLs, timeout) is passed explicitly by the serving
//! layer or falls back to the defaults below.

use std::time::Duration;

use reqwest::Client;

/// Environment variable consulted when no explicit key is supplied.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Default timeout applied to every remote call. There is no retry
/// anywhere in the system, so a call either completes or fails within
/// this window.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

const USER_AGENT: &str = "Chavruta-Core/0.1 (+https://github.com/chavruta)";

/// Resolve the model API key: an explicit value wins, then the
/// `GEMINI_API_KEY` credential source. `None` means the model-dependent
/// modes stay disabled; the lookup clients do not need a key.
pub fn resolve_api_key(explicit: Option<String>) -> Option<String> {
    explicit
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .or_else(|| {
            std::env::var(API_KEY_VAR)
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
        })
}

/// Build the HTTP client shared by all remote components.
pub fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).user_agent(USER_AGENT).build()
}
