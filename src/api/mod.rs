pub mod gemini;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::session::Turn;

pub use gemini::GeminiClient;

/// Errors from the generative-language call.
///
/// Note what is *not* here: a 2xx reply without usable text is translated
/// into an advisory success string by the client, not an error, so the
/// conversation can continue.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("generative API call timed out after {0:?}")]
    Timeout(Duration),

    #[error("generative API error {status}: {detail}")]
    Upstream { status: u16, detail: String },

    #[error("failed to reach the generative API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generative API returned an unparseable body: {0}")]
    Malformed(String),

    #[error("no API key configured (set GOOGLE_API_KEY)")]
    MissingKey,
}

/// The conversational model a request handler talks to.
///
/// Injected into the HTTP state so handlers never reach into ambient
/// globals, and so tests can substitute a scripted implementation.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends `history` plus a final user turn containing `new_message`;
    /// returns the model's reply text.
    async fn converse(&self, history: &[Turn], new_message: &str) -> Result<String, ApiError>;
}
