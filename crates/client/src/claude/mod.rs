//! Claude API integration.
//!
//! [`ClaudeClient`] talks to the Anthropic Messages API. Everything above it
//! depends only on [`CompletionProvider`], so tests and offline runs can
//! substitute a scripted model.

mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use client::ClaudeClient;
pub use error::ClaudeError;
pub use types::{ChatResponse, ContentBlock, Message, StopReason};

/// A language model that turns a system prompt and a user turn into text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete one exchange and return the first text block of the reply.
    ///
    /// # Errors
    ///
    /// Returns `ClaudeError` if the request fails or the reply has no text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, ClaudeError>;
}
