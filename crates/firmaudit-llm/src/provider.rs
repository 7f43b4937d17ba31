//! The [`Provider`] trait for chat completions.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatRequest, ChatResponse};

/// A platform that can execute chat completion requests.
///
/// The production implementation is
/// [`OpenAiCompatProvider`](crate::openai_compat::OpenAiCompatProvider);
/// tests substitute scripted implementations.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name as configured (e.g. "gemini", "groq").
    fn name(&self) -> &str;

    /// Execute a chat completion request.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;
}
