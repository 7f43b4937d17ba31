//! LLM transport for firmaudit.
//!
//! Every supported platform (Google Gemini, OpenAI, Cohere, Mistral, Groq)
//! exposes an OpenAI-compatible chat completions endpoint, so a single
//! HTTP provider covers all of them.
//!
//! - [`Provider`] is the chat completion seam
//! - [`OpenAiCompatProvider`] implements it over `reqwest`
//! - [`config`] maps platform names to endpoints and key variables
//! - [`RetryPolicy`] retries transient failures with exponential backoff
//!
//! ```rust,ignore
//! use firmaudit_llm::{ChatMessage, ChatRequest, LlmProviderConfig, OpenAiCompatProvider, Provider};
//!
//! let config = LlmProviderConfig::for_platform("groq", "groq")?;
//! let provider = OpenAiCompatProvider::try_new(config, api_key)?;
//! let request = ChatRequest::new("llama-3.3-70b-versatile", vec![ChatMessage::user("Hi")]);
//! let text = provider.complete(&request).await?.text();
//! ```

pub mod config;
pub mod error;
pub mod openai_compat;
pub mod provider;
pub mod retry;
pub mod types;

pub use config::{LlmProviderConfig, PlatformEndpoint, builtin_platforms, platform_endpoint};
pub use error::{ProviderError, Result};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::Provider;
pub use retry::{Attempted, RetryConfig, RetryPolicy, is_retryable};
pub use types::{ChatMessage, ChatRequest, ChatResponse, Choice, Usage};
