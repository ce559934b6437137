//! Provider-agnostic LLM integration for Subtext.
//!
//! This crate exposes the [`traits::LlmClient`] interface used by the engine
//! and an OpenAI-compatible chat-completions implementation.
//!
//! # Examples
//! ```no_run
//! use subtext_llm::{openai::OpenAiClient, traits::LlmClient};
//!
//! # #[tokio::main]
//! # async fn main() -> subtext_common::Result<()> {
//! let client = OpenAiClient::new("sk-...".into(), "gpt-4.1-mini".into())?;
//! let reply = client
//!     .generate("Say {\"ok\": true}", None, Some(10), Some(0.0))
//!     .await?;
//! assert!(!reply.text.is_empty());
//! # Ok(())
//! # }
//! ```
pub mod openai;
pub mod traits;

pub use traits::{LlmClient, LlmResponse};
