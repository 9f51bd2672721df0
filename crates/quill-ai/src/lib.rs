//! Quill AI - Writing assistant for the quill editor
//!
//! - [`AiAction`]: the action tags understood by the AI text function
//! - [`PromptTable`]: system and user prompt per action, overridable from TOML
//! - [`AiFunction`]: anything that turns an [`AiRequest`] into text, either the
//!   remote function ([`HttpAiFunction`]) or a chat completions endpoint
//!   ([`ChatCompletionsGateway`])
//! - [`Transcriber`]: speech to text for dictation
//! - [`WritingAssistant`]: applies AI results to an open [`quill_core::EditorSession`]
//! - [`ChatSession`]: conversation with the writing coach
//!
//! # Example
//!
//! ```ignore
//! let ai = Arc::new(HttpAiFunction::from_config(&config.ai)?);
//! let assistant = WritingAssistant::new(session, ai, config.ai.context_chars);
//! assistant.autocomplete().await?;
//! ```

pub mod action;
pub mod assist;
pub mod chat;
pub mod client;
pub mod error;
pub mod gateway;
pub mod prompts;
pub mod transcribe;

pub use action::{AiAction, EditorAnalysis, RewriteStyle};
pub use assist::{CharacterProfile, WritingAssistant};
pub use chat::{ChatMessage, ChatRole, ChatSession, GREETING};
pub use client::{AiFunction, AiRequest, AiResponse, HttpAiFunction};
pub use error::{AiError, PAYMENT_REQUIRED_MESSAGE, RATE_LIMIT_MESSAGE};
pub use gateway::ChatCompletionsGateway;
pub use prompts::{PromptInput, PromptTable, PromptTemplate, RenderedPrompt};
pub use transcribe::{HttpTranscriber, Transcriber};
