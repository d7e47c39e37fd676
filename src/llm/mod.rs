//! LLM integration for entity and graph annotation.

mod client;
pub mod retry;

pub use client::{LlmClient, LlmConfig, LlmError, LlmProvider, DEFAULT_STIX_PROMPT};
