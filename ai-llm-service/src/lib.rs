//! Shared LLM access for the catalog assistant.
//!
//! - [`config`]: model configs and provider kinds, plus env-driven defaults.
//! - [`services`]: thin HTTP clients for OpenAI and Ollama.
//! - [`service_profiles`]: the `chat` + `embedding` profile pair used by the app.
//! - [`error_handler`]: the unified [`AiLlmError`] type.

pub mod config;
pub mod error_handler;
pub mod service_profiles;
pub mod services;

pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::{AiLlmError, Result};
pub use service_profiles::LlmServiceProfiles;
