//! Default LLM configs loaded from environment variables.
//!
//! This module provides convenience constructors for [`LlmModelConfig`],
//! grouped by provider and role. Two roles are used by the catalog assistant:
//!
//! - **Classifier** → short, low-token chat completion (stock-status labels)
//! - **Embedding**  → embedding generator for the vector retriever
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`          = provider kind (`openai` default, or `ollama`)
//! - `LLM_TIMEOUT_SECS`  = optional request timeout (u64, default 60)
//!
//! OpenAI-specific:
//! - `OPENAI_API_KEY`    = API key (mandatory for `openai`)
//! - `OPENAI_BASE_URL`   = API base (default `https://api.openai.com`)
//! - `CLASSIFIER_MODEL`  = chat model (default `gpt-4o-mini`)
//! - `EMBEDDING_MODEL`   = embedding model (default `text-embedding-ada-002`)
//!
//! Ollama-specific:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory for `ollama`)
//! - `OLLAMA_MODEL`                = chat model (mandatory for `ollama`)
//! - `EMBEDDING_MODEL`             = embedding model (mandatory for `ollama`)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_u64, must_env, validate_http_endpoint,
    },
};

/// Default OpenAI API base.
pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com";
/// Default chat model used for stock-status classification.
pub const DEFAULT_CLASSIFIER_MODEL: &str = "gpt-4o-mini";
/// Default OpenAI embedding model.
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Sampling temperature for classification calls.
pub const CLASSIFIER_TEMPERATURE: f32 = 0.5;
/// Completion budget for classification calls (one short label).
pub const CLASSIFIER_MAX_TOKENS: u32 = 20;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Reads `LLM_KIND`, defaulting to OpenAI.
///
/// # Errors
/// [`ConfigError::UnsupportedProvider`] for unknown values.
pub fn provider_from_env() -> Result<LlmProvider, AiLlmError> {
    match std::env::var("LLM_KIND") {
        Ok(v) if !v.trim().is_empty() => Ok(v.parse::<LlmProvider>()?),
        _ => Ok(LlmProvider::OpenAI),
    }
}

/// Builds the classifier profile for the provider selected by `LLM_KIND`.
pub fn config_classifier_from_env() -> Result<LlmModelConfig, AiLlmError> {
    match provider_from_env()? {
        LlmProvider::OpenAI => config_openai_classifier(),
        LlmProvider::Ollama => config_ollama_classifier(),
    }
}

/// Builds the embedding profile for the provider selected by `LLM_KIND`.
pub fn config_embedding_from_env() -> Result<LlmModelConfig, AiLlmError> {
    match provider_from_env()? {
        LlmProvider::OpenAI => config_openai_embedding(),
        LlmProvider::Ollama => config_ollama_embedding(),
    }
}

/// Resolves the OpenAI API base from `OPENAI_BASE_URL` or the public default.
fn openai_endpoint() -> Result<String, AiLlmError> {
    let url = std::env::var("OPENAI_BASE_URL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| OPENAI_DEFAULT_BASE_URL.to_string());
    validate_http_endpoint("OPENAI_BASE_URL", &url)?;
    Ok(url)
}

fn timeout_from_env() -> Result<Option<u64>, AiLlmError> {
    Ok(Some(
        env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
    ))
}

/// Constructs the OpenAI **classifier** config.
///
/// # Env
/// - `OPENAI_API_KEY` (required)
/// - `CLASSIFIER_MODEL` (optional, default `gpt-4o-mini`)
///
/// # Defaults
/// - `temperature = Some(0.5)`
/// - `max_tokens = Some(20)`
pub fn config_openai_classifier() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = openai_endpoint()?;
    let api_key = must_env("OPENAI_API_KEY")?;
    let model = std::env::var("CLASSIFIER_MODEL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CLASSIFIER_MODEL.to_string());

    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model,
        endpoint,
        api_key: Some(api_key),
        max_tokens: Some(CLASSIFIER_MAX_TOKENS),
        temperature: Some(CLASSIFIER_TEMPERATURE),
        top_p: None,
        timeout_secs: timeout_from_env()?,
    })
}

/// Constructs the OpenAI **embedding** config.
///
/// # Env
/// - `OPENAI_API_KEY` (required)
/// - `EMBEDDING_MODEL` (optional, default `text-embedding-ada-002`)
pub fn config_openai_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = openai_endpoint()?;
    let api_key = must_env("OPENAI_API_KEY")?;
    let model = std::env::var("EMBEDDING_MODEL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_OPENAI_EMBEDDING_MODEL.to_string());

    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model,
        endpoint,
        api_key: Some(api_key),
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: timeout_from_env()?,
    })
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
///
/// # Errors
///
/// - [`ConfigError::MissingVar`] if both are missing
/// - [`ConfigError::InvalidNumber`] if `OLLAMA_PORT` is invalid
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Ok(url) = std::env::var("OLLAMA_URL") {
        if !url.trim().is_empty() {
            validate_http_endpoint("OLLAMA_URL", &url)?;
            return Ok(url);
        }
    }
    if let Ok(port) = std::env::var("OLLAMA_PORT") {
        if !port.trim().is_empty() {
            let _ = port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "OLLAMA_PORT",
                    reason: "expected u16 (1..=65535)",
                })?;
            return Ok(format!("http://localhost:{port}"));
        }
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

/// Constructs the Ollama **classifier** config.
///
/// # Env
/// - `OLLAMA_MODEL` (required)
pub fn config_ollama_classifier() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = ollama_endpoint()?;
    let model = must_env("OLLAMA_MODEL")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens: Some(CLASSIFIER_MAX_TOKENS),
        temperature: Some(CLASSIFIER_TEMPERATURE),
        top_p: None,
        timeout_secs: timeout_from_env()?,
    })
}

/// Constructs the Ollama **embedding** config.
///
/// # Env
/// - `EMBEDDING_MODEL` (required)
pub fn config_ollama_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = ollama_endpoint()?;
    let model = must_env("EMBEDDING_MODEL")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: timeout_from_env()?,
    })
}
