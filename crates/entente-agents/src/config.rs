//! Configuration for the LLM decision-makers.
//!
//! All configuration is loaded from environment variables: which backend to
//! call, where it lives, which model to ask, and how to sample. Prompt
//! templates ship with the crate and can be overridden from a directory.

use crate::error::AgentError;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default completion budget in tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Complete LLM configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// The backend every LLM-controlled power talks to.
    pub backend: LlmBackendConfig,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Directory with template overrides. `None` uses the built-in set.
    pub templates_dir: Option<String>,
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

impl BackendType {
    /// Parse a backend name as written in `LLM_BACKEND`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] for an unknown name.
    pub fn parse(name: &str) -> Result<Self, AgentError> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(AgentError::Config(format!("unknown backend type: {other}"))),
        }
    }
}

impl LlmConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `LLM_BACKEND` -- backend type (`openai` or `anthropic`)
    /// - `LLM_API_URL` -- API base URL
    /// - `LLM_API_KEY` -- API key
    /// - `LLM_MODEL` -- model name
    ///
    /// Optional variables:
    /// - `LLM_TEMPERATURE` -- sampling temperature (default 0.7)
    /// - `LLM_MAX_TOKENS` -- completion budget (default 1024)
    /// - `LLM_TEMPLATES_DIR` -- directory with template overrides
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if a required variable is missing or
    /// a value does not parse.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`LlmConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AgentError::Config(format!("missing required env var {name}")))
        };

        let backend = LlmBackendConfig {
            backend_type: BackendType::parse(&required("LLM_BACKEND")?)?,
            api_url: required("LLM_API_URL")?.trim_end_matches('/').to_owned(),
            api_key: required("LLM_API_KEY")?,
            model: required("LLM_MODEL")?,
        };

        let temperature: f32 = match lookup("LLM_TEMPERATURE") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| AgentError::Config(format!("invalid LLM_TEMPERATURE: {e}")))?,
            None => DEFAULT_TEMPERATURE,
        };

        let max_tokens: u32 = match lookup("LLM_MAX_TOKENS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| AgentError::Config(format!("invalid LLM_MAX_TOKENS: {e}")))?,
            None => DEFAULT_MAX_TOKENS,
        };

        Ok(Self {
            backend,
            temperature,
            max_tokens,
            templates_dir: lookup("LLM_TEMPLATES_DIR").filter(|d| !d.trim().is_empty()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("LLM_BACKEND", "anthropic"),
        ("LLM_API_URL", "https://api.anthropic.com/v1/"),
        ("LLM_API_KEY", "test-key"),
        ("LLM_MODEL", "test-model"),
    ];

    #[test]
    fn required_variables_with_defaults() {
        let config = LlmConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.backend.backend_type, BackendType::Anthropic);
        assert_eq!(config.backend.api_url, "https://api.anthropic.com/v1");
        assert!((config.temperature - DEFAULT_TEMPERATURE).abs() < f32::EPSILON);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(config.templates_dir.is_none());
    }

    #[test]
    fn optional_variables_override_defaults() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("LLM_TEMPERATURE", "0.2"));
        pairs.push(("LLM_MAX_TOKENS", "256"));
        pairs.push(("LLM_TEMPLATES_DIR", "prompts"));
        let config = LlmConfig::from_lookup(lookup(&pairs)).unwrap();
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.templates_dir.as_deref(), Some("prompts"));
    }

    #[test]
    fn missing_or_invalid_values_are_config_errors() {
        let missing = LlmConfig::from_lookup(lookup(REQUIRED.get(..3).unwrap())).unwrap_err();
        assert!(missing.to_string().contains("LLM_MODEL"));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("LLM_MAX_TOKENS", "lots"));
        assert!(matches!(
            LlmConfig::from_lookup(lookup(&pairs)),
            Err(AgentError::Config(_))
        ));
    }

    #[test]
    fn backend_names() {
        assert_eq!(BackendType::parse("OpenAI").unwrap(), BackendType::OpenAi);
        assert_eq!(BackendType::parse("ollama").unwrap(), BackendType::OpenAi);
        assert_eq!(BackendType::parse("claude").unwrap(), BackendType::Anthropic);
        assert!(BackendType::parse("carrier-pigeon").is_err());
    }
}
