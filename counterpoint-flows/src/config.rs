//! Explicit configuration for providers and flows.
//!
//! Nothing in this crate reads the process environment. The binary collects
//! settings (flags, env fallbacks) and hands a `FlowConfig` to the registry.

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Default request timeout for hosted providers
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// OpenAI or any OpenAI-compatible endpoint
    OpenAI,
    Anthropic,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAI),
            "anthropic" => Ok(ProviderType::Anthropic),
            other => Err(Error::config_invalid(format!("unknown provider '{}'", other))
                .with_context("provider", other)),
        }
    }
}

/// Configuration for creating providers
#[derive(Clone)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub headers: HashMap<String, String>,
    pub timeout_secs: Option<u64>,
}

// api_key stays out of logs
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider_type", &self.provider_type)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::OpenAI,
            api_key: Some(api_key.into()),
            base_url: Some("https://api.openai.com/v1".into()),
            default_model: Some("gpt-4o".into()),
            headers: HashMap::new(),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn anthropic(api_key: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("anthropic-version".into(), "2023-06-01".into());

        Self {
            provider_type: ProviderType::Anthropic,
            api_key: Some(api_key.into()),
            base_url: Some("https://api.anthropic.com/v1".into()),
            default_model: Some("claude-sonnet-4-20250514".into()),
            headers,
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// A local OpenAI-compatible server (vLLM, Ollama, llama.cpp); no key needed
    pub fn local(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::OpenAI,
            api_key: None,
            base_url: Some(base_url.into()),
            default_model: Some(model.into()),
            headers: HashMap::new(),
            timeout_secs: Some(300),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    fn is_hosted(&self) -> bool {
        match self.provider_type {
            ProviderType::Anthropic => true,
            ProviderType::OpenAI => self
                .base_url
                .as_deref()
                .map_or(true, |url| url.contains("api.openai.com")),
        }
    }

    /// Reject configurations that cannot possibly work.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.base_url {
            if url.trim().is_empty() {
                return Err(Error::config_invalid("base URL is empty")
                    .with_operation("config::validate")
                    .with_context("provider", self.provider_type.as_str()));
            }
        }

        let has_key = self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty());
        if self.is_hosted() && !has_key {
            return Err(Error::config_invalid(format!(
                "provider '{}' requires an API key",
                self.provider_type
            ))
            .with_operation("config::validate")
            .with_context("provider", self.provider_type.as_str()));
        }

        if self.timeout_secs == Some(0) {
            return Err(Error::config_invalid("timeout must be at least one second")
                .with_operation("config::validate"));
        }

        Ok(())
    }
}

/// Everything needed to build the flow registry
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub provider: ProviderConfig,
    pub retry: RetryPolicy,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

impl FlowConfig {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.provider.validate()?;
        self.retry.validate()?;
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(Error::config_invalid(format!(
                    "temperature {} is outside 0.0..=2.0",
                    t
                ))
                .with_operation("config::validate"));
            }
        }
        Ok(())
    }
}
