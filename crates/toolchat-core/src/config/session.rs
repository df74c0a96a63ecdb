//! Chat session settings

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::types::EmptyArgumentsPolicy;

/// Model used when nothing else is configured
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";

/// Sampling temperature used when nothing else is configured
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Turn cap used when nothing else is configured
pub const DEFAULT_MAX_TURNS: usize = 25;

/// Settings for one chat session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Model identifier, optionally prefixed with a provider (`openai/gpt-4o`)
    pub model: String,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Maximum tokens per model turn
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Maximum model turns per `run`; `None` (or 0) loops until the model stops calling tools
    #[serde(default)]
    pub max_turns: Option<usize>,
    /// How to treat a tool call with no argument text
    #[serde(default)]
    pub empty_arguments: EmptyArgumentsPolicy,
    /// Prepended to a fresh conversation
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Custom endpoint for OpenAI-compatible servers
    #[serde(default)]
    pub api_base: Option<String>,
    /// Explicit key; without one the backend reads its usual environment variables
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: None,
            max_turns: Some(DEFAULT_MAX_TURNS),
            empty_arguments: EmptyArgumentsPolicy::default(),
            system_prompt: None,
            api_base: None,
            api_key: None,
        }
    }
}

impl SessionConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Read overrides from `TOOLCHAT_MODEL`, `TOOLCHAT_TEMPERATURE`,
    /// `TOOLCHAT_MAX_TURNS` and `TOOLCHAT_API_BASE`
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (used by `from_env`)
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(model) = lookup("TOOLCHAT_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }

        if let Some(raw) = lookup("TOOLCHAT_TEMPERATURE") {
            let temperature: f32 = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("TOOLCHAT_TEMPERATURE is not a number: {}", raw))
            })?;
            config.temperature = Some(temperature);
        }

        if let Some(raw) = lookup("TOOLCHAT_MAX_TURNS") {
            let raw = raw.trim();
            config.max_turns = if raw == "0" || raw.eq_ignore_ascii_case("unlimited") {
                None
            } else {
                Some(raw.parse().map_err(|_| {
                    ConfigError::Invalid(format!("TOOLCHAT_MAX_TURNS is not a count: {}", raw))
                })?)
            };
        }

        config.api_base = lookup("TOOLCHAT_API_BASE").filter(|b| !b.trim().is_empty());

        Ok(config)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Cap the number of model turns per run; 0 removes the cap
    pub fn with_max_turns(mut self, turns: usize) -> Self {
        self.max_turns = (turns > 0).then_some(turns);
        self
    }

    /// Effective turn cap, treating 0 as unbounded
    pub fn turn_limit(&self) -> Option<usize> {
        self.max_turns.filter(|&limit| limit > 0)
    }

    /// Remove the turn cap
    pub fn unbounded(mut self) -> Self {
        self.max_turns = None;
        self
    }

    pub fn with_empty_arguments(mut self, policy: EmptyArgumentsPolicy) -> Self {
        self.empty_arguments = policy;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.temperature, Some(DEFAULT_TEMPERATURE));
        assert_eq!(config.max_turns, Some(DEFAULT_MAX_TURNS));
        assert_eq!(config.empty_arguments, EmptyArgumentsPolicy::EmptyObject);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("TOOLCHAT_MODEL", "openai/gpt-4o"),
            ("TOOLCHAT_TEMPERATURE", "0.2"),
            ("TOOLCHAT_MAX_TURNS", "unlimited"),
            ("TOOLCHAT_API_BASE", "http://localhost:8000/v1/"),
        ]))
        .unwrap();

        assert_eq!(config.model, "openai/gpt-4o");
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_turns, None);
        assert_eq!(config.api_base.as_deref(), Some("http://localhost:8000/v1/"));
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = SessionConfig::from_lookup(lookup(&[("TOOLCHAT_MAX_TURNS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::new("mock")
            .with_max_turns(3)
            .with_empty_arguments(EmptyArgumentsPolicy::Reject)
            .with_system_prompt("Be brief");
        assert_eq!(config.max_turns, Some(3));
        assert_eq!(config.empty_arguments, EmptyArgumentsPolicy::Reject);
        assert_eq!(config.clone().unbounded().max_turns, None);
    }

    #[test]
    fn test_zero_turns_means_unbounded() {
        assert_eq!(SessionConfig::new("mock").with_max_turns(0).turn_limit(), None);
        assert_eq!(SessionConfig::new("mock").with_max_turns(4).turn_limit(), Some(4));

        let from_env = SessionConfig::from_lookup(lookup(&[("TOOLCHAT_MAX_TURNS", "0")])).unwrap();
        assert_eq!(from_env.turn_limit(), None);

        let mut raw = SessionConfig::new("mock");
        raw.max_turns = Some(0);
        assert_eq!(raw.turn_limit(), None);
    }
}
