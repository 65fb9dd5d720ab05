//! # Configuration Module
//!
//! This module loads configuration from environment variables (and a `.env`
//! file, if present). Provider credentials are optional: whichever are set
//! decide which model backends are reachable.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::llm::{huggingface, openai};

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Main configuration for the Slack assistant.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI key. `None` routes every request to the fallback provider.
    pub openai_api_key: Option<String>,

    /// Model for the streaming Responses API (e.g., "gpt-4o-mini")
    pub openai_model: String,

    pub openai_api_base: String,

    /// Hugging Face token. `None` leaves only the unavailability message.
    pub huggingface_api_key: Option<String>,

    pub huggingface_model: String,

    pub huggingface_api_base: String,

    /// Bot token (`xoxb-...`) for the Web API
    pub slack_bot_token: Option<String>,

    /// App-level token (`xapp-...`) for Socket Mode
    pub slack_app_token: Option<String>,

    pub slack_api_base: String,

    /// Temperature for fallback completions (0.0 = deterministic)
    pub temperature: f32,

    /// Token cap for fallback completions
    pub max_tokens: u32,

    /// Follow-up passes allowed after tool calls in one reply
    pub max_tool_rounds: usize,

    /// Seconds to wait for a provider's response headers
    pub request_timeout_secs: u64,

    /// Seconds to wait between two streamed events
    pub stream_idle_timeout_secs: u64,

    /// Log level for the application
    pub log_level: String,
}

// =============================================================================
// DEFAULT IMPLEMENTATION
// =============================================================================
impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: openai::DEFAULT_MODEL.to_string(),
            openai_api_base: openai::DEFAULT_API_BASE.to_string(),
            huggingface_api_key: None,
            huggingface_model: huggingface::DEFAULT_MODEL.to_string(),
            huggingface_api_base: huggingface::DEFAULT_API_BASE.to_string(),
            slack_bot_token: None,
            slack_app_token: None,
            slack_api_base: "https://slack.com/api".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            max_tool_rounds: 5,
            request_timeout_secs: 60,
            stream_idle_timeout_secs: 30,
            log_level: "info".to_string(),
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Example
    /// ```ignore
    /// let config = Config::from_env()?;
    /// println!("Using model: {}", config.openai_model);
    /// ```
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (silently ignore if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|val| val.trim().to_string())
                .filter(|val| !val.is_empty())
        };

        // Start with default values
        let mut config = Config::default();

        config.openai_api_key = get("OPENAI_API_KEY");
        config.huggingface_api_key = get("HUGGINGFACE_API_KEY");
        config.slack_bot_token = get("SLACK_BOT_TOKEN");
        config.slack_app_token = get("SLACK_APP_TOKEN");

        if let Some(val) = get("OPENAI_MODEL") {
            config.openai_model = val;
        }

        if let Some(val) = get("OPENAI_API_BASE") {
            config.openai_api_base = val;
        }

        if let Some(val) = get("HUGGINGFACE_MODEL") {
            config.huggingface_model = val;
        }

        if let Some(val) = get("HUGGINGFACE_API_BASE") {
            config.huggingface_api_base = val;
        }

        if let Some(val) = get("SLACK_API_BASE") {
            config.slack_api_base = val;
        }

        // .context() adds helpful error messages when things fail
        if let Some(val) = get("TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("TEMPERATURE must be a valid floating-point number (e.g., 0.7)")?;
        }

        if let Some(val) = get("MAX_TOKENS") {
            config.max_tokens = val
                .parse()
                .context("MAX_TOKENS must be a valid positive integer")?;
        }

        if let Some(val) = get("MAX_TOOL_ROUNDS") {
            config.max_tool_rounds = val
                .parse()
                .context("MAX_TOOL_ROUNDS must be a valid positive integer")?;
        }

        if let Some(val) = get("REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = val
                .parse()
                .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;
        }

        if let Some(val) = get("STREAM_IDLE_TIMEOUT_SECS") {
            config.stream_idle_timeout_secs = val
                .parse()
                .context("STREAM_IDLE_TIMEOUT_SECS must be a whole number of seconds")?;
        }

        if let Some(val) = get("RUST_LOG") {
            config.log_level = val;
        }

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if self.max_tokens == 0 {
            anyhow::bail!("MAX_TOKENS must be at least 1");
        }

        if self.max_tool_rounds == 0 {
            anyhow::bail!("MAX_TOOL_ROUNDS must be at least 1");
        }

        if self.request_timeout_secs == 0 || self.stream_idle_timeout_secs == 0 {
            anyhow::bail!("Timeouts must be at least 1 second");
        }

        if self.openai_model.is_empty() {
            anyhow::bail!("OPENAI_MODEL cannot be empty");
        }

        if self.huggingface_model.is_empty() {
            anyhow::bail!("HUGGINGFACE_MODEL cannot be empty");
        }

        Ok(())
    }

    /// Both Slack tokens, or an error naming the missing one.
    pub fn slack_tokens(&self) -> Result<(&str, &str)> {
        let bot = self
            .slack_bot_token
            .as_deref()
            .context("SLACK_BOT_TOKEN is required to run the bot")?;
        let app = self
            .slack_app_token
            .as_deref()
            .context("SLACK_APP_TOKEN is required for Socket Mode")?;
        Ok((bot, app))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.openai_api_key.is_none());
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.huggingface_model, "Qwen/Qwen2.5-Coder-32B-Instruct");
        assert_eq!(config.huggingface_api_base, "https://router.huggingface.co/v1");
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.max_tool_rounds, 5);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-1"),
            ("HUGGINGFACE_API_KEY", "  "),
            ("OPENAI_MODEL", "gpt-4.1"),
            ("TEMPERATURE", "0.2"),
            ("MAX_TOOL_ROUNDS", "3"),
            ("STREAM_IDLE_TIMEOUT_SECS", "10"),
        ]))
        .unwrap();

        assert_eq!(config.openai_api_key.as_deref(), Some("sk-1"));
        assert!(config.huggingface_api_key.is_none());
        assert_eq!(config.openai_model, "gpt-4.1");
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.max_tool_rounds, 3);
        assert_eq!(config.stream_idle_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_from_lookup_rejects_bad_numbers() {
        let err = Config::from_lookup(lookup(&[("MAX_TOKENS", "lots")])).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn test_config_validation_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_temperature() {
        let mut config = Config::default();
        config.temperature = 3.0; // Invalid: above 2.0
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_tool_rounds() {
        let mut config = Config::default();
        config.max_tool_rounds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_slack_tokens_required() {
        let mut config = Config::default();
        config.slack_bot_token = Some("xoxb-1".to_string());
        let err = config.slack_tokens().unwrap_err();
        assert!(err.to_string().contains("SLACK_APP_TOKEN"));

        config.slack_app_token = Some("xapp-1".to_string());
        assert_eq!(config.slack_tokens().unwrap(), ("xoxb-1", "xapp-1"));
    }
}
