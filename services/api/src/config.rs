//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use chefcito_core::{AgentSettings, ContextLimits, ToolLimits};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub chat_model: String,
    pub chat_temperature: f32,
    pub agent_max_iters: usize,
    pub agent_history_window: usize,
    pub llm_timeout: Duration,
    pub context_limits: ContextLimits,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address = parse_or(
            &lookup,
            "BIND_ADDRESS",
            SocketAddr::from(([0, 0, 0, 0], 3000)),
        )?;

        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Language Model Settings ---
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|v| !v.trim().is_empty());
        let openai_base_url = lookup("OPENAI_BASE_URL").filter(|v| !v.trim().is_empty());
        let chat_model = lookup("CHAT_MODEL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "gpt-4o-mini".to_string());
        let chat_temperature: f32 = parse_or(&lookup, "CHAT_TEMPERATURE", 0.4)?;
        if !(0.0..=2.0).contains(&chat_temperature) {
            return Err(ConfigError::InvalidValue(
                "CHAT_TEMPERATURE".to_string(),
                format!("{} is outside 0.0..=2.0", chat_temperature),
            ));
        }

        // --- Agent Settings ---
        let agent_max_iters: usize = parse_or(&lookup, "AGENT_MAX_ITERS", 3)?;
        if agent_max_iters == 0 {
            return Err(ConfigError::InvalidValue(
                "AGENT_MAX_ITERS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let agent_history_window = parse_or(&lookup, "AGENT_HISTORY_WINDOW", 8)?;
        let llm_timeout = Duration::from_secs(parse_or(&lookup, "LLM_TIMEOUT_SECS", 60)?);

        let defaults = ContextLimits::default();
        let context_limits = ContextLimits {
            max_recipes: parse_or(&lookup, "CONTEXT_MAX_RECIPES", defaults.max_recipes)?,
            max_ingredients: parse_or(&lookup, "CONTEXT_MAX_INGREDIENTS", defaults.max_ingredients)?,
            max_categories: parse_or(&lookup, "CONTEXT_MAX_CATEGORIES", defaults.max_categories)?,
        };

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            openai_api_key,
            openai_base_url,
            chat_model,
            chat_temperature,
            agent_max_iters,
            agent_history_window,
            llm_timeout,
            context_limits,
        })
    }

    /// The agent settings derived from this configuration.
    pub fn agent_settings(&self) -> AgentSettings {
        AgentSettings {
            max_iters: self.agent_max_iters,
            history_window: self.agent_history_window,
            llm_timeout: self.llm_timeout,
            context: self.context_limits,
            tools: ToolLimits::default(),
        }
    }
}

/// Parses `key` when it is set, otherwise returns the default.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_database_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/chefcito")]).unwrap();
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert_eq!(config.db_max_connections, 5);
        assert!(config.openai_api_key.is_none());

        let settings = config.agent_settings();
        assert_eq!(settings, AgentSettings::default());
    }

    #[test]
    fn database_url_is_required() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "DATABASE_URL"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/chefcito"),
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("RUST_LOG", "debug"),
            ("CHAT_TEMPERATURE", "0.9"),
            ("AGENT_MAX_ITERS", "1"),
            ("AGENT_HISTORY_WINDOW", "4"),
            ("LLM_TIMEOUT_SECS", "5"),
            ("CONTEXT_MAX_INGREDIENTS", "10"),
        ])
        .unwrap();
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.chat_temperature, 0.9);

        let settings = config.agent_settings();
        assert_eq!(settings.max_iters, 1);
        assert_eq!(settings.history_window, 4);
        assert_eq!(settings.llm_timeout, Duration::from_secs(5));
        assert_eq!(settings.context.max_ingredients, 10);
        assert_eq!(settings.context.max_recipes, 220);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        for (key, value) in [
            ("AGENT_MAX_ITERS", "three"),
            ("AGENT_MAX_ITERS", "0"),
            ("CHAT_TEMPERATURE", "7"),
            ("BIND_ADDRESS", "nowhere"),
            ("RUST_LOG", "loud"),
        ] {
            let err = load(&[("DATABASE_URL", "postgres://db"), (key, value)]).unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidValue(var, _) if var == key),
                "{key}={value} gave {err}"
            );
        }
    }
}
