//! Environment configuration.
//!
//! Credentials come from the environment. All three are required; startup
//! halts with a diagnostic listing every missing name rather than failing on
//! the first one.

use crate::error::ConfigError;

/// Runtime configuration, constructed once at process start.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Supabase project, without a trailing slash.
    pub supabase_url: String,
    /// Anon key used for both the `apikey` header and bearer auth.
    pub supabase_anon_key: String,
    pub openai_api_key: String,
    /// Override for the chat-completions endpoint (defaults to api.openai.com).
    pub openai_base_url: Option<String>,
    /// Override for the completion model.
    pub openai_model: Option<String>,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut require = |name: &str| match lookup(name).filter(|value| !value.is_empty()) {
            Some(value) => Some(value),
            None => {
                missing.push(name.to_string());
                None
            }
        };

        let supabase_url = require("SUPABASE_URL");
        let supabase_anon_key = require("SUPABASE_ANON_KEY");
        let openai_api_key = require("OPENAI_API_KEY");

        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }

        Ok(Self {
            supabase_url: supabase_url
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            supabase_anon_key: supabase_anon_key.unwrap_or_default(),
            openai_api_key: openai_api_key.unwrap_or_default(),
            openai_base_url: lookup("OPENAI_BASE_URL").filter(|value| !value.is_empty()),
            openai_model: lookup("OPENAI_MODEL").filter(|value| !value.is_empty()),
        })
    }
}
