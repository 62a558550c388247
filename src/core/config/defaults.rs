use crate::core::config::data::Config;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_PRODUCT_API_URL: &str = "https://wildkratts.com/wp-json/wp/v2";
pub const DEFAULT_EPISODE_API_URL: &str = "https://wildkratts.com/wp-json/wild-kratts/v1";
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Configuration after defaults, environment, and command-line overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub model: String,
    pub base_url: String,
    pub product_api_url: String,
    pub episode_api_url: String,
    pub max_tool_rounds: usize,
    pub markdown: bool,
    pub api_key: Option<String>,
}

impl Config {
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn product_api_url(&self) -> &str {
        self.product_api_url
            .as_deref()
            .unwrap_or(DEFAULT_PRODUCT_API_URL)
    }

    pub fn episode_api_url(&self) -> &str {
        self.episode_api_url
            .as_deref()
            .unwrap_or(DEFAULT_EPISODE_API_URL)
    }

    pub fn max_tool_rounds(&self) -> usize {
        self.max_tool_rounds.unwrap_or(DEFAULT_MAX_TOOL_ROUNDS)
    }

    pub fn markdown(&self) -> bool {
        self.markdown.unwrap_or(true)
    }

    /// Resolves the effective settings from the process environment.
    pub fn resolve(&self, model_override: Option<&str>) -> EffectiveConfig {
        self.resolve_with(model_override, |name| std::env::var(name).ok())
    }

    /// Resolves the effective settings with `lookup` standing in for the
    /// environment. Empty variables count as unset.
    pub fn resolve_with<F>(&self, model_override: Option<&str>, lookup: F) -> EffectiveConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        EffectiveConfig {
            model: model_override.unwrap_or(self.model()).to_string(),
            base_url: env(BASE_URL_ENV).unwrap_or_else(|| self.base_url().to_string()),
            product_api_url: self.product_api_url().to_string(),
            episode_api_url: self.episode_api_url().to_string(),
            max_tool_rounds: self.max_tool_rounds(),
            markdown: self.markdown(),
            api_key: env(API_KEY_ENV),
        }
    }
}
