use crate::core::config::data::Config;
use std::path::Path;

/// Keys accepted by `kratts set` and `kratts unset`.
pub const CONFIG_KEYS: [&str; 6] = [
    "model",
    "base-url",
    "product-api-url",
    "episode-api-url",
    "max-tool-rounds",
    "markdown",
];

fn unknown_key(key: &str) -> String {
    format!(
        "Unknown config key: {key} (expected one of: {})",
        CONFIG_KEYS.join(", ")
    )
}

impl Config {
    /// Sets one key from its command-line spelling. Numeric and boolean keys
    /// are parsed here so a bad value never reaches the file.
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("A value is required for {key}"));
        }
        match key {
            "model" => self.model = Some(value.to_string()),
            "base-url" => self.base_url = Some(value.to_string()),
            "product-api-url" => self.product_api_url = Some(value.to_string()),
            "episode-api-url" => self.episode_api_url = Some(value.to_string()),
            "max-tool-rounds" => {
                let rounds = value
                    .parse::<usize>()
                    .ok()
                    .filter(|rounds| *rounds > 0)
                    .ok_or_else(|| {
                        format!("max-tool-rounds must be a positive integer, got {value}")
                    })?;
                self.max_tool_rounds = Some(rounds);
            }
            "markdown" => {
                let enabled = match value.to_ascii_lowercase().as_str() {
                    "true" | "on" | "yes" => true,
                    "false" | "off" | "no" => false,
                    _ => return Err(format!("markdown must be on or off, got {value}")),
                };
                self.markdown = Some(enabled);
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    pub fn unset_key(&mut self, key: &str) -> Result<(), String> {
        match key {
            "model" => self.model = None,
            "base-url" => self.base_url = None,
            "product-api-url" => self.product_api_url = None,
            "episode-api-url" => self.episode_api_url = None,
            "max-tool-rounds" => self.max_tool_rounds = None,
            "markdown" => self.markdown = None,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Loads, applies `mutator`, and writes back to the same location.
    pub fn update<F>(
        explicit_path: Option<&Path>,
        mutator: F,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        F: FnOnce(&mut Config) -> Result<(), String>,
    {
        let path = match explicit_path {
            Some(path) => path.to_path_buf(),
            None => Self::get_config_path()?,
        };
        let mut config = Self::load_from_path(&path)?;
        mutator(&mut config)?;
        config.save_to_path(&path)
    }
}
