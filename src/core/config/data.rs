use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk configuration. Every key is optional; unset keys fall back to the
/// values in [`crate::core::config::defaults`].
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Chat model name sent with every completion request
    pub model: Option<String>,
    /// Base URL of the OpenAI-compatible chat API
    pub base_url: Option<String>,
    /// Base URL of the product catalog (`/products` is appended)
    pub product_api_url: Option<String>,
    /// Base URL of the episode list (`/episodes` is appended)
    pub episode_api_url: Option<String>,
    /// Upper bound on model/tool round trips within one turn
    pub max_tool_rounds: Option<usize>,
    /// Enable markdown rendering in the transcript
    pub markdown: Option<bool>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
