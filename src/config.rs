use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory (under the user config dir) holding the integration's files.
const CONFIG_DIR: &str = "ios-battery-bridge";

/// Name of the iOS integration's device file.
pub const CONFIGURATION_FILE: &str = ".ios.conf";

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    load_dotenv_from(Path::new(".env"));
}

fn load_dotenv_from(env_path: &Path) {
    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(&key).is_err() {
            // SAFETY: We're single-threaded at this point (called before any async runtime)
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Parse `KEY=value` lines, skipping blanks and `#` comments.
fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Find the first '=' and split there
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            // Remove surrounding quotes if present
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            pairs.push((key.to_string(), value.to_string()));
        }
    }

    pairs
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub ios: IosConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IosConfig {
    /// JSON file holding the known devices (`{"devices": {...}}`).
    pub config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ios: IosConfig {
                config_file: default_config_file(),
            },
        }
    }
}

fn default_config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIGURATION_FILE)
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("IOS_CONFIG_FILE")
            && !path.trim().is_empty()
        {
            config.ios.config_file = PathBuf::from(path);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotenv_handles_quotes_and_comments() {
        let content = "# comment\n\nIOS_CONFIG_FILE = \"/tmp/my devices.conf\"\nRUST_LOG=debug\nBROKEN\n";
        let pairs = parse_dotenv(content);
        assert_eq!(
            pairs,
            vec![
                (
                    "IOS_CONFIG_FILE".to_string(),
                    "/tmp/my devices.conf".to_string()
                ),
                ("RUST_LOG".to_string(), "debug".to_string()),
            ]
        );
    }

    #[test]
    fn test_default_config_file_name() {
        let config = Config::default();
        assert_eq!(
            config.ios.config_file.file_name().and_then(|n| n.to_str()),
            Some(CONFIGURATION_FILE)
        );
    }
}
