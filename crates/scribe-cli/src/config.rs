//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Backend used when neither the file nor the command line names one
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Environment variable consulted when the file carries no API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Configuration for scribe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL
    pub base_url: Option<String>,
    /// Default model to use
    pub model: Option<String>,
    /// Project selected at startup
    pub project: Option<String>,
    /// System prompt override
    pub system_prompt: Option<String>,
    /// API key (alternative to the environment variable)
    pub api_key: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scribe")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SCRIBE_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file. A missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            model: Some(scribe_chat::conversation::DEFAULT_MODEL.to_string()),
            ..Default::default()
        };

        default_config.save()?;
        Ok(path)
    }

    /// API key from the file, falling back to the environment
    pub fn get_api_key(&self) -> Option<String> {
        self.resolve_api_key(std::env::var(API_KEY_ENV).ok())
    }

    fn resolve_api_key(&self, from_env: Option<String>) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or(from_env.filter(|k| !k.trim().is_empty()))
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# scribe configuration file
# Place at ~/.config/scribe/config.toml (Linux/Mac) or %APPDATA%\scribe\config.toml (Windows)

# Chat backend
base_url = "http://localhost:3000"

# Default model to use
model = "gpt-4o-mini"

# Project whose user stories the assistant works on
# project = "my-project-id"

# Custom system prompt (optional)
# system_prompt = "You are a product assistant..."

# API key (optional - OPENAI_API_KEY is used otherwise)
# api_key = "sk-..."
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(example_config()).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.model.as_deref(), Some("gpt-4o-mini"));
        assert!(config.project.is_none());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_missing_fields_default() {
        let config = Config::parse("project = \"p-1\"").unwrap();
        assert_eq!(
            config,
            Config {
                project: Some("p-1".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_api_key_prefers_file() {
        let config = Config {
            api_key: Some("sk-file".into()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_api_key(Some("sk-env".into())).as_deref(),
            Some("sk-file")
        );
    }

    #[test]
    fn test_api_key_falls_back_to_env() {
        let config = Config {
            api_key: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_api_key(Some("sk-env".into())).as_deref(),
            Some("sk-env")
        );
        assert_eq!(config.resolve_api_key(None), None);
        assert_eq!(config.resolve_api_key(Some(String::new())), None);
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let config = Config {
            base_url: Some("https://scribe.example".into()),
            model: Some("gpt-test".into()),
            ..Default::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(Config::parse(&text).unwrap(), config);
    }
}
