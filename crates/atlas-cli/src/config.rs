//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration for atlas
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Analysis service base URL
    pub server: Option<String>,
    /// User id owning the conversations
    pub user: Option<String>,
    /// Business whose data queries run against
    pub business: Option<String>,
    /// Transcript store backend ("http" or "file")
    pub store: Option<String>,
    /// Directory for file-store transcripts
    pub data_dir: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("atlas")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        // Check for ATLAS_CONFIG_PATH env var first
        if let Ok(path) = std::env::var("ATLAS_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
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

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        let dir = path.parent().unwrap();
        fs::create_dir_all(dir)?;

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
            server: Some("http://127.0.0.1:8000".to_string()),
            user: None,
            business: None,
            store: Some("http".to_string()),
            data_dir: None,
        };

        default_config.save()?;
        Ok(path)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# atlas configuration file
# Place at ~/.config/atlas/config.toml (Linux/Mac) or %APPDATA%\atlas\config.toml (Windows)

# Analysis service base URL
server = "http://127.0.0.1:8000"

# User id owning the conversations
user = "demo-user"

# Business whose data queries run against
business = "demo-business"

# Transcript store backend: "http" (remote service) or "file" (local JSON files)
store = "http"

# Directory for file-store transcripts (defaults to the platform data dir)
# data_dir = "/var/lib/atlas/conversations"
"#
}
