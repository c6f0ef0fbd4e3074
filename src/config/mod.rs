//! # Configuration Management Module
//!
//! TOML configuration for the quest editor. Every section is optional and
//! falls back to its defaults; unknown sections are rejected so typos surface
//! at startup.
//!
//! ## Configuration Structure
//!
//! - [`EditorConfig`] - editor title and who may open the menu
//! - [`StorageConfig`] - location of the quest document tree
//! - [`MenuConfig`] - long-text editor page width
//! - [`LoggingConfig`] - log level, log file and audit file
//! - [`ProgressConfig`] - consumption reporting
//!
//! ## Usage
//!
//! ```rust,no_run
//! use questdesk::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Quests live in {}", config.storage.quests_dir);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [editor]
//! name = "Quest Editor"
//! allowed_users = []
//!
//! [storage]
//! quests_dir = "./quests"
//!
//! [menu]
//! book_page_chars = 240
//!
//! [logging]
//! level = "info"
//! file = "questdesk.log"
//! audit_file = "questdesk-audit.log"
//!
//! [progress]
//! enabled = false
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Accepted `[logging].level` values.
pub const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Allowed range for `[menu].book_page_chars`.
pub const BOOK_PAGE_CHARS_RANGE: std::ops::RangeInclusive<usize> = 16..=1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub menu: MenuConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Title prefix of editor views
    #[serde(default = "default_editor_name")]
    pub name: String,
    /// Operators allowed to open the menu. Empty allows everyone.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

fn default_editor_name() -> String {
    "Quest Editor".to_string()
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            name: default_editor_name(),
            allowed_users: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_quests_dir")]
    pub quests_dir: String,
}

fn default_quests_dir() -> String {
    "./quests".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            quests_dir: default_quests_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuConfig {
    /// Characters per page in the long-text editor
    #[serde(default = "default_book_page_chars")]
    pub book_page_chars: usize,
}

fn default_book_page_chars() -> usize {
    crate::gui::editor::DEFAULT_PAGE_CHARS
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            book_page_chars: default_book_page_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
    /// Receives a copy of every document mutation line
    #[serde(default)]
    pub audit_file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: Some("questdesk.log".to_string()),
            audit_file: Some("questdesk-audit.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(default)]
    pub enabled: bool,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config = Self::from_toml(&content).map_err(|e| anyhow!("Invalid config file {}: {}", path, e))?;
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| anyhow!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.quests_dir.trim().is_empty() {
            return Err(anyhow!("storage.quests_dir must not be empty"));
        }
        if !BOOK_PAGE_CHARS_RANGE.contains(&self.menu.book_page_chars) {
            return Err(anyhow!(
                "menu.book_page_chars must be between {} and {}, got {}",
                BOOK_PAGE_CHARS_RANGE.start(),
                BOOK_PAGE_CHARS_RANGE.end(),
                self.menu.book_page_chars
            ));
        }
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(anyhow!(
                "logging.level '{}' is not one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
        Ok(())
    }
}
