//! Core configuration types.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Identity and connection-level settings.
    pub bot: BotConfig,
    /// Plugin enablement and per-plugin settings.
    #[serde(default)]
    pub plugins: PluginsConfig,
    /// Bootstrap privilege grants, applied on top of any persisted ones.
    #[serde(default)]
    pub privileges: Vec<PrivilegeGrant>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// The `[bot]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Nickname to use on the network.
    pub nickname: String,
    /// Channels to join after signing on.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Optional prefix that marks a channel message as a command (e.g. `!`).
    pub command_prefix: Option<String>,
    /// Where persisted state lives (default: `slbot.state.json`).
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    /// Tracing filter directive, used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,
}

fn default_state_file() -> PathBuf {
    PathBuf::from("slbot.state.json")
}

/// The `[plugins]` section.
///
/// Any sub-table other than `enabled` is that plugin's settings, e.g.
/// `[plugins.logs]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginsConfig {
    /// Plugins to enable when no state file exists yet.
    #[serde(default)]
    pub enabled: Vec<String>,
    #[serde(flatten)]
    pub settings: HashMap<String, toml::Table>,
}

/// One `[[privileges]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PrivilegeGrant {
    pub capability: String,
    #[serde(default)]
    pub masks: Vec<String>,
    /// Channel-scoped grant when present.
    pub channel: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
[bot]
nickname = "slbot"
channels = ["#dev"]
command_prefix = "!"

[plugins]
enabled = ["admin", "logs"]

[plugins.logs]
url = "https://logs.example.org/"

[[privileges]]
capability = "admin"
masks = ["alice!*@*.example.org"]

[[privileges]]
capability = "log_blacklist_admin"
masks = ["bob!*@*"]
channel = "#dev"
"##;

    #[test]
    fn parses_full_config() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.bot.nickname, "slbot");
        assert_eq!(config.bot.channels, vec!["#dev"]);
        assert_eq!(config.bot.command_prefix.as_deref(), Some("!"));
        assert_eq!(config.bot.state_file, PathBuf::from("slbot.state.json"));
        assert_eq!(config.plugins.enabled, vec!["admin", "logs"]);
        assert_eq!(
            config.plugins.settings["logs"]["url"].as_str(),
            Some("https://logs.example.org/")
        );
        assert_eq!(config.privileges.len(), 2);
        assert_eq!(config.privileges[1].channel.as_deref(), Some("#dev"));
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_toml("[bot]\nnickname = \"b\"\n").unwrap();
        assert!(config.bot.channels.is_empty());
        assert!(config.plugins.enabled.is_empty());
        assert!(config.plugins.settings.is_empty());
        assert!(config.privileges.is_empty());
        assert!(!config.bot.log_json);
    }

    #[test]
    fn missing_bot_section_is_a_parse_error() {
        assert!(matches!(
            Config::from_toml("[plugins]\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            Config::load("/nonexistent/slbot.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
