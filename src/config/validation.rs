//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use slbot_proto::ChannelExt;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("bot.nickname is required")]
    MissingNickname,
    #[error("bot.nickname must not contain spaces, got '{0}'")]
    InvalidNickname(String),
    #[error("bot.channels entry is not a channel name: '{0}'")]
    InvalidChannel(String),
    #[error("bot.command_prefix must not be empty")]
    EmptyCommandPrefix,
    #[error("privileges entry has an empty capability")]
    EmptyCapability,
    #[error("privileges entry for '{capability}' has a bad channel: '{channel}'")]
    InvalidPrivilegeChannel { capability: String, channel: String },
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let nick = &config.bot.nickname;
    if nick.is_empty() {
        errors.push(ValidationError::MissingNickname);
    } else if nick.contains(char::is_whitespace) {
        errors.push(ValidationError::InvalidNickname(nick.clone()));
    }

    for channel in &config.bot.channels {
        if !channel.is_channel_name() {
            errors.push(ValidationError::InvalidChannel(channel.clone()));
        }
    }

    if config.bot.command_prefix.as_deref() == Some("") {
        errors.push(ValidationError::EmptyCommandPrefix);
    }

    for grant in &config.privileges {
        if grant.capability.is_empty() {
            errors.push(ValidationError::EmptyCapability);
        }
        if let Some(channel) = &grant.channel {
            if !channel.is_channel_name() {
                errors.push(ValidationError::InvalidPrivilegeChannel {
                    capability: grant.capability.clone(),
                    channel: channel.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> Config {
        Config::from_toml(toml).unwrap()
    }

    #[test]
    fn valid_config_passes() {
        let cfg = config(
            r##"
[bot]
nickname = "slbot"
channels = ["#dev", "&local"]
command_prefix = "!"
"##,
        );
        assert_eq!(validate(&cfg), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let cfg = config(
            r##"
[bot]
nickname = "sl bot"
channels = ["dev"]
command_prefix = ""

[[privileges]]
capability = ""
channel = "nochan"
"##,
        );
        let errors = validate(&cfg).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidNickname("sl bot".into()),
                ValidationError::InvalidChannel("dev".into()),
                ValidationError::EmptyCommandPrefix,
                ValidationError::EmptyCapability,
                ValidationError::InvalidPrivilegeChannel {
                    capability: String::new(),
                    channel: "nochan".into()
                },
            ]
        );
    }

    #[test]
    fn empty_nickname_is_missing() {
        let cfg = config("[bot]\nnickname = \"\"\n");
        assert_eq!(validate(&cfg), Err(vec![ValidationError::MissingNickname]));
    }
}
