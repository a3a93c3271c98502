//! Configuration loading and validation.
//!
//! - [`types`]: config struct definitions (Config, BotConfig, PluginsConfig)
//! - [`validation`]: startup checks that report every problem at once

mod types;
mod validation;

pub use types::{BotConfig, Config, ConfigError, PluginsConfig, PrivilegeGrant};
pub use validation::{validate, ValidationError};
