//! The plugin contract.
//!
//! A plugin is a [`Plugin`] trait object built by a [`PluginFactory`]. The
//! registry asks each live plugin which events it wants and which commands it
//! implements, and the dispatcher calls it through [`Plugin::on_event`] and
//! [`Plugin::run_command`].
//!
//! Methods take `&self`; plugins with mutable state keep it behind a lock.
//! Such locks must not be held across an `.await`.

use crate::bot::Bot;
use crate::event::{Event, EventKind};
use crate::registry::RegistryError;
use crate::transport::TransportError;
use crate::BotError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors a plugin can raise from any of its hooks.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("{0}")]
    Failed(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("bad saved state: {0}")]
    State(#[from] serde_json::Error),

    #[error("bad pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("bad config: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Bot(#[from] BotError),
}

impl From<TransportError> for PluginError {
    fn from(e: TransportError) -> Self {
        Self::Bot(e.into())
    }
}

impl PluginError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Failed(_) => "failed",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotImplemented(_) => "not_implemented",
            Self::State(_) => "bad_state",
            Self::Pattern(_) => "bad_pattern",
            Self::Config(_) => "bad_config",
            Self::Registry(_) => "registry",
            Self::Bot(e) => e.error_code(),
        }
    }
}

/// A privilege the dispatcher checks before running a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// A capability from the global privilege map.
    Global(String),
    /// A capability from the map of the channel the command came from.
    Channel(String),
}

/// A command a plugin implements, with its optional privilege requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Normalized name: lowercase, `_` instead of `-`.
    pub name: String,
    pub requirement: Option<Requirement>,
}

impl CommandSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: normalize_command(name),
            requirement: None,
        }
    }

    /// Require a global capability.
    pub fn requires(mut self, capability: &str) -> Self {
        self.requirement = Some(Requirement::Global(capability.to_owned()));
        self
    }

    /// Require a capability in the channel the command is issued in.
    pub fn requires_in_channel(mut self, capability: &str) -> Self {
        self.requirement = Some(Requirement::Channel(capability.to_owned()));
        self
    }
}

/// Lowercase and map `-` to `_`, so `Add-Jira` and `add_jira` are one command.
pub fn normalize_command(name: &str) -> String {
    name.to_lowercase().replace('-', "_")
}

/// One command invocation, as handed to [`Plugin::run_command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Full identity of the issuer.
    pub user: String,
    /// Where it came from; the bot's own nick for private messages.
    pub channel: String,
    /// Normalized command name.
    pub command: String,
    /// The command word as typed.
    pub typed: String,
    pub args: Vec<String>,
}

/// A live plugin instance.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    /// Events this plugin wants delivered. Queried on every scan.
    fn interesting_events(&self) -> Result<Vec<EventKind>, PluginError> {
        Ok(Vec::new())
    }

    /// Commands this plugin handles. Queried on every scan.
    fn implemented_commands(&self) -> Result<Vec<CommandSpec>, PluginError> {
        Ok(Vec::new())
    }

    async fn on_event(&self, _bot: &Bot, _event: &Event) -> Result<(), PluginError> {
        Ok(())
    }

    async fn run_command(&self, _bot: &Bot, invocation: &Invocation) -> Result<(), PluginError> {
        Err(PluginError::NotImplemented(invocation.command.clone()))
    }

    /// Snapshot state to persist across disable/enable and restarts.
    /// `None` means nothing worth keeping.
    fn save_state(&self) -> Result<Option<serde_json::Value>, PluginError> {
        Ok(None)
    }

    /// Restore a snapshot. Called at most once per instance, right after
    /// construction, and only when a snapshot exists.
    fn load_state(&self, _state: serde_json::Value) -> Result<(), PluginError> {
        Ok(())
    }
}

type BuildFn = dyn Fn(&toml::Table) -> Result<Arc<dyn Plugin>, PluginError> + Send + Sync;

/// Constructor for a plugin, registered in a [`PluginCatalog`].
#[derive(Clone)]
pub struct PluginFactory {
    pub name: String,
    pub description: String,
    build: Arc<BuildFn>,
}

impl PluginFactory {
    /// `build` receives the plugin's `[plugins.<name>]` config table, empty
    /// when absent.
    pub fn new<F>(name: &str, description: &str, build: F) -> Self
    where
        F: Fn(&toml::Table) -> Result<Arc<dyn Plugin>, PluginError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_owned(),
            description: description.to_owned(),
            build: Arc::new(build),
        }
    }

    pub fn build(&self, config: &toml::Table) -> Result<Arc<dyn Plugin>, PluginError> {
        (self.build)(config)
    }
}

impl fmt::Debug for PluginFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginFactory")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// The set of plugins that can be enabled, in registration order.
///
/// Registration order is delivery order: subscribers to an event are called
/// in the order their factories appear here.
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    factories: Vec<PluginFactory>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory. A later factory with the same name replaces the earlier.
    pub fn register(&mut self, factory: PluginFactory) -> &mut Self {
        self.factories.retain(|f| f.name != factory.name);
        self.factories.push(factory);
        self
    }

    pub fn with(mut self, factory: PluginFactory) -> Self {
        self.register(factory);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PluginFactory> {
        self.factories.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginFactory> {
        self.factories.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.iter().map(|f| f.name.as_str())
    }
}
