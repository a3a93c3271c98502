//! slbot - Straylight chat bot core
//!
//! Event dispatch, a plugin registry, command handling, network-state
//! tracking and a capability graph for an IRC bot. The wire connection is
//! someone else's job: it feeds [`Event`]s into [`Bot::dispatch`] and
//! receives outbound requests through a [`Transport`].

pub mod bot;
pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod event;
pub mod persist;
pub mod plugin;
pub mod plugins;
pub mod privilege;
pub mod registry;
pub mod state;
pub mod transport;

pub use bot::{Bot, BotSettings, Dispatched};
pub use error::BotError;
pub use event::{Event, EventKind};
pub use persist::{StateError, StateRecord};
pub use plugin::{
    CommandSpec, Invocation, Plugin, PluginCatalog, PluginError, PluginFactory, Requirement,
};
pub use privilege::{AuthMap, PrivilegeMap};
pub use registry::{EnableFuture, PluginRegistry, RegistryError, RegistryStatus};
pub use transport::{Transport, TransportError};
