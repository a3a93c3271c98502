//! Plugin lifecycle and subscription tables.
//!
//! The registry owns a slot per enabled plugin name. A slot is either a live
//! instance or a placeholder holding the waiters of an `enable` call whose
//! plugin has not been found in the catalog yet. Each [`scan`] instantiates
//! placeholders the catalog can satisfy, then rebuilds the event and command
//! tables from scratch.
//!
//! [`scan`]: PluginRegistry::scan

use crate::event::EventKind;
use crate::plugin::{CommandSpec, Plugin, PluginCatalog};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Lifecycle failures, delivered to every waiter of an `enable` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("could not load plugin {name}: {reason}")]
    Instantiate { name: String, reason: String },

    #[error("enabling plugin {0} was cancelled")]
    Cancelled(String),
}

impl RegistryError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Instantiate { .. } => "instantiate_failed",
            Self::Cancelled(_) => "cancelled",
        }
    }
}

type EnableResult = Result<Arc<dyn Plugin>, RegistryError>;
type Waiter = oneshot::Sender<EnableResult>;

enum Slot {
    Pending(Vec<Waiter>),
    Live(Arc<dyn Plugin>),
}

/// Subscription tables, rebuilt wholesale by each scan.
#[derive(Default)]
pub struct Tables {
    events: HashMap<EventKind, Vec<Arc<dyn Plugin>>>,
    commands: HashMap<String, Vec<(Arc<dyn Plugin>, CommandSpec)>>,
}

impl Tables {
    pub fn subscribers(&self, kind: EventKind) -> &[Arc<dyn Plugin>] {
        self.events.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn handlers(&self, command: &str) -> &[(Arc<dyn Plugin>, CommandSpec)] {
        self.commands
            .get(command)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Plugin names subscribed to `kind`, in delivery order.
    pub fn subscriber_names(&self, kind: EventKind) -> Vec<String> {
        self.subscribers(kind)
            .iter()
            .map(|p| p.name().to_owned())
            .collect()
    }

    /// Every registered command name, sorted.
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Loaded, pending and available plugin names, each sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStatus {
    pub loaded: Vec<String>,
    /// Enabled, but not (yet) in the catalog.
    pub pending: Vec<String>,
    /// In the catalog, not enabled.
    pub available: Vec<String>,
}

/// Resolves once an enabled plugin is live.
///
/// May never resolve if the plugin never appears in the catalog. Resolves to
/// [`RegistryError::Cancelled`] if the name is disabled first.
pub struct EnableFuture {
    name: String,
    state: EnableState,
}

enum EnableState {
    Ready(Option<EnableResult>),
    Waiting(oneshot::Receiver<EnableResult>),
}

impl EnableFuture {
    fn ready(name: &str, result: EnableResult) -> Self {
        Self {
            name: name.to_owned(),
            state: EnableState::Ready(Some(result)),
        }
    }

    fn waiting(name: &str, rx: oneshot::Receiver<EnableResult>) -> Self {
        Self {
            name: name.to_owned(),
            state: EnableState::Waiting(rx),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The outcome, if already known, without waiting.
    pub fn try_resolve(&mut self) -> Option<EnableResult> {
        match &mut self.state {
            EnableState::Ready(result) => result.take(),
            EnableState::Waiting(rx) => match rx.try_recv() {
                Ok(result) => {
                    self.state = EnableState::Ready(None);
                    Some(result)
                }
                Err(oneshot::error::TryRecvError::Empty) => None,
                Err(oneshot::error::TryRecvError::Closed) => {
                    Some(Err(RegistryError::Cancelled(self.name.clone())))
                }
            },
        }
    }
}

impl Future for EnableFuture {
    type Output = EnableResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let name = self.name.clone();
        match &mut self.state {
            EnableState::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(RegistryError::Cancelled(name))))
            }
            EnableState::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|r| r.unwrap_or(Err(RegistryError::Cancelled(name)))),
        }
    }
}

/// Enabled plugins, their persisted snapshots and the subscription tables.
pub struct PluginRegistry {
    catalog: PluginCatalog,
    config: HashMap<String, toml::Table>,
    slots: Mutex<HashMap<String, Slot>>,
    saved: Mutex<BTreeMap<String, serde_json::Value>>,
    tables: RwLock<Arc<Tables>>,
    scanning: AtomicBool,
    rescan: AtomicBool,
}

impl PluginRegistry {
    /// `config` holds the `[plugins.<name>]` tables handed to factories.
    pub fn new(catalog: PluginCatalog, config: HashMap<String, toml::Table>) -> Self {
        Self {
            catalog,
            config,
            slots: Mutex::new(HashMap::new()),
            saved: Mutex::new(BTreeMap::new()),
            tables: RwLock::new(Arc::new(Tables::default())),
            scanning: AtomicBool::new(false),
            rescan: AtomicBool::new(false),
        }
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    /// The current tables. Cheap; later scans do not affect the snapshot.
    pub fn tables(&self) -> Arc<Tables> {
        Arc::clone(&self.tables.read())
    }

    /// A live plugin by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        match self.slots.lock().get(name) {
            Some(Slot::Live(p)) => Some(Arc::clone(p)),
            _ => None,
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.slots.lock().contains_key(name)
    }

    /// Every enabled name, live or pending, sorted.
    pub fn enabled_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.lock().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn status(&self) -> RegistryStatus {
        let mut status = RegistryStatus::default();
        {
            let slots = self.slots.lock();
            for (name, slot) in slots.iter() {
                match slot {
                    Slot::Live(_) => status.loaded.push(name.clone()),
                    Slot::Pending(_) => status.pending.push(name.clone()),
                }
            }
            status.available = self
                .catalog
                .names()
                .filter(|n| !slots.contains_key(*n))
                .map(str::to_owned)
                .collect();
        }
        status.loaded.sort_unstable();
        status.pending.sort_unstable();
        status.available.sort_unstable();
        status
    }

    /// Persisted plugin snapshots, keyed by plugin name.
    pub fn saved_states(&self) -> BTreeMap<String, serde_json::Value> {
        self.saved.lock().clone()
    }

    /// Replace every persisted snapshot.
    pub fn set_saved_states(&self, states: BTreeMap<String, serde_json::Value>) {
        *self.saved.lock() = states;
    }

    /// Enable a plugin by name.
    ///
    /// Resolves immediately if it is already live. Otherwise the name gets a
    /// placeholder slot and a scan runs; the future resolves when a scan
    /// instantiates the plugin or fails to.
    pub fn enable(&self, name: &str) -> EnableFuture {
        let rx = {
            let mut slots = self.slots.lock();
            match slots.get_mut(name) {
                Some(Slot::Live(p)) => return EnableFuture::ready(name, Ok(Arc::clone(p))),
                Some(Slot::Pending(waiters)) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    rx
                }
                None => {
                    let (tx, rx) = oneshot::channel();
                    slots.insert(name.to_owned(), Slot::Pending(vec![tx]));
                    rx
                }
            }
        };
        debug!(plugin = %name, "plugin enabled");
        self.scan();
        EnableFuture::waiting(name, rx)
    }

    /// Disable a plugin by name, saving its state first if it was live.
    ///
    /// Returns `false` if the name was not enabled. Waiters on a placeholder
    /// resolve to [`RegistryError::Cancelled`].
    pub fn disable(&self, name: &str) -> bool {
        let slot = self.slots.lock().remove(name);
        let found = match slot {
            Some(Slot::Live(plugin)) => {
                info!(plugin = %name, "Disabling plugin, saving state");
                let state = plugin.save_state().unwrap_or_else(|e| {
                    error!(plugin = %name, error = %e, "Failed to save plugin state");
                    None
                });
                let mut saved = self.saved.lock();
                match state {
                    Some(value) => saved.insert(name.to_owned(), value),
                    None => saved.remove(name),
                };
                true
            }
            Some(Slot::Pending(waiters)) => {
                debug!(plugin = %name, waiters = waiters.len(), "Dropping pending plugin");
                true
            }
            None => false,
        };
        self.scan();
        found
    }

    /// Disable then enable, re-instantiating from the just-saved snapshot.
    pub fn reload(&self, name: &str) -> EnableFuture {
        self.disable(name);
        self.enable(name)
    }

    /// Rebuild the subscription tables, instantiating any placeholder the
    /// catalog can satisfy.
    ///
    /// A scan requested while one is running (from a plugin constructor, say)
    /// is folded into the running one, which loops until no further request
    /// arrived.
    pub fn scan(&self) {
        self.rescan.store(true, Ordering::SeqCst);
        loop {
            if self.scanning.swap(true, Ordering::AcqRel) {
                return;
            }
            while self.rescan.swap(false, Ordering::AcqRel) {
                self.scan_once();
            }
            self.scanning.store(false, Ordering::Release);
            // a request may have landed between the last swap and the release
            if !self.rescan.load(Ordering::Acquire) {
                break;
            }
        }
    }

    fn scan_once(&self) {
        let pending: Vec<String> = self
            .slots
            .lock()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Pending(_)))
            .map(|(name, _)| name.clone())
            .collect();

        for factory in self.catalog.iter() {
            if pending.contains(&factory.name) {
                self.instantiate(&factory.name);
            }
        }

        let live: Vec<Arc<dyn Plugin>> = {
            let slots = self.slots.lock();
            self.catalog
                .names()
                .filter_map(|name| match slots.get(name) {
                    Some(Slot::Live(p)) => Some(Arc::clone(p)),
                    _ => None,
                })
                .collect()
        };

        let mut tables = Tables::default();
        for plugin in &live {
            match plugin.interesting_events() {
                Ok(kinds) => {
                    for kind in kinds {
                        let subs = tables.events.entry(kind).or_default();
                        if !subs.iter().any(|p| Arc::ptr_eq(p, plugin)) {
                            subs.push(Arc::clone(plugin));
                        }
                    }
                }
                Err(e) => {
                    error!(plugin = %plugin.name(), error = %e, "Failed to query interesting events");
                }
            }
            match plugin.implemented_commands() {
                Ok(specs) => {
                    for spec in specs {
                        tables
                            .commands
                            .entry(spec.name.clone())
                            .or_default()
                            .push((Arc::clone(plugin), spec));
                    }
                }
                Err(e) => {
                    error!(plugin = %plugin.name(), error = %e, "Failed to query implemented commands");
                }
            }
        }

        debug!(
            plugins = live.len(),
            events = tables.events.len(),
            commands = tables.commands.len(),
            "Plugin scan complete"
        );
        *self.tables.write() = Arc::new(tables);
    }

    /// Build a pending plugin, restore its snapshot and settle its waiters.
    fn instantiate(&self, name: &str) {
        let Some(factory) = self.catalog.get(name) else {
            return;
        };
        info!(plugin = %name, "Loading plugin (first time)");

        let empty = toml::Table::new();
        let config = self.config.get(name).unwrap_or(&empty);
        let snapshot = self.saved.lock().get(name).cloned();

        let built = factory.build(config).and_then(|plugin| {
            if let Some(state) = snapshot {
                info!(plugin = %name, "Loading state for plugin");
                plugin.load_state(state)?;
            }
            Ok(plugin)
        });

        let mut slots = self.slots.lock();
        // disabled while we were building
        let Some(Slot::Pending(_)) = slots.get(name) else {
            return;
        };
        match built {
            Ok(plugin) => {
                let Some(Slot::Pending(waiters)) =
                    slots.insert(name.to_owned(), Slot::Live(Arc::clone(&plugin)))
                else {
                    return;
                };
                drop(slots);
                for tx in waiters {
                    let _ = tx.send(Ok(Arc::clone(&plugin)));
                }
            }
            Err(e) => {
                error!(plugin = %name, error = %e, "Failed to load plugin");
                let waiters = match slots.remove(name) {
                    Some(Slot::Pending(waiters)) => waiters,
                    _ => Vec::new(),
                };
                drop(slots);
                let err = RegistryError::Instantiate {
                    name: name.to_owned(),
                    reason: e.to_string(),
                };
                for tx in waiters {
                    if tx.send(Err(err.clone())).is_err() {
                        warn!(plugin = %name, "Enable waiter went away");
                    }
                }
            }
        }
    }
}
