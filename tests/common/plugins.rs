//! Plugins whose behavior is fixed at construction, for exercising the
//! registry and dispatcher.

use async_trait::async_trait;
use parking_lot::Mutex;
use slbot::{Bot, CommandSpec, Event, EventKind, Invocation, Plugin, PluginError, PluginFactory};
use std::sync::Arc;

/// Shared record of plugin calls, as `"<plugin>:<what>"` strings.
pub type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Clone)]
pub struct Scripted {
    pub name: String,
    pub events: Vec<EventKind>,
    pub commands: Vec<CommandSpec>,
    pub fail_events: bool,
    pub panic_events: bool,
    pub command_failure: Option<String>,
    pub panic_commands: bool,
    pub log: CallLog,
}

#[allow(dead_code)]
impl Scripted {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_owned(),
            events: Vec::new(),
            commands: Vec::new(),
            fail_events: false,
            panic_events: false,
            command_failure: None,
            panic_commands: false,
            log: Arc::clone(log),
        }
    }

    pub fn on(mut self, kind: EventKind) -> Self {
        self.events.push(kind);
        self
    }

    pub fn command(mut self, spec: CommandSpec) -> Self {
        self.commands.push(spec);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_events = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_events = true;
        self
    }

    pub fn failing_commands(mut self, message: &str) -> Self {
        self.command_failure = Some(message.to_owned());
        self
    }

    pub fn panicking_commands(mut self) -> Self {
        self.panic_commands = true;
        self
    }

    pub fn factory(self) -> PluginFactory {
        let name = self.name.clone();
        PluginFactory::new(&name, "scripted test plugin", move |_| {
            Ok(Arc::new(self.clone()) as Arc<dyn Plugin>)
        })
    }
}

#[async_trait]
impl Plugin for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    fn interesting_events(&self) -> Result<Vec<EventKind>, PluginError> {
        Ok(self.events.clone())
    }

    fn implemented_commands(&self) -> Result<Vec<CommandSpec>, PluginError> {
        Ok(self.commands.clone())
    }

    async fn on_event(&self, _bot: &Bot, event: &Event) -> Result<(), PluginError> {
        self.log
            .lock()
            .push(format!("{}:{}", self.name, event.kind().as_str()));
        if self.panic_events {
            panic!("{} blew up", self.name);
        }
        if self.fail_events {
            return Err(PluginError::failed("scripted failure"));
        }
        Ok(())
    }

    async fn run_command(&self, bot: &Bot, inv: &Invocation) -> Result<(), PluginError> {
        self.log.lock().push(format!(
            "{}:{}({})",
            self.name,
            inv.command,
            inv.args.join("|")
        ));
        if self.panic_commands {
            panic!("{} blew up", self.name);
        }
        if let Some(message) = &self.command_failure {
            return Err(PluginError::failed(message.clone()));
        }
        bot.address_msg(&inv.user, &inv.channel, &format!("{} ran", self.name), true)
            .await?;
        Ok(())
    }
}
