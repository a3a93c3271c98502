//! `logs` command: reply with the URL of the published channel logs.

use crate::bot::Bot;
use crate::plugin::{CommandSpec, Invocation, Plugin, PluginError, PluginFactory};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

pub const NAME: &str = "logs";

#[derive(Debug, Default, Deserialize)]
struct LogsSettings {
    url: Option<String>,
}

pub struct LogsCommand {
    url: Option<String>,
}

pub fn factory() -> PluginFactory {
    PluginFactory::new(NAME, "Tells people where the channel logs live", |config| {
        let settings: LogsSettings = super::settings(config)?;
        Ok(Arc::new(LogsCommand { url: settings.url }) as Arc<dyn Plugin>)
    })
}

#[async_trait]
impl Plugin for LogsCommand {
    fn name(&self) -> &str {
        NAME
    }

    fn implemented_commands(&self) -> Result<Vec<CommandSpec>, PluginError> {
        Ok(vec![CommandSpec::new("logs")])
    }

    async fn run_command(&self, bot: &Bot, inv: &Invocation) -> Result<(), PluginError> {
        let text = self.url.as_deref().unwrap_or("No log URL is configured.");
        bot.address_msg(&inv.user, &inv.channel, text, true).await?;
        Ok(())
    }
}
