//! Support-ticket links.
//!
//! Answers references such as `z1234` with a link to the ticket. The ticket
//! URL prefix and the reference letter come from `[plugins.zendesk]` and are
//! carried in the saved state.

use crate::bot::Bot;
use crate::event::{Event, EventKind};
use crate::plugin::{Plugin, PluginError, PluginFactory};
use async_trait::async_trait;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "zendesk";

const DEFAULT_TICKETS_URL: &str = "http://unconfigured.zendesk-url.com/tickets/";
const DEFAULT_TICKET_LETTER: &str = "z";

/// Configured and persisted form. Missing keys keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZendeskData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickets_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_letter: Option<String>,
}

/// Where tickets live and how they are referenced.
#[derive(Debug, Clone)]
pub struct TicketLinker {
    tickets_url: String,
    ticket_letter: String,
    ticket_re: Regex,
}

impl TicketLinker {
    pub fn new(tickets_url: &str, ticket_letter: &str) -> Result<Self, PluginError> {
        // tickets 1 through 99999, no leading zero
        let ticket_re = Regex::new(&format!(
            r"\b{}([1-9][0-9]{{0,4}})\b",
            regex::escape(ticket_letter)
        ))?;
        Ok(Self {
            tickets_url: tickets_url.to_owned(),
            ticket_letter: ticket_letter.to_owned(),
            ticket_re,
        })
    }

    /// Build from configured fields, falling back to the defaults.
    pub fn configured(data: ZendeskData) -> Result<Self, PluginError> {
        Self::new(
            data.tickets_url.as_deref().unwrap_or(DEFAULT_TICKETS_URL),
            data.ticket_letter.as_deref().unwrap_or(DEFAULT_TICKET_LETTER),
        )
    }

    /// Overlay whichever fields `data` carries.
    pub fn updated(&self, data: ZendeskData) -> Result<Self, PluginError> {
        Self::new(
            data.tickets_url.as_deref().unwrap_or(&self.tickets_url),
            data.ticket_letter.as_deref().unwrap_or(&self.ticket_letter),
        )
    }

    pub fn data(&self) -> ZendeskData {
        ZendeskData {
            tickets_url: Some(self.tickets_url.clone()),
            ticket_letter: Some(self.ticket_letter.clone()),
        }
    }

    /// Links for every reference in `message`, in order of appearance.
    pub fn links(&self, message: &str) -> Vec<String> {
        self.ticket_re
            .captures_iter(message)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
            .map(|ticket| format!("{}{ticket}", self.tickets_url))
            .collect()
    }
}

pub struct ZendeskLinks {
    linker: RwLock<TicketLinker>,
}

pub fn factory() -> PluginFactory {
    PluginFactory::new(NAME, "Links support ticket references", |config| {
        let settings: ZendeskData = super::settings(config)?;
        let linker = TicketLinker::configured(settings)?;
        Ok(Arc::new(ZendeskLinks {
            linker: RwLock::new(linker),
        }) as Arc<dyn Plugin>)
    })
}

#[async_trait]
impl Plugin for ZendeskLinks {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> Option<&str> {
        Some("Links support ticket references")
    }

    fn interesting_events(&self) -> Result<Vec<EventKind>, PluginError> {
        Ok(vec![EventKind::Privmsg, EventKind::Action])
    }

    async fn on_event(&self, bot: &Bot, event: &Event) -> Result<(), PluginError> {
        let (user, channel, text) = match event {
            Event::Privmsg {
                user,
                channel,
                message,
            } => (user, channel, message),
            Event::Action {
                user,
                channel,
                data,
            } => (user, channel, data),
            _ => return Ok(()),
        };
        let links = self.linker.read().links(text);
        for link in links {
            debug!(%channel, %link, "Linking support ticket");
            bot.address_msg(user, channel, &link, false).await?;
        }
        Ok(())
    }

    fn save_state(&self) -> Result<Option<serde_json::Value>, PluginError> {
        Ok(Some(serde_json::to_value(self.linker.read().data())?))
    }

    fn load_state(&self, state: serde_json::Value) -> Result<(), PluginError> {
        let data: ZendeskData = serde_json::from_value(state)?;
        let mut linker = self.linker.write();
        *linker = linker.updated(data)?;
        Ok(())
    }
}
