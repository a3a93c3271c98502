//! Chat transcript on the `irclog` tracing target.
//!
//! Channel chatter is logged unless the speaker's nick matches that
//! channel's blacklist. Blacklist entries are nick globs (`*`, `?`).
//!
//! ```toml
//! [plugins.bot_logger.blacklist]
//! "#dev" = ["evn", "*bot"]
//! ```

use crate::bot::Bot;
use crate::command::natural_list;
use crate::event::{Event, EventKind};
use crate::plugin::{CommandSpec, Invocation, Plugin, PluginError, PluginFactory};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use slbot_proto::{irc_eq, wildcard_match, Identity};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, warn};

pub const NAME: &str = "bot_logger";

/// Capability needed to blacklist anyone other than yourself.
pub const BLACKLIST_ADMIN: &str = "log_blacklist_admin";

type Blacklists = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Default, Deserialize)]
struct LoggerSettings {
    #[serde(default)]
    blacklist: Blacklists,
}

pub struct BotLogger {
    blacklists: RwLock<Blacklists>,
}

pub fn factory() -> PluginFactory {
    PluginFactory::new(NAME, "Logs channel traffic", |config| {
        let settings: LoggerSettings = super::settings(config)?;
        Ok(Arc::new(BotLogger::new(settings.blacklist)) as Arc<dyn Plugin>)
    })
}

macro_rules! irclog {
    ($($arg:tt)+) => {
        info!(target: "irclog", $($arg)+)
    };
}

fn quoted(names: &[String]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
    natural_list(&quoted)
}

impl BotLogger {
    pub fn new(blacklists: Blacklists) -> Self {
        Self {
            blacklists: RwLock::new(blacklists),
        }
    }

    /// Whether `nick` is blacklisted in `channel`.
    pub fn is_blacklisted(&self, channel: &str, nick: &str) -> bool {
        self.blacklists
            .read()
            .get(channel)
            .is_some_and(|bl| bl.iter().any(|pattern| wildcard_match(pattern, nick)))
    }

    fn chatter(&self, channel: &str, user: &str) -> Option<String> {
        let nick = Identity::nick_of(user);
        (!self.is_blacklisted(channel, nick)).then(|| nick.to_owned())
    }

    fn log_event(&self, bot: &Bot, event: &Event) {
        match event {
            Event::SignedOn => irclog!("Signed on as {}.", bot.nickname()),
            Event::Joined { channel } => irclog!("Joined {channel}."),
            Event::Left { channel } => irclog!("Left {channel}."),
            Event::Noticed {
                user,
                channel,
                message,
            } => irclog!("NOTICE -!- [{channel}] <{user}> {message}"),
            Event::ModeChanged {
                user,
                channel,
                set,
                modes,
                args,
            } => irclog!(
                "MODE -!- {} {} modes {modes:?} in {channel:?} for {args:?}",
                user.as_deref().unwrap_or("server"),
                if *set { "set" } else { "unset" }
            ),
            Event::KickedFrom {
                channel,
                kicker,
                message,
            } => irclog!("KICKED -!- from {channel} by {kicker} [{message}]"),
            Event::NickChanged { nick } => irclog!("NICKCHANGE -!- my nick changed to {nick}"),
            Event::UserJoined { user, channel } => irclog!("{user} joined {channel}"),
            Event::UserLeft { user, channel } => irclog!("{user} left {channel}"),
            Event::UserQuit { user, message } => irclog!("{user} quit [{message}]"),
            Event::UserKicked {
                kickee,
                channel,
                kicker,
                message,
            } => irclog!("{kickee} was kicked from {channel} by {kicker} [{message}]"),
            Event::TopicUpdated {
                user,
                channel,
                topic,
            } => irclog!("[{channel}] -!- topic changed by {user} to {topic:?}"),
            Event::UserRenamed { old, new } => irclog!("RENAME {old} is now known as {new}"),
            Event::ReceivedMotd { motd } => irclog!("MOTD {}", motd.join("\n")),
            Event::Msg { target, text } => irclog!("[{target}] <{}> {text}", bot.nickname()),
            Event::Action {
                user,
                channel,
                data,
            } => {
                if let Some(nick) = self.chatter(channel, user) {
                    irclog!("[{channel}] * {nick} {data}");
                }
            }
            Event::Privmsg {
                user,
                channel,
                message,
            } => {
                if let Some(nick) = self.chatter(channel, user) {
                    irclog!("[{channel}] <{nick}> {message}");
                }
            }
            _ => {}
        }
    }

    fn blacklist(&self, bot: &Bot, inv: &Invocation) -> String {
        let chan = inv.channel.as_str();
        let nick = Identity::nick_of(&inv.user);
        match inv.args.as_slice() {
            [] => "usage: \"blacklist me\" OR \"blacklist [name [name2 [...]]]\". Second form \
                   requires log_blacklist_admin privilege in this channel. Shell-style \
                   wildcards are ok."
                .to_owned(),
            [who] if who == "me" || irc_eq(who, nick) => {
                self.blacklists
                    .write()
                    .entry(chan.to_owned())
                    .or_default()
                    .insert(nick.to_owned());
                format!("Blacklisting you for {chan}.")
            }
            names if bot.user_has_in(chan, &inv.user, BLACKLIST_ADMIN) => {
                let mut lists = self.blacklists.write();
                let bl = lists.entry(chan.to_owned()).or_default();
                let added: Vec<String> = names
                    .iter()
                    .filter(|name| bl.insert(name.to_string()))
                    .cloned()
                    .collect();
                format!("Blacklisted {}", quoted(&added))
            }
            _ => "blacklisting other names requires the log_blacklist_admin privilege in this \
                  channel."
                .to_owned(),
        }
    }

    fn unblacklist(&self, bot: &Bot, inv: &Invocation) -> String {
        let chan = inv.channel.as_str();
        let nick = Identity::nick_of(&inv.user);
        match inv.args.as_slice() {
            [] => "usage: \"unblacklist me\" OR \"unblacklist [name [name2 [...]]]\". Second \
                   form requires log_blacklist_admin privilege in this channel. Shell-style \
                   wildcards are ok."
                .to_owned(),
            [who] if who == "me" || irc_eq(who, nick) => {
                let removed = self
                    .blacklists
                    .write()
                    .get_mut(chan)
                    .is_some_and(|bl| bl.remove(nick));
                if removed {
                    format!("Unblacklisting you for {chan}.")
                } else {
                    format!("You are not blacklisted in {chan}.")
                }
            }
            names if bot.user_has_in(chan, &inv.user, BLACKLIST_ADMIN) => {
                let mut lists = self.blacklists.write();
                let found: Vec<String> = match lists.get_mut(chan) {
                    Some(bl) => names.iter().filter(|name| bl.remove(*name)).cloned().collect(),
                    None => Vec::new(),
                };
                format!("Unblacklisted {}", quoted(&found))
            }
            _ => "unblacklisting other names requires the log_blacklist_admin privilege in \
                  this channel."
                .to_owned(),
        }
    }

    fn show(&self, inv: &Invocation) -> String {
        match inv.args.as_slice() {
            [what] if what == "blacklist" => {
                let names: Vec<String> = self
                    .blacklists
                    .read()
                    .get(&inv.channel)
                    .map(|bl| bl.iter().cloned().collect())
                    .unwrap_or_default();
                format!("Blacklist for {}: {}", inv.channel, quoted(&names))
            }
            _ => "usage: show blacklist".to_owned(),
        }
    }
}

#[async_trait]
impl Plugin for BotLogger {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> Option<&str> {
        Some("Logs channel traffic")
    }

    fn interesting_events(&self) -> Result<Vec<EventKind>, PluginError> {
        Ok(vec![
            EventKind::SignedOn,
            EventKind::Joined,
            EventKind::Left,
            EventKind::Noticed,
            EventKind::ModeChanged,
            EventKind::KickedFrom,
            EventKind::NickChanged,
            EventKind::UserJoined,
            EventKind::UserLeft,
            EventKind::UserQuit,
            EventKind::UserKicked,
            EventKind::TopicUpdated,
            EventKind::UserRenamed,
            EventKind::ReceivedMotd,
            EventKind::Msg,
            EventKind::Action,
            EventKind::Privmsg,
        ])
    }

    fn implemented_commands(&self) -> Result<Vec<CommandSpec>, PluginError> {
        Ok(vec![
            CommandSpec::new("blacklist"),
            CommandSpec::new("unblacklist"),
            CommandSpec::new("show"),
        ])
    }

    async fn on_event(&self, bot: &Bot, event: &Event) -> Result<(), PluginError> {
        self.log_event(bot, event);
        Ok(())
    }

    async fn run_command(&self, bot: &Bot, inv: &Invocation) -> Result<(), PluginError> {
        let reply = match inv.command.as_str() {
            "blacklist" => self.blacklist(bot, inv),
            "unblacklist" => self.unblacklist(bot, inv),
            "show" => self.show(inv),
            other => return Err(PluginError::NotImplemented(other.to_owned())),
        };
        bot.address_msg(&inv.user, &inv.channel, &reply, true).await?;
        Ok(())
    }

    fn save_state(&self) -> Result<Option<serde_json::Value>, PluginError> {
        Ok(Some(serde_json::to_value(&*self.blacklists.read())?))
    }

    fn load_state(&self, state: serde_json::Value) -> Result<(), PluginError> {
        match serde_json::from_value::<Blacklists>(state) {
            Ok(lists) => *self.blacklists.write() = lists,
            Err(e) => warn!(plugin = NAME, error = %e, "Discarding malformed blacklist state"),
        }
        Ok(())
    }
}
