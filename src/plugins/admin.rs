//! Plugin management and privilege administration.
//!
//! | Command | Privilege | Effect |
//! |---------|-----------|--------|
//! | `modules` | - | list loaded, pending and available plugins |
//! | `modenable <name>...` | `admin` | enable plugins |
//! | `moddisable <name>...` | `admin` | disable plugins |
//! | `modreload <name>...` | `admin` | disable then re-enable plugins |
//! | `grant <cap> <mask> [#chan]` | `admin` | add a privilege holder |
//! | `revoke <cap> <mask> [#chan]` | `admin` | remove a privilege holder |
//! | `privs <cap> [#chan]` | - | list holders of a capability |

use crate::bot::Bot;
use crate::plugin::{CommandSpec, Invocation, Plugin, PluginError, PluginFactory};
use crate::registry::EnableFuture;
use async_trait::async_trait;
use slbot_proto::ChannelExt;
use std::sync::Arc;

pub const NAME: &str = "admin";

pub struct Admin;

pub fn factory() -> PluginFactory {
    PluginFactory::new(NAME, "Plugin and privilege administration", |_| {
        Ok(Arc::new(Admin) as Arc<dyn Plugin>)
    })
}

fn makelist(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_owned()
    } else {
        items.join(", ")
    }
}

/// Describe an enable request by whether it settled immediately.
fn describe_enable(name: &str, mut fut: EnableFuture) -> String {
    match fut.try_resolve() {
        Some(Ok(_)) => format!("Module {name} loaded."),
        Some(Err(e)) => format!("Problem loading {name}: {e}"),
        None => format!("Module {name} marked for loading once it is found."),
    }
}

impl Admin {
    fn modules(&self, bot: &Bot) -> String {
        let status = bot.registry().status();
        let mut lines = vec![format!("loaded modules: {}", makelist(&status.loaded))];
        if !status.pending.is_empty() {
            lines.push(format!(
                "modules enabled but not found: {}",
                makelist(&status.pending)
            ));
        }
        lines.push(format!(
            "other available modules: {}",
            makelist(&status.available)
        ));
        lines.join("\n")
    }

    fn grant_or_revoke(&self, bot: &Bot, grant: bool, args: &[String]) -> Result<String, String> {
        let verb = if grant { "grant" } else { "revoke" };
        let (capability, mask, channel) = match args {
            [cap, mask] => (cap, mask, None),
            [cap, mask, chan] if chan.is_channel_name() => (cap, mask, Some(chan)),
            _ => return Err(format!("usage: {verb} <capability> <mask> [<#channel>]")),
        };

        let mut auth = bot.privileges().write();
        let changed = match (grant, channel) {
            (true, None) => auth.grant(mask.as_str(), capability),
            (true, Some(chan)) => auth.grant_in(chan, mask.as_str(), capability),
            (false, None) => auth.revoke(mask, capability),
            (false, Some(chan)) => auth.revoke_in(chan, mask, capability),
        };
        let scope = channel.map(|c| format!(" in {c}")).unwrap_or_default();
        Ok(match (grant, changed) {
            (true, true) => format!("Granted {capability} to {mask}{scope}."),
            (true, false) => format!("{mask} already holds {capability}{scope}."),
            (false, true) => format!("Revoked {capability} from {mask}{scope}."),
            (false, false) => format!("{mask} does not hold {capability}{scope}."),
        })
    }

    fn privs(&self, bot: &Bot, args: &[String]) -> String {
        let (capability, channel) = match args {
            [cap] => (cap, None),
            [cap, chan] => (cap, Some(chan)),
            _ => return "usage: privs <capability> [<#channel>]".to_owned(),
        };
        let auth = bot.privileges().read();
        let holders: Vec<String> = match channel {
            None => auth.who_has(capability),
            Some(chan) => auth.who_has_in(chan, capability),
        }
        .into_iter()
        .map(|m| m.to_string())
        .collect();
        match channel {
            None => format!("{capability}: {}", makelist(&holders)),
            Some(chan) => format!("{capability} in {chan}: {}", makelist(&holders)),
        }
    }
}

#[async_trait]
impl Plugin for Admin {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> Option<&str> {
        Some("Plugin and privilege administration")
    }

    fn implemented_commands(&self) -> Result<Vec<CommandSpec>, PluginError> {
        Ok(vec![
            CommandSpec::new("modules"),
            CommandSpec::new("modenable").requires("admin"),
            CommandSpec::new("moddisable").requires("admin"),
            CommandSpec::new("modreload").requires("admin"),
            CommandSpec::new("grant").requires("admin"),
            CommandSpec::new("revoke").requires("admin"),
            CommandSpec::new("privs"),
        ])
    }

    async fn run_command(&self, bot: &Bot, inv: &Invocation) -> Result<(), PluginError> {
        let args = inv.args.as_slice();
        let mut replies: Vec<String> = Vec::new();

        match inv.command.as_str() {
            "modules" if !args.is_empty() => replies.push("usage: modules".into()),
            "modules" => replies.push(self.modules(bot)),
            "modenable" | "moddisable" | "modreload" if args.is_empty() => {
                replies.push(format!("usage: {} [modulenames]", inv.command));
            }
            "modenable" => {
                for name in args {
                    replies.push(describe_enable(name, bot.registry().enable(name)));
                }
            }
            "moddisable" => {
                for name in args {
                    if bot.registry().disable(name) {
                        replies.push(format!("Module {name} disabled."));
                    } else {
                        replies.push(format!("Module {name} is not loaded."));
                    }
                }
            }
            "modreload" => {
                for name in args {
                    if bot.registry().is_enabled(name) {
                        replies.push(describe_enable(name, bot.registry().reload(name)));
                    } else {
                        replies.push(format!("Module {name} is not loaded."));
                    }
                }
            }
            "grant" | "revoke" => {
                let grant = inv.command == "grant";
                match self.grant_or_revoke(bot, grant, args) {
                    Ok(text) | Err(text) => replies.push(text),
                }
            }
            "privs" => replies.push(self.privs(bot, args)),
            other => return Err(PluginError::NotImplemented(other.to_owned())),
        }

        for text in replies {
            bot.address_msg(&inv.user, &inv.channel, &text, true).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn makelist_formats() {
        assert_eq!(makelist(&[]), "none");
        assert_eq!(makelist(&["a".into(), "b".into()]), "a, b");
    }
}
