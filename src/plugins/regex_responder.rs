//! Canned replies to messages matching a pattern.
//!
//! Each rule pairs a regular expression with a reply template. Every match
//! in a message yields one reply, with `$name` and `${name}` replaced by the
//! named capture groups. Placeholders naming no group are left untouched and
//! `$$` is a literal dollar sign.

use crate::bot::Bot;
use crate::event::{Event, EventKind};
use crate::plugin::{CommandSpec, Invocation, Plugin, PluginError, PluginFactory};
use async_trait::async_trait;
use parking_lot::RwLock;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use slbot_proto::Mask;
use std::sync::Arc;

pub const NAME: &str = "regex_responder";

#[derive(Debug, Clone)]
struct Rule {
    pattern: Regex,
    template: String,
}

impl Rule {
    fn new(pattern: &str, template: &str) -> Result<Self, PluginError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            template: template.to_owned(),
        })
    }

    fn responses<'a>(&'a self, message: &'a str) -> impl Iterator<Item = String> + 'a {
        self.pattern
            .captures_iter(message)
            .map(|caps| substitute(&self.template, &self.pattern, &caps))
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_ident(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Value of the named group, or `None` if `re` has no group by that name.
/// Groups that did not take part in the match are empty.
fn group<'t>(re: &Regex, caps: &Captures<'t>, name: &str) -> Option<&'t str> {
    if re.capture_names().flatten().any(|n| n == name) {
        Some(caps.name(name).map_or("", |m| m.as_str()))
    } else {
        None
    }
}

/// Expand `template` against one match.
fn substitute(template: &str, re: &Regex, caps: &Captures<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        let braced = after.starts_with('{');
        let body = if braced { &after[1..] } else { after };
        let len = match body.chars().next() {
            Some(c) if is_ident_start(c) => body.find(|c: char| !is_ident(c)).unwrap_or(body.len()),
            _ => 0,
        };
        let name = &body[..len];
        let closed = !braced || body[len..].starts_with('}');

        match group(re, caps, name) {
            Some(value) if len > 0 && closed => {
                out.push_str(value);
                let consumed = 1 + len + if braced { 2 } else { 0 };
                rest = &rest[pos + consumed..];
            }
            _ => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ResponderState {
    #[serde(default)]
    link_ignore_list: Vec<Mask>,
    #[serde(default)]
    response_rules: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct Inner {
    ignore: Vec<Mask>,
    rules: Vec<Rule>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponderSettings {
    #[serde(default)]
    rules: Vec<(String, String)>,
    #[serde(default)]
    ignore: Vec<Mask>,
}

pub struct RegexResponder {
    inner: RwLock<Inner>,
}

pub fn factory() -> PluginFactory {
    PluginFactory::new(NAME, "Replies to messages matching configured patterns", |config| {
        let settings: ResponderSettings = super::settings(config)?;
        let rules = settings
            .rules
            .iter()
            .map(|(p, t)| Rule::new(p, t))
            .collect::<Result<_, _>>()?;
        Ok(Arc::new(RegexResponder {
            inner: RwLock::new(Inner {
                ignore: settings.ignore,
                rules,
            }),
        }) as Arc<dyn Plugin>)
    })
}

impl RegexResponder {
    fn responses_for(&self, user: &str, message: &str) -> Vec<String> {
        let inner = self.inner.read();
        if super::ignored(&inner.ignore, user) {
            return Vec::new();
        }
        let all = inner
            .rules
            .iter()
            .flat_map(|rule| rule.responses(message))
            .collect();
        super::dedup_in_order(all)
    }

    fn add_rule(&self, pattern: &str, template: &str) -> Result<String, PluginError> {
        let rule = Rule::new(pattern, template)?;
        let mut inner = self.inner.write();
        inner.rules.retain(|r| r.pattern.as_str() != pattern);
        inner.rules.push(rule);
        Ok(format!("Responding to /{pattern}/ with {template:?}."))
    }

    fn del_rule(&self, pattern: &str) -> String {
        let mut inner = self.inner.write();
        let before = inner.rules.len();
        inner.rules.retain(|r| r.pattern.as_str() != pattern);
        if inner.rules.len() < before {
            format!("Removed the rule for /{pattern}/.")
        } else {
            format!("No rule for /{pattern}/.")
        }
    }

    fn list_rules(&self) -> Vec<String> {
        let inner = self.inner.read();
        if inner.rules.is_empty() {
            return vec!["No response rules.".to_owned()];
        }
        inner
            .rules
            .iter()
            .map(|r| format!("/{}/ -> {:?}", r.pattern.as_str(), r.template))
            .collect()
    }
}

#[async_trait]
impl Plugin for RegexResponder {
    fn name(&self) -> &str {
        NAME
    }

    fn interesting_events(&self) -> Result<Vec<EventKind>, PluginError> {
        Ok(vec![EventKind::Privmsg, EventKind::Action])
    }

    fn implemented_commands(&self) -> Result<Vec<CommandSpec>, PluginError> {
        Ok(vec![
            CommandSpec::new("add-response").requires("admin"),
            CommandSpec::new("del-response").requires("admin"),
            CommandSpec::new("list-responses").requires("admin"),
        ])
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
        for response in self.responses_for(user, text) {
            bot.address_msg(user, channel, &response, false).await?;
        }
        Ok(())
    }

    async fn run_command(&self, bot: &Bot, inv: &Invocation) -> Result<(), PluginError> {
        let lines = match (inv.command.as_str(), inv.args.as_slice()) {
            ("add_response", [pattern, template]) => vec![self.add_rule(pattern, template)?],
            ("add_response", _) => vec!["usage: add-response <pattern> <template>".to_owned()],
            ("del_response", [pattern]) => vec![self.del_rule(pattern)],
            ("del_response", _) => vec!["usage: del-response <pattern>".to_owned()],
            ("list_responses", []) => self.list_rules(),
            ("list_responses", _) => vec!["usage: list-responses".to_owned()],
            (other, _) => return Err(PluginError::NotImplemented(other.to_owned())),
        };
        for line in lines {
            bot.address_msg(&inv.user, &inv.channel, &line, true).await?;
        }
        Ok(())
    }

    fn save_state(&self) -> Result<Option<serde_json::Value>, PluginError> {
        let inner = self.inner.read();
        let state = ResponderState {
            link_ignore_list: inner.ignore.clone(),
            response_rules: inner
                .rules
                .iter()
                .map(|r| (r.pattern.as_str().to_owned(), r.template.clone()))
                .collect(),
        };
        Ok(Some(serde_json::to_value(state)?))
    }

    fn load_state(&self, state: serde_json::Value) -> Result<(), PluginError> {
        let state: ResponderState = serde_json::from_value(state)?;
        let rules = state
            .response_rules
            .iter()
            .map(|(p, t)| Rule::new(p, t))
            .collect::<Result<_, _>>()?;
        let mut inner = self.inner.write();
        inner.ignore = state.link_ignore_list;
        inner.rules = rules;
        Ok(())
    }
}
