//! Issue-tracker links.
//!
//! Watches channel traffic for ticket references and answers with browse
//! links. Each configured instance recognizes `PROJ-123` style references
//! for its project name, and optionally bare shortcode references such as
//! `CASS123` at or above a minimum ticket number.

use crate::bot::Bot;
use crate::event::{Event, EventKind};
use crate::plugin::{CommandSpec, Invocation, Plugin, PluginError, PluginFactory};
use async_trait::async_trait;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use slbot_proto::Mask;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "jira";

const ADD_USAGE: &str =
    "usage: add-jira <base_url> <projectname> [<shortcode> [<username> <password>]] [min=<N>]";

/// Characters that may precede a ticket reference.
const LEAD: &str = r#"(?:^|[\[\s({<>:",@*'~])"#;

/// Persisted form of an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraInstanceData {
    pub base_url: String,
    pub projectname: String,
    #[serde(default)]
    pub shortcode: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub min_ticket: u64,
}

/// One issue tracker and the patterns that find references to it.
#[derive(Debug, Clone)]
pub struct JiraInstance {
    data: JiraInstanceData,
    project_re: Regex,
    shortcode_re: Option<Regex>,
}

impl JiraInstance {
    pub fn new(mut data: JiraInstanceData) -> Result<Self, PluginError> {
        data.base_url = data.base_url.trim_end_matches('/').to_owned();
        let project_re = Regex::new(&format!(
            r"{LEAD}{}-(?P<num>\d+)\b",
            regex::escape(&data.projectname)
        ))?;
        let shortcode_re = match &data.shortcode {
            Some(code) => Some(Regex::new(&format!(
                r"{LEAD}{}(?P<num>\d+)\b",
                regex::escape(code)
            ))?),
            None => None,
        };
        Ok(Self {
            data,
            project_re,
            shortcode_re,
        })
    }

    pub fn data(&self) -> &JiraInstanceData {
        &self.data
    }

    fn numbers<'a>(re: &'a Regex, message: &'a str) -> impl Iterator<Item = u64> + 'a {
        re.captures_iter(message)
            .filter_map(|caps| caps.name("num")?.as_str().parse().ok())
    }

    /// Ticket numbers referenced in `message`: shortcode hits first (only
    /// those at or above the minimum), then full project references.
    pub fn ticket_references(&self, message: &str) -> Vec<u64> {
        let mut found: Vec<u64> = match &self.shortcode_re {
            Some(re) => Self::numbers(re, message)
                .filter(|n| *n >= self.data.min_ticket)
                .collect(),
            None => Vec::new(),
        };
        found.extend(Self::numbers(&self.project_re, message));
        found
    }

    pub fn make_link(&self, ticket: u64) -> String {
        format!("{}/browse/{}-{}", self.data.base_url, self.data.projectname, ticket)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct JiraState {
    #[serde(default)]
    link_ignore_list: Vec<Mask>,
    #[serde(default)]
    jira_instances: Vec<JiraInstanceData>,
}

#[derive(Debug, Default)]
struct Inner {
    ignore: Vec<Mask>,
    instances: Vec<JiraInstance>,
}

#[derive(Debug, Default, Deserialize)]
struct JiraSettings {
    #[serde(default)]
    instances: Vec<JiraInstanceData>,
    #[serde(default)]
    ignore: Vec<Mask>,
}

pub struct JiraLinks {
    inner: RwLock<Inner>,
}

pub fn factory() -> PluginFactory {
    PluginFactory::new(NAME, "Links ticket references to the issue tracker", |config| {
        let settings: JiraSettings = super::settings(config)?;
        let instances = settings
            .instances
            .into_iter()
            .map(JiraInstance::new)
            .collect::<Result<_, _>>()?;
        Ok(Arc::new(JiraLinks {
            inner: RwLock::new(Inner {
                ignore: settings.ignore,
                instances,
            }),
        }) as Arc<dyn Plugin>)
    })
}

/// Split an optional trailing `min=<N>` off `args`.
fn split_min(args: &[String]) -> Result<(&[String], u64), PluginError> {
    match args.split_last() {
        Some((last, rest)) if last.starts_with("min=") => {
            let value = &last["min=".len()..];
            let min = value
                .parse()
                .map_err(|_| PluginError::InvalidArgument(format!("min={value}")))?;
            Ok((rest, min))
        }
        _ => Ok((args, 0)),
    }
}

fn parse_add(args: &[String]) -> Result<Option<JiraInstanceData>, PluginError> {
    let (args, min_ticket) = split_min(args)?;
    let (base_url, projectname, shortcode, username, password) = match args {
        [base, project] => (base, project, None, None, None),
        [base, project, code] => (base, project, Some(code), None, None),
        [base, project, code, user, pass] => (base, project, Some(code), Some(user), Some(pass)),
        _ => return Ok(None),
    };
    Ok(Some(JiraInstanceData {
        base_url: base_url.clone(),
        projectname: projectname.clone(),
        shortcode: shortcode.cloned(),
        username: username.cloned(),
        password: password.cloned(),
        min_ticket,
    }))
}

impl JiraLinks {
    fn links_for(&self, user: &str, message: &str) -> Vec<String> {
        let inner = self.inner.read();
        if super::ignored(&inner.ignore, user) {
            return Vec::new();
        }
        let links = inner
            .instances
            .iter()
            .flat_map(|j| {
                j.ticket_references(message)
                    .into_iter()
                    .map(|n| j.make_link(n))
                    .collect::<Vec<_>>()
            })
            .collect();
        super::dedup_in_order(links)
    }

    pub fn instances(&self) -> Vec<JiraInstanceData> {
        self.inner
            .read()
            .instances
            .iter()
            .map(|j| j.data().clone())
            .collect()
    }
}

#[async_trait]
impl Plugin for JiraLinks {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> Option<&str> {
        Some("Links ticket references to the issue tracker")
    }

    fn interesting_events(&self) -> Result<Vec<EventKind>, PluginError> {
        Ok(vec![EventKind::Privmsg, EventKind::Action])
    }

    fn implemented_commands(&self) -> Result<Vec<CommandSpec>, PluginError> {
        Ok(vec![
            CommandSpec::new("add-jira").requires("admin"),
            CommandSpec::new("list-jiras").requires("admin"),
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
        for link in self.links_for(user, text) {
            bot.address_msg(user, channel, &link, false).await?;
        }
        Ok(())
    }

    async fn run_command(&self, bot: &Bot, inv: &Invocation) -> Result<(), PluginError> {
        match inv.command.as_str() {
            "add_jira" => match parse_add(&inv.args)? {
                Some(data) => {
                    let instance = JiraInstance::new(data)?;
                    debug!(project = %instance.data().projectname, "Adding issue tracker");
                    self.inner.write().instances.push(instance);
                }
                None => {
                    bot.address_msg(&inv.user, &inv.channel, ADD_USAGE, true)
                        .await?;
                }
            },
            "list_jiras" => {
                let lines: Vec<String> = if inv.args.is_empty() {
                    self.instances()
                        .iter()
                        .map(|j| {
                            format!(
                                "{}: base_url={:?}, shortcode={:?}",
                                j.projectname, j.base_url, j.shortcode
                            )
                        })
                        .collect()
                } else {
                    vec!["usage: list-jiras".to_owned()]
                };
                for line in lines {
                    bot.address_msg(&inv.user, &inv.channel, &line, true).await?;
                }
            }
            other => return Err(PluginError::NotImplemented(other.to_owned())),
        }
        Ok(())
    }

    fn save_state(&self) -> Result<Option<serde_json::Value>, PluginError> {
        let inner = self.inner.read();
        let state = JiraState {
            link_ignore_list: inner.ignore.clone(),
            jira_instances: inner.instances.iter().map(|j| j.data().clone()).collect(),
        };
        Ok(Some(serde_json::to_value(state)?))
    }

    fn load_state(&self, state: serde_json::Value) -> Result<(), PluginError> {
        let state: JiraState = serde_json::from_value(state)?;
        let instances = state
            .jira_instances
            .into_iter()
            .map(JiraInstance::new)
            .collect::<Result<_, _>>()?;
        let mut inner = self.inner.write();
        inner.ignore = state.link_ignore_list;
        inner.instances = instances;
        Ok(())
    }
}
