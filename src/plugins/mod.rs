//! Bundled plugins.
//!
//! - [`admin`]: plugin management and privilege grants
//! - [`jira`]: issue-tracker links for ticket references
//! - [`regex_responder`]: canned replies to matching messages
//! - [`bot_logger`]: chat transcript on the `irclog` tracing target
//! - [`logs`]: points people at the published logs
//! - [`zendesk`]: support-ticket links

pub mod admin;
pub mod bot_logger;
pub mod jira;
pub mod logs;
pub mod regex_responder;
pub mod zendesk;

use crate::plugin::{PluginCatalog, PluginError};
use serde::de::DeserializeOwned;
use slbot_proto::Mask;

/// Every bundled plugin, in delivery order.
pub fn catalog() -> PluginCatalog {
    PluginCatalog::new()
        .with(bot_logger::factory())
        .with(admin::factory())
        .with(jira::factory())
        .with(regex_responder::factory())
        .with(logs::factory())
        .with(zendesk::factory())
}

/// Deserialize a plugin's `[plugins.<name>]` table.
pub(crate) fn settings<T: DeserializeOwned>(config: &toml::Table) -> Result<T, PluginError> {
    Ok(toml::Value::Table(config.clone()).try_into()?)
}

/// Whether `user` matches any mask in `ignore`.
pub(crate) fn ignored(ignore: &[Mask], user: &str) -> bool {
    ignore.iter().any(|m| m.matches_str(user))
}

/// Drop repeats, keeping first occurrences in order.
pub(crate) fn dedup_in_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_bundled_plugins() {
        let names: Vec<_> = catalog().names().map(str::to_owned).collect();
        assert_eq!(
            names,
            vec!["bot_logger", "admin", "jira", "regex_responder", "logs", "zendesk"]
        );
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let items = vec!["b".into(), "a".into(), "b".into(), "c".into(), "a".into()];
        assert_eq!(dedup_in_order(items), vec!["b", "a", "c"]);
    }

    #[test]
    fn ignore_masks() {
        let ignore = vec![Mask::parse("*!*@bots.example.org")];
        assert!(ignored(&ignore, "feedbot!fb@bots.example.org"));
        assert!(!ignored(&ignore, "alice!a@example.org"));
    }
}
