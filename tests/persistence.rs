//! Integration tests for saving and restoring bot state.

mod common;

use common::{ALICE, say, test_bot};
use slbot::plugins;
use slbot::{BotSettings, StateRecord};

#[tokio::test]
async fn save_then_load_restores_everything() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slbot.state.json");

    let (bot, _transport) = test_bot(plugins::catalog());
    common::enable_all(&bot, &["admin", "jira"]).await;
    {
        let mut auth = bot.privileges().write();
        auth.grant("alice!*@*", "admin");
        auth.grant("admin", "jira_admin");
        auth.grant_in("#dev", "bob!*@*", "log_blacklist_admin");
    }
    say(&bot, ALICE, "#dev", "!add-jira http://x.example PROJ").await;
    // pending plugins are persisted by name too
    drop(bot.registry().enable("later"));

    bot.save_state(&path).unwrap();
    assert!(bot.registry().enabled_names().is_empty());

    let (restored, transport) = test_bot(plugins::catalog());
    restored.set_settings(BotSettings {
        nickname: "other".into(),
        channels: Vec::new(),
        command_prefix: None,
    });
    assert!(restored.load_state(&path));

    assert_eq!(restored.settings().nickname, "slbot");
    assert_eq!(restored.settings().channels, vec!["#dev"]);
    assert_eq!(restored.nickname(), "slbot");
    assert_eq!(restored.registry().enabled_names(), vec!["admin", "jira", "later"]);
    assert!(restored.registry().get("jira").is_some());
    assert!(restored.user_has(ALICE, "admin"));
    assert!(restored.user_has_in("#dev", "bob!b@example.org", "log_blacklist_admin"));

    say(&restored, "carol!c@example.org", "#dev", "PROJ-7 is fixed").await;
    assert_eq!(
        transport.texts_to("#dev"),
        vec!["http://x.example/browse/PROJ-7"]
    );
}

#[tokio::test]
async fn missing_or_corrupt_state_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let (bot, _transport) = test_bot(plugins::catalog());

    assert!(!bot.load_state(&path));

    std::fs::write(&path, "{ definitely not json").unwrap();
    assert!(!bot.load_state(&path));
    assert_eq!(bot.settings().nickname, "slbot");
    assert!(bot.registry().enabled_names().is_empty());
}

#[tokio::test]
async fn saved_record_is_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let (bot, _transport) = test_bot(plugins::catalog());
    common::enable_all(&bot, &["logs"]).await;

    bot.save_state(&path).unwrap();
    let record = StateRecord::read(&path).unwrap().unwrap();
    assert_eq!(record.nickname, "slbot");
    assert_eq!(record.command_prefix.as_deref(), Some("!"));
    assert_eq!(record.plugins_enabled, vec!["logs"]);
    assert!(record.plugin_state.is_empty());
}
