//! Integration tests for event delivery: ordering, fault isolation and
//! derived events.

mod common;

use common::{CallLog, Scripted, Sent, test_bot};
use slbot::{BotError, Event, EventKind, PluginCatalog};

fn three_subscribers(log: &CallLog) -> PluginCatalog {
    PluginCatalog::new()
        .with(Scripted::new("first", log).on(EventKind::UserJoined).factory())
        .with(
            Scripted::new("second", log)
                .on(EventKind::UserJoined)
                .failing()
                .factory(),
        )
        .with(Scripted::new("third", log).on(EventKind::UserJoined).factory())
}

fn joined(user: &str) -> Event {
    Event::UserJoined {
        user: user.to_owned(),
        channel: "#dev".to_owned(),
    }
}

#[tokio::test]
async fn failing_subscriber_does_not_stop_the_others() {
    let log = CallLog::default();
    let (bot, _transport) = test_bot(three_subscribers(&log));
    common::enable_all(&bot, &["first", "second", "third"]).await;

    let dispatched = bot.dispatch(joined("bob!b@example.org")).await.unwrap();

    assert_eq!(dispatched.delivered, 2);
    assert_eq!(dispatched.failed, 1);
    assert_eq!(
        *log.lock(),
        vec!["first:userJoined", "second:userJoined", "third:userJoined"]
    );
    assert!(bot.network().is_member("#dev", "bob"));
}

#[tokio::test]
async fn panicking_subscriber_is_isolated() {
    let log = CallLog::default();
    let catalog = PluginCatalog::new()
        .with(Scripted::new("boom", &log).on(EventKind::UserJoined).panicking().factory())
        .with(Scripted::new("after", &log).on(EventKind::UserJoined).factory());
    let (bot, _transport) = test_bot(catalog);
    common::enable_all(&bot, &["boom", "after"]).await;

    let dispatched = bot.dispatch(joined("bob")).await.unwrap();
    assert_eq!((dispatched.delivered, dispatched.failed), (1, 1));
    assert_eq!(*log.lock(), vec!["boom:userJoined", "after:userJoined"]);
}

#[tokio::test]
async fn delivery_follows_catalog_order_not_enable_order() {
    let log = CallLog::default();
    let (bot, _transport) = test_bot(three_subscribers(&log));
    common::enable_all(&bot, &["third", "first"]).await;

    bot.dispatch(joined("bob")).await.unwrap();
    assert_eq!(*log.lock(), vec!["first:userJoined", "third:userJoined"]);
    assert_eq!(bot.subscribers(EventKind::UserJoined), vec!["first", "third"]);
}

#[tokio::test]
async fn builtin_failure_still_reaches_plugins() {
    let log = CallLog::default();
    let catalog = PluginCatalog::new().with(Scripted::new("watcher", &log).on(EventKind::Msg).factory());
    let (bot, transport) = test_bot(catalog);
    common::enable_all(&bot, &["watcher"]).await;

    transport.disconnect();
    let err = bot.msg("#dev", "hello").await.unwrap_err();
    assert!(matches!(err, BotError::Transport(_)));
    assert_eq!(*log.lock(), vec!["watcher:msg"]);
}

#[tokio::test]
async fn sign_on_joins_configured_channels() {
    let (bot, transport) = test_bot(PluginCatalog::new());
    bot.start().await.unwrap();
    assert!(bot.network().is_signed_on());
    assert_eq!(transport.sent(), vec![Sent::Join("#dev".to_owned())]);

    bot.dispatch(Event::Joined {
        channel: "#dev".to_owned(),
    })
    .await
    .unwrap();
    assert_eq!(transport.sent().last(), Some(&Sent::ModeQuery("#dev".to_owned())));
}

#[tokio::test]
async fn mode_changes_fan_out_per_mode() {
    let log = CallLog::default();
    let catalog = PluginCatalog::new().with(
        Scripted::new("modes", &log)
            .on(EventKind::ModeChanged)
            .on(EventKind::ChannelModeChanged)
            .on(EventKind::ServerModeChanged)
            .factory(),
    );
    let (bot, _transport) = test_bot(catalog);
    common::enable_all(&bot, &["modes"]).await;

    bot.dispatch(Event::ModeChanged {
        user: Some("op!o@example.org".to_owned()),
        channel: "#dev".to_owned(),
        set: true,
        modes: "ov".to_owned(),
        args: vec![Some("alice".to_owned()), Some("bob".to_owned())],
    })
    .await
    .unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "modes:channelModeChanged",
            "modes:channelModeChanged",
            "modes:modeChanged"
        ]
    );
    let net = bot.network();
    assert!(net.has_member_mode("#dev", "alice", 'o'));
    assert!(net.has_member_mode("#dev", "bob", 'v'));
}

#[tokio::test]
async fn user_mode_changes_are_server_scope() {
    let (bot, _transport) = test_bot(PluginCatalog::new());
    bot.dispatch(Event::ModeChanged {
        user: Some("slbot!bot@example.org".to_owned()),
        channel: "slbot".to_owned(),
        set: true,
        modes: "i".to_owned(),
        args: Vec::new(),
    })
    .await
    .unwrap();

    let net = bot.network();
    assert!(net.server_modes("slbot").is_some_and(|m| m.contains_key(&'i')));
}

#[tokio::test]
async fn mismatched_mode_args_are_dropped() {
    let (bot, _transport) = test_bot(PluginCatalog::new());
    bot.dispatch(Event::ModeChanged {
        user: None,
        channel: "#dev".to_owned(),
        set: true,
        modes: "ov".to_owned(),
        args: vec![Some("alice".to_owned())],
    })
    .await
    .unwrap();
    assert!(!bot.network().has_member_mode("#dev", "alice", 'o'));
}
