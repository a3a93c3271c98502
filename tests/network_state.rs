//! Integration tests for network-state tracking through dispatched events.

mod common;

use common::{CallLog, Scripted, test_bot};
use slbot::{Event, EventKind, PluginCatalog};

async fn join_dev(bot: &slbot::Bot) {
    bot.dispatch(Event::Joined {
        channel: "#dev".to_owned(),
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn names_snapshot_is_idempotent() {
    let (bot, _transport) = test_bot(PluginCatalog::new());
    join_dev(&bot).await;

    let names = ["@alice", "+bob", "carol", "@+dave"];
    bot.names_reply("#dev", &names).await.unwrap();
    let once = {
        let net = bot.network();
        net.channel("#dev").cloned()
    };
    bot.names_reply("#dev", &names).await.unwrap();

    let net = bot.network();
    assert_eq!(net.channel("#dev").cloned(), once);
    for nick in ["alice", "bob", "carol", "dave"] {
        assert!(net.is_member("#dev", nick), "{nick} should be a member");
    }
    assert!(net.has_member_mode("#dev", "alice", 'o'));
    assert!(net.has_member_mode("#dev", "bob", 'v'));
    assert!(!net.has_member_mode("#dev", "carol", 'o'));
    assert!(net.has_member_mode("#dev", "dave", 'o'));
    assert!(net.has_member_mode("#dev", "dave", 'v'));
}

#[tokio::test]
async fn rename_carries_modes() {
    let (bot, _transport) = test_bot(PluginCatalog::new());
    join_dev(&bot).await;
    bot.names_reply("#dev", &["@alice"]).await.unwrap();

    bot.dispatch(Event::UserRenamed {
        old: "alice".to_owned(),
        new: "alice2".to_owned(),
    })
    .await
    .unwrap();

    let net = bot.network();
    assert!(net.has_member_mode("#dev", "alice2", 'o'));
    assert!(net.is_member("#dev", "alice2"));
    assert!(!net.is_member("#dev", "alice"));
    assert!(!net.knows_nick("alice"));
}

#[tokio::test]
async fn quit_forgets_the_user_everywhere() {
    let (bot, _transport) = test_bot(PluginCatalog::new());
    join_dev(&bot).await;
    bot.dispatch(Event::Joined {
        channel: "#ops".to_owned(),
    })
    .await
    .unwrap();
    bot.names_reply("#dev", &["@mallory"]).await.unwrap();
    bot.names_reply("#ops", &["mallory"]).await.unwrap();

    bot.dispatch(Event::UserQuit {
        user: "mallory!m@example.org".to_owned(),
        message: "bye".to_owned(),
    })
    .await
    .unwrap();

    let net = bot.network();
    assert!(!net.is_member("#dev", "mallory"));
    assert!(!net.is_member("#ops", "mallory"));
    assert!(!net.knows_nick("mallory"));
}

#[tokio::test]
async fn end_of_names_syncs_once() {
    let log = CallLog::default();
    let catalog =
        PluginCatalog::new().with(Scripted::new("sync", &log).on(EventKind::ChanSynced).factory());
    let (bot, _transport) = test_bot(catalog);
    common::enable_all(&bot, &["sync"]).await;
    join_dev(&bot).await;

    bot.end_of_names("#dev").await.unwrap();
    bot.end_of_names("#dev").await.unwrap();

    assert_eq!(*log.lock(), vec!["sync:chanSynced"]);
    assert!(bot.network().is_synced("#dev"));
}

#[tokio::test]
async fn channel_mode_reply_and_isupport() {
    let (bot, _transport) = test_bot(PluginCatalog::new());
    join_dev(&bot).await;

    bot.dispatch(Event::Isupport {
        options: vec!["CHANMODES=beI,k,l,imnpstc".to_owned(), "PREFIX=(qov)~@+".to_owned()],
    })
    .await
    .unwrap();
    bot.channel_mode_is("#dev", "+ntc", &[] as &[&str]).await.unwrap();
    bot.names_reply("#dev", &["~root"]).await.unwrap();

    let net = bot.network();
    assert!(net.has_channel_flag("#dev", 'n'));
    assert!(net.has_channel_flag("#dev", 't'));
    assert!(net.has_channel_flag("#dev", 'c'));
    assert!(net.has_member_mode("#dev", "root", 'q'));
}

#[tokio::test]
async fn leaving_forgets_the_channel() {
    let (bot, _transport) = test_bot(PluginCatalog::new());
    join_dev(&bot).await;
    bot.dispatch(Event::TopicUpdated {
        user: "alice".to_owned(),
        channel: "#dev".to_owned(),
        topic: "release day".to_owned(),
    })
    .await
    .unwrap();
    assert_eq!(bot.network().topic("#dev"), Some("release day"));

    bot.dispatch(Event::Left {
        channel: "#dev".to_owned(),
    })
    .await
    .unwrap();
    assert!(bot.network().channel("#dev").is_none());
}
