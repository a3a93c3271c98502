//! Integration test common infrastructure.
//!
//! Provides a recording transport, scripted plugins and a bot builder for
//! driving the core without a network connection.

pub mod plugins;
pub mod transport;

#[allow(unused_imports)]
pub use plugins::{CallLog, Scripted};
#[allow(unused_imports)]
pub use transport::{RecordingTransport, Sent};

use slbot::{Bot, BotSettings, PluginCatalog, PluginRegistry};
use std::collections::HashMap;
use std::sync::Arc;

/// Full identity used for "someone in the channel".
#[allow(dead_code)]
pub const ALICE: &str = "alice!alice@users.example.org";

/// A bot named `slbot` in `#dev` with prefix `!`, wired to a recording
/// transport.
#[allow(dead_code)]
pub fn test_bot(catalog: PluginCatalog) -> (Bot, Arc<RecordingTransport>) {
    test_bot_with_config(catalog, HashMap::new())
}

#[allow(dead_code)]
pub fn test_bot_with_config(
    catalog: PluginCatalog,
    config: HashMap<String, toml::Table>,
) -> (Bot, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let settings = BotSettings {
        nickname: "slbot".to_owned(),
        channels: vec!["#dev".to_owned()],
        command_prefix: Some("!".to_owned()),
    };
    let bot = Bot::new(settings, PluginRegistry::new(catalog, config), transport.clone());
    (bot, transport)
}

/// Enable `names`, panicking if any fails to load.
#[allow(dead_code)]
pub async fn enable_all(bot: &Bot, names: &[&str]) {
    for name in names {
        bot.registry()
            .enable(name)
            .await
            .unwrap_or_else(|e| panic!("enabling {name}: {e}"));
    }
}

/// Feed a channel message and wait for any command it triggered.
#[allow(dead_code)]
pub async fn say(bot: &Bot, user: &str, channel: &str, message: &str) {
    let dispatched = bot
        .dispatch(slbot::Event::Privmsg {
            user: user.to_owned(),
            channel: channel.to_owned(),
            message: message.to_owned(),
        })
        .await
        .expect("privmsg dispatch failed");
    dispatched.join_command().await;
}
