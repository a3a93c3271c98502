//! slbot - Straylight chat bot
//!
//! Console harness: reads lines from stdin as private messages to the bot
//! and prints what it sends back.

use anyhow::Context;
use slbot::config::{self, Config, PrivilegeGrant};
use slbot::console::ConsoleTransport;
use slbot::{Bot, BotSettings, Event, PluginRegistry, plugins};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Identity attached to lines typed at the console.
const CONSOLE_USER: &str = "console!console@localhost";

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.bot.log_filter.as_deref().unwrap_or("info"))
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if config.bot.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Config grants are added on top of whatever the state file held.
fn apply_grants(bot: &Bot, grants: &[PrivilegeGrant]) {
    let mut auth = bot.privileges().write();
    for grant in grants {
        for mask in &grant.masks {
            match &grant.channel {
                Some(channel) => auth.grant_in(channel, mask.as_str(), &grant.capability),
                None => auth.grant(mask.as_str(), &grant.capability),
            };
        }
    }
}

async fn feed_line(bot: &Bot, line: String) {
    if line.trim().is_empty() {
        return;
    }
    let event = Event::Privmsg {
        user: CONSOLE_USER.to_owned(),
        channel: bot.nickname(),
        message: line,
    };
    match bot.dispatch(event).await {
        Ok(dispatched) => dispatched.join_command().await,
        Err(e) => warn!(error = %e, code = e.error_code(), "Dispatch failed"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "slbot.toml".to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    init_tracing(&config);

    if let Err(problems) = config::validate(&config) {
        for problem in &problems {
            error!(path = %config_path, problem = %problem, "Invalid configuration");
        }
        anyhow::bail!("{} configuration problem(s) in {config_path}", problems.len());
    }

    info!(nick = %config.bot.nickname, "Starting slbot");

    let registry = PluginRegistry::new(plugins::catalog(), config.plugins.settings.clone());
    let settings = BotSettings {
        nickname: config.bot.nickname.clone(),
        channels: config.bot.channels.clone(),
        command_prefix: config.bot.command_prefix.clone(),
    };
    let bot = Bot::new(settings, registry, Arc::new(ConsoleTransport::stdout()));

    let state_file = config.bot.state_file.clone();
    if !bot.load_state(&state_file) {
        for name in &config.plugins.enabled {
            bot.enable_logged(name);
        }
    }
    apply_grants(&bot, &config.privileges);

    bot.start().await.context("sign-on failed")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => feed_line(&bot, line).await,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Reading stdin failed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    bot.save_state(&state_file)
        .with_context(|| format!("failed to save state to {}", state_file.display()))?;
    info!("Shut down");
    Ok(())
}
