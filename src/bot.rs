//! The dispatch core.
//!
//! [`Bot::dispatch`] runs the built-in handler for an event (state tracking
//! and the few outbound actions the core performs itself), dispatches any
//! events the built-in derived, then hands the event to every subscribed
//! plugin in registry order. Plugin failures are logged and skipped.

use crate::command::command_text;
use crate::error::BotError;
use crate::event::{Event, EventKind};
use crate::privilege::AuthMap;
use crate::registry::PluginRegistry;
use crate::state::NetworkState;
use crate::transport::Transport;
use futures_util::FutureExt;
use parking_lot::{RwLock, RwLockReadGuard};
use slbot_proto::{
    ChannelExt, Identity, ModeChange, pair_mode_args, parse_channel_modes, parse_names,
};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, debug_span, error, info, warn};

/// Settings that persist across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotSettings {
    pub nickname: String,
    /// Channels joined on sign-on.
    pub channels: Vec<String>,
    pub command_prefix: Option<String>,
}

/// What a dispatch did.
#[derive(Debug, Default)]
pub struct Dispatched {
    /// Command handling spawned by a `privmsg`, if the message was a command.
    pub command: Option<JoinHandle<()>>,
    /// Plugins that handled the event without error.
    pub delivered: usize,
    /// Plugins that returned an error or panicked.
    pub failed: usize,
}

impl Dispatched {
    /// Wait for spawned command handling, if any.
    pub async fn join_command(self) {
        if let Some(handle) = self.command {
            if let Err(e) = handle.await {
                error!(error = %e, "Command task failed");
            }
        }
    }
}

#[derive(Default)]
struct Builtin {
    follow_ups: Vec<Event>,
    command: Option<JoinHandle<()>>,
}

struct Inner {
    settings: RwLock<BotSettings>,
    network: RwLock<NetworkState>,
    auth: RwLock<AuthMap>,
    registry: PluginRegistry,
    transport: Arc<dyn Transport>,
}

/// Handle to the bot core. Cheap to clone.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<Inner>,
}

type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Result<Dispatched, BotError>> + Send + 'a>>;

impl Bot {
    pub fn new(settings: BotSettings, registry: PluginRegistry, transport: Arc<dyn Transport>) -> Self {
        let network = NetworkState::new(settings.nickname.clone());
        Self {
            inner: Arc::new(Inner {
                settings: RwLock::new(settings),
                network: RwLock::new(network),
                auth: RwLock::new(AuthMap::new()),
                registry,
                transport,
            }),
        }
    }

    /// The bot's current nickname on the network.
    pub fn nickname(&self) -> String {
        self.inner.network.read().nickname().to_owned()
    }

    pub fn settings(&self) -> BotSettings {
        self.inner.settings.read().clone()
    }

    /// Replace the persisted settings. The live nickname follows.
    pub fn set_settings(&self, settings: BotSettings) {
        self.inner.network.write().set_nickname(settings.nickname.clone());
        *self.inner.settings.write() = settings;
    }

    /// Read access to tracked network state. Do not hold across `.await`.
    pub fn network(&self) -> RwLockReadGuard<'_, NetworkState> {
        self.inner.network.read()
    }

    /// The privilege maps. Do not hold a guard across `.await`.
    pub fn privileges(&self) -> &RwLock<AuthMap> {
        &self.inner.auth
    }

    pub fn user_has(&self, user: &str, capability: &str) -> bool {
        self.inner.auth.read().holds(user, capability)
    }

    pub fn user_has_in(&self, channel: &str, user: &str, capability: &str) -> bool {
        self.inner.auth.read().holds_in(channel, user, capability)
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.inner.registry
    }

    /// Sign on: dispatches `signedOn`, which joins the configured channels.
    pub async fn start(&self) -> Result<Dispatched, BotError> {
        info!(nick = %self.nickname(), "Signing on");
        self.dispatch(Event::SignedOn).await
    }

    /// Dispatch one event to the built-in handler and then to subscribers.
    ///
    /// Returns an error only if the built-in handling failed. Subscribers
    /// still see the event in that case.
    pub async fn dispatch(&self, event: Event) -> Result<Dispatched, BotError> {
        self.dispatch_boxed(event).await
    }

    fn dispatch_boxed(&self, event: Event) -> DispatchFuture<'_> {
        Box::pin(async move {
            let kind = event.kind();
            let span = debug_span!("bot.dispatch", event = kind.as_str());

            let builtin = self.builtin(&event).instrument(span.clone()).await;
            let (builtin, result) = match builtin {
                Ok(b) => (b, Ok(())),
                Err(e) => (Builtin::default(), Err(e)),
            };

            let mut result = result;
            for follow_up in builtin.follow_ups {
                let follow_kind = follow_up.kind();
                if let Err(e) = self.dispatch_boxed(follow_up).await {
                    warn!(event = follow_kind.as_str(), error = %e, "Derived event failed");
                    if result.is_ok() {
                        result = Err(BotError::FollowUp {
                            event: follow_kind.as_str(),
                            source: Box::new(e),
                        });
                    }
                }
            }

            let (delivered, failed) = self.fan_out(&event).instrument(span).await;

            result.map(|()| Dispatched {
                command: builtin.command,
                delivered,
                failed,
            })
        })
    }

    async fn fan_out(&self, event: &Event) -> (usize, usize) {
        let kind = event.kind();
        let subscribers = self.inner.registry.tables().subscribers(kind).to_vec();
        let (mut delivered, mut failed) = (0, 0);

        for plugin in subscribers {
            let outcome = AssertUnwindSafe(plugin.on_event(self, event))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    failed += 1;
                    warn!(
                        plugin = %plugin.name(),
                        event = kind.as_str(),
                        error = %e,
                        code = e.error_code(),
                        "Plugin failed handling event"
                    );
                }
                Err(_) => {
                    failed += 1;
                    error!(plugin = %plugin.name(), event = kind.as_str(), "Plugin panicked handling event");
                }
            }
        }
        (delivered, failed)
    }

    async fn builtin(&self, event: &Event) -> Result<Builtin, BotError> {
        let mut out = Builtin::default();
        match event {
            Event::MyInfo {
                server_name,
                version,
                user_modes,
                channel_modes,
            } => {
                let mut net = self.inner.network.write();
                net.server.name = Some(server_name.clone());
                net.server.version = Some(version.clone());
                net.server.user_modes = Some(user_modes.clone());
                net.server.channel_modes = Some(channel_modes.clone());
            }
            Event::YourHost { info } => {
                self.inner.network.write().server.daemon_info = Some(info.clone());
            }
            Event::LuserMe { info } => {
                self.inner.network.write().server.host_info = Some(info.clone());
            }
            Event::Isupport { options } => {
                if self.inner.network.write().mode_params.apply_isupport(options.as_slice()) {
                    debug!("Channel mode parameters updated from ISUPPORT");
                }
            }
            Event::Privmsg {
                user,
                channel,
                message,
            } => {
                let line = {
                    let settings = self.inner.settings.read();
                    let net = self.inner.network.read();
                    command_text(net.nickname(), settings.command_prefix.as_deref(), channel, message)
                        .map(str::to_owned)
                };
                if let Some(line) = line {
                    let bot = self.clone();
                    let (user, channel) = (user.clone(), channel.clone());
                    out.command = Some(tokio::spawn(async move {
                        bot.handle_command_line(&user, &channel, &line).await;
                    }));
                }
            }
            Event::Joined { channel } => {
                self.inner.network.write().joined(channel);
                self.inner.transport.request_channel_mode(channel).await?;
            }
            Event::Left { channel } | Event::KickedFrom { channel, .. } => {
                self.inner.network.write().left(channel);
            }
            Event::ChanSynced { channel } => {
                self.inner.network.write().chan_synced(channel);
            }
            Event::ModeChanged {
                user,
                channel,
                set,
                modes,
                args,
            } => match pair_mode_args(modes, args) {
                Ok(pairs) => {
                    let server_scope = !channel.is_channel_name()
                        || user.as_deref().map(Identity::nick_of) == Some(channel.as_str());
                    out.follow_ups = pairs
                        .into_iter()
                        .map(|(mode, arg)| {
                            if server_scope {
                                Event::ServerModeChanged {
                                    user: user.clone(),
                                    target: channel.clone(),
                                    set: *set,
                                    mode,
                                    arg,
                                }
                            } else {
                                Event::ChannelModeChanged {
                                    user: user.clone(),
                                    channel: channel.clone(),
                                    set: *set,
                                    mode,
                                    arg,
                                }
                            }
                        })
                        .collect();
                }
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Discarding mode change");
                }
            },
            Event::ServerModeChanged {
                target,
                set,
                mode,
                arg,
                ..
            } => {
                self.inner
                    .network
                    .write()
                    .server_mode_changed(target, *set, *mode, arg.clone());
            }
            Event::ChannelModeChanged {
                channel,
                set,
                mode,
                arg,
                ..
            } => {
                self.inner
                    .network
                    .write()
                    .channel_mode_changed(channel, *set, *mode, arg.clone());
            }
            Event::SignedOn => {
                let channels = {
                    self.inner.network.write().signed_on();
                    self.inner.settings.read().channels.clone()
                };
                for channel in channels {
                    debug!(channel = %channel, "Joining");
                    self.inner.transport.join(&channel).await?;
                }
            }
            Event::NickChanged { nick } => {
                self.inner.network.write().set_nickname(nick.clone());
            }
            Event::UserJoined { user, channel } => {
                self.inner.network.write().user_joined(user, channel);
            }
            Event::UserLeft { user, channel } => {
                self.inner.network.write().user_left(user, channel);
            }
            Event::UserKicked {
                kickee, channel, ..
            } => {
                self.inner.network.write().user_left(kickee, channel);
            }
            Event::UserQuit { user, .. } => {
                self.inner.network.write().user_quit(user);
            }
            Event::TopicUpdated { channel, topic, .. } => {
                self.inner.network.write().topic_updated(channel, topic);
            }
            Event::UserRenamed { old, new } => {
                self.inner.network.write().user_renamed(old, new);
            }
            Event::Msg { target, text } => {
                self.inner.transport.send_message(target, text).await?;
            }
            Event::Created { .. }
            | Event::LuserClient { .. }
            | Event::Bounce { .. }
            | Event::LuserChannels { .. }
            | Event::LuserOp { .. }
            | Event::Noticed { .. }
            | Event::Action { .. }
            | Event::ReceivedMotd { .. } => {}
        }
        Ok(out)
    }

    /// Ingest one `RPL_NAMREPLY` line: prefixed names become `modeChanged`
    /// events, then every name joins the member list.
    pub async fn names_reply<S: AsRef<str>>(&self, channel: &str, names: &[S]) -> Result<(), BotError> {
        let entries = {
            let net = self.inner.network.read();
            parse_names(names, &net.mode_params)
        };
        for entry in &entries {
            for mode in &entry.modes {
                self.dispatch(Event::ModeChanged {
                    user: None,
                    channel: channel.to_owned(),
                    set: true,
                    modes: mode.to_string(),
                    args: vec![Some(entry.nick.clone())],
                })
                .await?;
            }
        }
        self.inner.network.write().names_reply(channel, &entries);
        Ok(())
    }

    /// `RPL_ENDOFNAMES`: dispatch `chanSynced` unless already synced.
    pub async fn end_of_names(&self, channel: &str) -> Result<(), BotError> {
        let synced = self.inner.network.read().is_synced(channel);
        if !synced {
            self.dispatch(Event::ChanSynced {
                channel: channel.to_owned(),
            })
            .await?;
        }
        Ok(())
    }

    /// `RPL_CHANNELMODEIS`: one `modeChanged` event per decoded mode.
    pub async fn channel_mode_is<S: AsRef<str>>(
        &self,
        channel: &str,
        modes: &str,
        params: &[S],
    ) -> Result<(), BotError> {
        let decoded = {
            let net = self.inner.network.read();
            parse_channel_modes(modes, params, &net.mode_params)
        };
        let changes = match decoded {
            Ok(changes) => changes,
            Err(e) => {
                warn!(channel, modes, error = %e, "Discarding channel mode reply");
                return Ok(());
            }
        };
        for ModeChange { set, mode, arg } in changes {
            self.dispatch(Event::ModeChanged {
                user: None,
                channel: channel.to_owned(),
                set,
                modes: mode.to_string(),
                args: vec![arg],
            })
            .await?;
        }
        Ok(())
    }

    /// The connection dropped.
    pub fn connection_lost(&self, reason: &str) {
        info!(reason, "Connection lost");
        self.inner.network.write().connection_lost();
    }

    /// Send a message through the `msg` event, so subscribers see it.
    pub async fn msg(&self, target: &str, text: &str) -> Result<(), BotError> {
        self.dispatch(Event::Msg {
            target: target.to_owned(),
            text: text.to_owned(),
        })
        .await
        .map(|_| ())
    }

    /// Reply to `user` where they spoke.
    ///
    /// Private messages are answered privately; channel replies are prefixed
    /// with `nick: ` unless `prefix` is false. Each line of `text` is sent as
    /// its own message.
    pub async fn address_msg(
        &self,
        user: &str,
        channel: &str,
        text: &str,
        prefix: bool,
    ) -> Result<(), BotError> {
        let nick = Identity::nick_of(user);
        let private = channel == self.nickname();
        let target = if private { nick } else { channel };
        for line in text.split('\n') {
            if private || !prefix {
                self.msg(target, line).await?;
            } else {
                self.msg(target, &format!("{nick}: {line}")).await?;
            }
        }
        Ok(())
    }

    /// Subscribers of `kind`, by name, in delivery order.
    pub fn subscribers(&self, kind: EventKind) -> Vec<String> {
        self.inner.registry.tables().subscriber_names(kind)
    }
}
