//! The closed set of events the core dispatches to plugins.
//!
//! Every event the transport reports, and every event the core derives from
//! one (mode-change expansion, NAMES-implied modes, channel sync), is an
//! [`Event`]. Plugins subscribe by [`EventKind`].

use std::fmt;
use std::str::FromStr;

/// The name of an event, used for subscription tables and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Created,
    YourHost,
    MyInfo,
    LuserClient,
    Bounce,
    Isupport,
    LuserChannels,
    LuserOp,
    LuserMe,
    Privmsg,
    Joined,
    Left,
    ChanSynced,
    Noticed,
    ModeChanged,
    ServerModeChanged,
    ChannelModeChanged,
    SignedOn,
    KickedFrom,
    NickChanged,
    UserJoined,
    UserLeft,
    UserQuit,
    UserKicked,
    Action,
    TopicUpdated,
    UserRenamed,
    ReceivedMotd,
    Msg,
}

impl EventKind {
    /// Every event kind, in declaration order.
    pub const ALL: [EventKind; 29] = [
        Self::Created,
        Self::YourHost,
        Self::MyInfo,
        Self::LuserClient,
        Self::Bounce,
        Self::Isupport,
        Self::LuserChannels,
        Self::LuserOp,
        Self::LuserMe,
        Self::Privmsg,
        Self::Joined,
        Self::Left,
        Self::ChanSynced,
        Self::Noticed,
        Self::ModeChanged,
        Self::ServerModeChanged,
        Self::ChannelModeChanged,
        Self::SignedOn,
        Self::KickedFrom,
        Self::NickChanged,
        Self::UserJoined,
        Self::UserLeft,
        Self::UserQuit,
        Self::UserKicked,
        Self::Action,
        Self::TopicUpdated,
        Self::UserRenamed,
        Self::ReceivedMotd,
        Self::Msg,
    ];

    /// The wire-neutral event name, e.g. `"serverModeChanged"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::YourHost => "yourHost",
            Self::MyInfo => "myInfo",
            Self::LuserClient => "luserClient",
            Self::Bounce => "bounce",
            Self::Isupport => "isupport",
            Self::LuserChannels => "luserChannels",
            Self::LuserOp => "luserOp",
            Self::LuserMe => "luserMe",
            Self::Privmsg => "privmsg",
            Self::Joined => "joined",
            Self::Left => "left",
            Self::ChanSynced => "chanSynced",
            Self::Noticed => "noticed",
            Self::ModeChanged => "modeChanged",
            Self::ServerModeChanged => "serverModeChanged",
            Self::ChannelModeChanged => "channelModeChanged",
            Self::SignedOn => "signedOn",
            Self::KickedFrom => "kickedFrom",
            Self::NickChanged => "nickChanged",
            Self::UserJoined => "userJoined",
            Self::UserLeft => "userLeft",
            Self::UserQuit => "userQuit",
            Self::UserKicked => "userKicked",
            Self::Action => "action",
            Self::TopicUpdated => "topicUpdated",
            Self::UserRenamed => "userRenamed",
            Self::ReceivedMotd => "receivedMOTD",
            Self::Msg => "msg",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown event name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event name: {0}")]
pub struct UnknownEvent(pub String);

impl FromStr for EventKind {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownEvent(s.to_owned()))
    }
}

/// A protocol event, as delivered to the built-in handler and to plugins.
///
/// `user` fields carry the full `nick!user@host` identity string when the
/// transport knows it. Mode setters are `None` for changes the core derives
/// itself (NAMES prefixes, `RPL_CHANNELMODEIS`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Created {
        when: String,
    },
    YourHost {
        info: String,
    },
    MyInfo {
        server_name: String,
        version: String,
        user_modes: String,
        channel_modes: String,
    },
    LuserClient {
        info: String,
    },
    Bounce {
        info: String,
    },
    /// `RPL_ISUPPORT` tokens such as `CHANMODES=b,k,l,imnpst`.
    Isupport {
        options: Vec<String>,
    },
    LuserChannels {
        channels: u32,
    },
    LuserOp {
        ops: u32,
    },
    LuserMe {
        info: String,
    },
    Privmsg {
        user: String,
        channel: String,
        message: String,
    },
    Joined {
        channel: String,
    },
    Left {
        channel: String,
    },
    /// The NAMES list for a channel has been fully received.
    ChanSynced {
        channel: String,
    },
    Noticed {
        user: String,
        channel: String,
        message: String,
    },
    /// A mode notification with `modes.len()` letters; `args` is either
    /// empty or exactly as long as `modes`.
    ModeChanged {
        user: Option<String>,
        channel: String,
        set: bool,
        modes: String,
        args: Vec<Option<String>>,
    },
    ServerModeChanged {
        user: Option<String>,
        target: String,
        set: bool,
        mode: char,
        arg: Option<String>,
    },
    ChannelModeChanged {
        user: Option<String>,
        channel: String,
        set: bool,
        mode: char,
        arg: Option<String>,
    },
    SignedOn,
    KickedFrom {
        channel: String,
        kicker: String,
        message: String,
    },
    NickChanged {
        nick: String,
    },
    UserJoined {
        user: String,
        channel: String,
    },
    UserLeft {
        user: String,
        channel: String,
    },
    UserQuit {
        user: String,
        message: String,
    },
    UserKicked {
        kickee: String,
        channel: String,
        kicker: String,
        message: String,
    },
    Action {
        user: String,
        channel: String,
        data: String,
    },
    TopicUpdated {
        user: String,
        channel: String,
        topic: String,
    },
    UserRenamed {
        old: String,
        new: String,
    },
    ReceivedMotd {
        motd: Vec<String>,
    },
    /// An outbound message from the bot.
    Msg {
        target: String,
        text: String,
    },
}

impl Event {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Created { .. } => EventKind::Created,
            Self::YourHost { .. } => EventKind::YourHost,
            Self::MyInfo { .. } => EventKind::MyInfo,
            Self::LuserClient { .. } => EventKind::LuserClient,
            Self::Bounce { .. } => EventKind::Bounce,
            Self::Isupport { .. } => EventKind::Isupport,
            Self::LuserChannels { .. } => EventKind::LuserChannels,
            Self::LuserOp { .. } => EventKind::LuserOp,
            Self::LuserMe { .. } => EventKind::LuserMe,
            Self::Privmsg { .. } => EventKind::Privmsg,
            Self::Joined { .. } => EventKind::Joined,
            Self::Left { .. } => EventKind::Left,
            Self::ChanSynced { .. } => EventKind::ChanSynced,
            Self::Noticed { .. } => EventKind::Noticed,
            Self::ModeChanged { .. } => EventKind::ModeChanged,
            Self::ServerModeChanged { .. } => EventKind::ServerModeChanged,
            Self::ChannelModeChanged { .. } => EventKind::ChannelModeChanged,
            Self::SignedOn => EventKind::SignedOn,
            Self::KickedFrom { .. } => EventKind::KickedFrom,
            Self::NickChanged { .. } => EventKind::NickChanged,
            Self::UserJoined { .. } => EventKind::UserJoined,
            Self::UserLeft { .. } => EventKind::UserLeft,
            Self::UserQuit { .. } => EventKind::UserQuit,
            Self::UserKicked { .. } => EventKind::UserKicked,
            Self::Action { .. } => EventKind::Action,
            Self::TopicUpdated { .. } => EventKind::TopicUpdated,
            Self::UserRenamed { .. } => EventKind::UserRenamed,
            Self::ReceivedMotd { .. } => EventKind::ReceivedMotd,
            Self::Msg { .. } => EventKind::Msg,
        }
    }

    /// The channel this event concerns, if any.
    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::Privmsg { channel, .. }
            | Self::Joined { channel }
            | Self::Left { channel }
            | Self::ChanSynced { channel }
            | Self::Noticed { channel, .. }
            | Self::ModeChanged { channel, .. }
            | Self::ChannelModeChanged { channel, .. }
            | Self::KickedFrom { channel, .. }
            | Self::UserJoined { channel, .. }
            | Self::UserLeft { channel, .. }
            | Self::UserKicked { channel, .. }
            | Self::Action { channel, .. }
            | Self::TopicUpdated { channel, .. } => Some(channel),
            _ => None,
        }
    }
}
