//! Derived view of the network, maintained by the built-in handlers.
//!
//! Every method here is a plain state transition. Deciding which transitions
//! an event triggers, and which follow-up events it spawns, is the
//! dispatcher's job.

use super::channel::ChannelState;
use chrono::{DateTime, Utc};
use slbot_proto::{ChannelModeParams, Identity, NamesEntry};
use std::collections::HashMap;

/// Server details reported during registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub user_modes: Option<String>,
    pub channel_modes: Option<String>,
    /// `RPL_YOURHOST` text.
    pub daemon_info: Option<String>,
    /// `RPL_LUSERME` text.
    pub host_info: Option<String>,
}

/// Everything the core tracks about the network it is connected to.
#[derive(Debug, Clone)]
pub struct NetworkState {
    nickname: String,
    channels: HashMap<String, ChannelState>,
    server_modes: HashMap<String, HashMap<char, Option<String>>>,
    pub server: ServerInfo,
    pub mode_params: ChannelModeParams,
    signed_on_at: Option<DateTime<Utc>>,
    started_at: DateTime<Utc>,
}

impl NetworkState {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            channels: HashMap::new(),
            server_modes: HashMap::new(),
            server: ServerInfo::default(),
            mode_params: ChannelModeParams::default(),
            signed_on_at: None,
            started_at: Utc::now(),
        }
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn set_nickname(&mut self, nick: impl Into<String>) {
        self.nickname = nick.into();
    }

    pub fn is_signed_on(&self) -> bool {
        self.signed_on_at.is_some()
    }

    pub fn signed_on_at(&self) -> Option<DateTime<Utc>> {
        self.signed_on_at
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn signed_on(&mut self) {
        self.signed_on_at = Some(Utc::now());
    }

    pub fn connection_lost(&mut self) {
        self.signed_on_at = None;
    }

    pub fn channel(&self, channel: &str) -> Option<&ChannelState> {
        self.channels.get(channel)
    }

    /// Names of every channel with tracked state, sorted.
    pub fn channels(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.channels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_member(&self, channel: &str, nick: &str) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|c| c.members.contains(nick))
    }

    pub fn is_synced(&self, channel: &str) -> bool {
        self.channels.get(channel).is_some_and(|c| c.synced)
    }

    pub fn topic(&self, channel: &str) -> Option<&str> {
        self.channels.get(channel).and_then(|c| c.topic.as_deref())
    }

    /// The bot itself joined: start with an empty, unsynced member list.
    pub fn joined(&mut self, channel: &str) {
        let chan = self.channels.entry(channel.to_owned()).or_default();
        chan.members.clear();
        chan.synced = false;
    }

    /// The bot left or was kicked: forget the channel entirely.
    pub fn left(&mut self, channel: &str) {
        self.channels.remove(channel);
    }

    pub fn user_joined(&mut self, user: &str, channel: &str) {
        self.channels
            .entry(channel.to_owned())
            .or_default()
            .members
            .insert(Identity::nick_of(user).to_owned());
    }

    pub fn user_left(&mut self, user: &str, channel: &str) {
        if let Some(chan) = self.channels.get_mut(channel) {
            chan.remove_member(Identity::nick_of(user));
        }
    }

    /// Remove a quitting user from every channel and from server modes.
    pub fn user_quit(&mut self, user: &str) {
        let nick = Identity::nick_of(user);
        for chan in self.channels.values_mut() {
            chan.remove_member(nick);
        }
        self.server_modes.remove(nick);
    }

    /// Re-key a renamed user everywhere; their modes carry over.
    pub fn user_renamed(&mut self, old: &str, new: &str) {
        let (old, new) = (Identity::nick_of(old), Identity::nick_of(new));
        for chan in self.channels.values_mut() {
            chan.rename_member(old, new);
        }
        if let Some(modes) = self.server_modes.remove(old) {
            self.server_modes
                .entry(new.to_owned())
                .or_default()
                .extend(modes);
        }
    }

    pub fn topic_updated(&mut self, channel: &str, topic: &str) {
        self.channels.entry(channel.to_owned()).or_default().topic = Some(topic.to_owned());
    }

    /// Mark a channel synced. Returns `true` only on the unsynced to synced
    /// transition.
    pub fn chan_synced(&mut self, channel: &str) -> bool {
        let chan = self.channels.entry(channel.to_owned()).or_default();
        !std::mem::replace(&mut chan.synced, true)
    }

    /// Add NAMES members. Prefix modes are applied separately as mode events.
    pub fn names_reply(&mut self, channel: &str, entries: &[NamesEntry]) {
        let chan = self.channels.entry(channel.to_owned()).or_default();
        chan.members
            .extend(entries.iter().map(|entry| entry.nick.clone()));
    }

    pub fn server_mode_changed(&mut self, target: &str, set: bool, mode: char, arg: Option<String>) {
        let nick = Identity::nick_of(target);
        if set {
            self.server_modes
                .entry(nick.to_owned())
                .or_default()
                .insert(mode, arg);
        } else if let Some(modes) = self.server_modes.get_mut(nick) {
            modes.remove(&mode);
            if modes.is_empty() {
                self.server_modes.remove(nick);
            }
        }
    }

    pub fn channel_mode_changed(&mut self, channel: &str, set: bool, mode: char, arg: Option<String>) {
        if set {
            self.channels
                .entry(channel.to_owned())
                .or_default()
                .apply_mode(true, mode, arg);
        } else if let Some(chan) = self.channels.get_mut(channel) {
            chan.apply_mode(false, mode, arg);
        }
    }

    /// Server-scope modes of `nick`.
    pub fn server_modes(&self, nick: &str) -> Option<&HashMap<char, Option<String>>> {
        self.server_modes.get(nick)
    }

    /// Whether `nick` holds member mode `mode` in `channel`.
    pub fn has_member_mode(&self, channel: &str, nick: &str, mode: char) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|c| c.has_mode(Some(nick), mode))
    }

    pub fn has_channel_flag(&self, channel: &str, mode: char) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|c| c.has_mode(None, mode))
    }

    /// Whether any state, channel or server scope, still mentions `nick`.
    pub fn knows_nick(&self, nick: &str) -> bool {
        let key = Some(nick.to_owned());
        self.server_modes.contains_key(nick)
            || self
                .channels
                .values()
                .any(|c| c.members.contains(nick) || c.modes.contains_key(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slbot_proto::parse_names;

    fn joined(chan: &str) -> NetworkState {
        let mut net = NetworkState::new("slbot");
        net.joined(chan);
        net
    }

    #[test]
    fn join_resets_membership_and_sync() {
        let mut net = joined("#dev");
        net.user_joined("alice!a@h", "#dev");
        assert!(net.chan_synced("#dev"));
        net.joined("#dev");
        assert!(!net.is_member("#dev", "alice"));
        assert!(!net.is_synced("#dev"));
    }

    #[test]
    fn chan_synced_fires_once() {
        let mut net = joined("#dev");
        assert!(net.chan_synced("#dev"));
        assert!(!net.chan_synced("#dev"));
        assert!(net.is_synced("#dev"));
    }

    #[test]
    fn left_purges_everything() {
        let mut net = joined("#dev");
        net.user_joined("alice", "#dev");
        net.topic_updated("#dev", "hello");
        net.channel_mode_changed("#dev", true, 'n', None);
        net.left("#dev");
        assert!(net.channel("#dev").is_none());
        assert!(net.channels().is_empty());
    }

    #[test]
    fn departure_removes_member_and_modes() {
        let mut net = joined("#dev");
        net.user_joined("alice!a@h", "#dev");
        net.channel_mode_changed("#dev", true, 'o', Some("alice".into()));
        net.user_left("alice!a@h", "#dev");
        assert!(!net.is_member("#dev", "alice"));
        assert!(!net.has_member_mode("#dev", "alice", 'o'));
    }

    #[test]
    fn quit_clears_every_channel_and_server_modes() {
        let mut net = joined("#a");
        net.joined("#b");
        net.user_joined("bob", "#a");
        net.user_joined("bob", "#b");
        net.server_mode_changed("bob", true, 'i', None);
        net.user_quit("bob!b@h");
        assert!(!net.knows_nick("bob"));
    }

    #[test]
    fn rename_preserves_modes() {
        let mut net = joined("#dev");
        net.user_joined("alice", "#dev");
        net.channel_mode_changed("#dev", true, 'o', Some("alice".into()));
        net.server_mode_changed("alice", true, 'i', None);

        net.user_renamed("alice", "alice2");

        assert!(net.is_member("#dev", "alice2"));
        assert!(net.has_member_mode("#dev", "alice2", 'o'));
        assert_eq!(net.server_modes("alice2").map(|m| m.contains_key(&'i')), Some(true));
        assert!(!net.knows_nick("alice"));
    }

    #[test]
    fn rename_merges_server_modes() {
        let mut net = NetworkState::new("slbot");
        net.server_mode_changed("alice", true, 'i', None);
        net.server_mode_changed("alice2", true, 'w', None);

        net.user_renamed("alice", "alice2");

        let modes = net.server_modes("alice2").cloned().unwrap_or_default();
        assert!(modes.contains_key(&'i'));
        assert!(modes.contains_key(&'w'));
        assert!(net.server_modes("alice").is_none());
    }

    #[test]
    fn server_mode_unset_on_unknown_user_is_noop() {
        let mut net = NetworkState::new("slbot");
        net.server_mode_changed("ghost", false, 'i', None);
        assert!(net.server_modes("ghost").is_none());
    }

    #[test]
    fn names_snapshot_is_idempotent() {
        let table = ChannelModeParams::default();
        let entries = parse_names(["@alice", "+bob", "carol"], &table);
        let mut once = joined("#dev");
        once.names_reply("#dev", &entries);
        let mut twice = once.clone();
        twice.names_reply("#dev", &entries);
        assert_eq!(once.channel("#dev"), twice.channel("#dev"));
        assert_eq!(once.channel("#dev").map(|c| c.members.len()), Some(3));
    }

    #[test]
    fn signed_on_flag_tracks_connection() {
        let mut net = NetworkState::new("slbot");
        assert!(!net.is_signed_on());
        net.signed_on();
        assert!(net.is_signed_on());
        assert!(net.signed_on_at() >= Some(net.started_at()));
        net.connection_lost();
        assert!(!net.is_signed_on());
    }
}
