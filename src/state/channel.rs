//! Per-channel derived state.

use std::collections::{HashMap, HashSet};

/// What the bot knows about one channel it is in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelState {
    /// Nicknames currently in the channel.
    pub members: HashSet<String>,
    pub topic: Option<String>,
    /// Mode letters keyed by argument. Flag modes such as `+n` live under
    /// `None`, member modes such as `+o alice` under `Some("alice")`.
    pub modes: HashMap<Option<String>, HashSet<char>>,
    /// Set once the NAMES list has been fully received after a join.
    pub synced: bool,
}

impl ChannelState {
    /// Record a mode change. Setting twice is idempotent; unsetting an
    /// absent mode does nothing.
    pub fn apply_mode(&mut self, set: bool, mode: char, arg: Option<String>) {
        if set {
            self.modes.entry(arg).or_default().insert(mode);
        } else if let Some(letters) = self.modes.get_mut(&arg) {
            letters.remove(&mode);
            if letters.is_empty() {
                self.modes.remove(&arg);
            }
        }
    }

    /// Whether `mode` is set for `arg` (`None` for channel flags).
    pub fn has_mode(&self, arg: Option<&str>, mode: char) -> bool {
        self.modes
            .get(&arg.map(str::to_owned))
            .is_some_and(|letters| letters.contains(&mode))
    }

    /// Drop a member and the modes keyed by their nick.
    pub fn remove_member(&mut self, nick: &str) {
        self.members.remove(nick);
        self.modes.remove(&Some(nick.to_owned()));
    }

    /// Re-key a member, keeping their mode letters. No-op for non-members
    /// without modes.
    pub fn rename_member(&mut self, old: &str, new: &str) {
        if self.members.remove(old) {
            self.members.insert(new.to_owned());
        }
        if let Some(letters) = self.modes.remove(&Some(old.to_owned())) {
            self.modes
                .entry(Some(new.to_owned()))
                .or_default()
                .extend(letters);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_set_is_idempotent_and_unset_tolerates_absence() {
        let mut chan = ChannelState::default();
        chan.apply_mode(true, 'o', Some("alice".into()));
        chan.apply_mode(true, 'o', Some("alice".into()));
        assert_eq!(chan.modes[&Some("alice".into())].len(), 1);

        chan.apply_mode(false, 'v', Some("alice".into()));
        chan.apply_mode(false, 'o', Some("bob".into()));
        assert!(chan.has_mode(Some("alice"), 'o'));

        chan.apply_mode(false, 'o', Some("alice".into()));
        assert!(chan.modes.is_empty());
    }

    #[test]
    fn flags_live_under_none() {
        let mut chan = ChannelState::default();
        chan.apply_mode(true, 'n', None);
        chan.apply_mode(true, 't', None);
        assert!(chan.has_mode(None, 'n'));
        assert!(!chan.has_mode(Some("n"), 'n'));
    }

    #[test]
    fn rename_moves_only_existing_entries() {
        let mut chan = ChannelState::default();
        chan.members.insert("alice".into());
        chan.apply_mode(true, 'o', Some("alice".into()));

        chan.rename_member("alice", "alice2");
        assert!(chan.members.contains("alice2"));
        assert!(!chan.members.contains("alice"));
        assert!(chan.has_mode(Some("alice2"), 'o'));

        chan.rename_member("ghost", "ghost2");
        assert!(!chan.members.contains("ghost2"));
        assert!(!chan.modes.contains_key(&Some("ghost2".into())));
    }

    #[test]
    fn rename_merges_into_existing_letters() {
        let mut chan = ChannelState::default();
        chan.apply_mode(true, 'o', Some("alice".into()));
        chan.apply_mode(true, 'v', Some("alice2".into()));

        chan.rename_member("alice", "alice2");
        assert!(chan.has_mode(Some("alice2"), 'o'));
        assert!(chan.has_mode(Some("alice2"), 'v'));
        assert!(!chan.modes.contains_key(&Some("alice".into())));
    }
}
