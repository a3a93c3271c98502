//! `RPL_NAMREPLY` token parsing.

use crate::identity::Identity;
use crate::mode::ChannelModeParams;

/// One member listed in a NAMES reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamesEntry {
    /// The member's nickname.
    pub nick: String,
    /// Mode letters implied by the member's prefix symbols, in listed order.
    pub modes: Vec<char>,
}

/// Split NAMES tokens into nicknames and their prefix modes.
///
/// Leading prefix symbols are looked up in `table`; several may be stacked
/// (`@+alice`). A `nick!user@host` token contributes only its nick. Empty
/// tokens are skipped.
///
/// ```
/// use slbot_proto::{parse_names, ChannelModeParams};
///
/// let entries = parse_names(["@alice", "+bob", "carol"], &ChannelModeParams::default());
/// assert_eq!(entries[0].modes, vec!['o']);
/// assert_eq!(entries[2].nick, "carol");
/// ```
pub fn parse_names<I, S>(tokens: I, table: &ChannelModeParams) -> Vec<NamesEntry>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .filter_map(|token| {
            let mut rest = token.as_ref();
            let mut modes = Vec::new();
            while let Some(c) = rest.chars().next() {
                match table.mode_for_prefix(c) {
                    Some(m) => {
                        modes.push(m);
                        rest = &rest[c.len_utf8()..];
                    }
                    None => break,
                }
            }
            let nick = Identity::nick_of(rest);
            (!nick.is_empty()).then(|| NamesEntry {
                nick: nick.to_owned(),
                modes,
            })
        })
        .collect()
}
