//! User identities and hostmask patterns.
//!
//! An identity string has the shape `nick!user@host`. Parsing is total: any
//! string yields an [`Identity`], with absent parts left empty.
//!
//! Comparisons use the `rfc1459` case mapping, where `[]\~` are the
//! uppercase forms of `{}|^`.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Convert a single character to lowercase under `rfc1459` case mapping.
#[inline]
pub const fn irc_lower_char(c: char) -> char {
    match c {
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        'A'..='Z' => (c as u8 + 32) as char,
        _ => c,
    }
}

/// Lowercase a string under `rfc1459` case mapping.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

/// Case-insensitive equality under `rfc1459` case mapping.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.chars()
            .zip(b.chars())
            .all(|(ca, cb)| irc_lower_char(ca) == irc_lower_char(cb))
}

/// Match `text` against a glob `pattern` (`*` any run, `?` one char),
/// case-insensitively.
///
/// # Examples
///
/// ```
/// use slbot_proto::wildcard_match;
///
/// assert!(wildcard_match("*.example.org", "GW.Example.ORG"));
/// assert!(wildcard_match("al?ce", "alice"));
/// assert!(!wildcard_match("bob*", "alice"));
/// ```
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().map(irc_lower_char).collect();
    let text: Vec<char> = text.chars().map(irc_lower_char).collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                // retry the last star with one more character consumed
                Some((sp, st)) => {
                    star = Some((sp, st + 1));
                    p = sp + 1;
                    t = st + 1;
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// A decomposed `nick!user@host` string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Identity {
    /// Nickname; always present, possibly empty.
    pub nick: String,
    /// Username (ident); empty when the source string had no `@`.
    pub user: String,
    /// Hostname; empty when the source string had no `!`.
    pub host: String,
}

impl Identity {
    /// Build an identity from its three parts.
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            user: user.into(),
            host: host.into(),
        }
    }

    /// Split an identity string.
    ///
    /// - `"nick"` gives `(nick, "", "")`
    /// - `"nick!host"` gives `(nick, "", host)`
    /// - `"nick!user@host"` gives all three parts
    pub fn parse(s: &str) -> Self {
        let (nick, rest) = match s.split_once('!') {
            Some((nick, rest)) => (nick, rest),
            None => return Self::new(s, "", ""),
        };
        match rest.split_once('@') {
            Some((user, host)) => Self::new(nick, user, host),
            None => Self::new(nick, "", rest),
        }
    }

    /// The nickname portion of an identity string, without allocating.
    pub fn nick_of(s: &str) -> &str {
        s.split_once('!').map_or(s, |(nick, _)| nick)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nick)?;
        match (self.user.is_empty(), self.host.is_empty()) {
            (true, true) => Ok(()),
            (true, false) => write!(f, "!{}", self.host),
            _ => write!(f, "!{}@{}", self.user, self.host),
        }
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// A hostmask pattern: an identity whose parts are wildcard patterns.
///
/// Parts are matched independently, so `*!*@host` never lets a `*` in the
/// nick part swallow the `!`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Mask(String);

impl Mask {
    /// Wrap a mask string. Any string is a valid mask.
    pub fn parse(s: &str) -> Self {
        Self(s.to_owned())
    }

    /// The mask as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `identity` matches this mask part by part.
    pub fn matches(&self, identity: &Identity) -> bool {
        let pattern = Identity::parse(&self.0);
        wildcard_match(&pattern.nick, &identity.nick)
            && wildcard_match(&pattern.user, &identity.user)
            && wildcard_match(&pattern.host, &identity.host)
    }

    /// Convenience form of [`Mask::matches`] taking a raw identity string.
    pub fn matches_str(&self, identity: &str) -> bool {
        self.matches(&Identity::parse(identity))
    }
}

impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Mask {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for Mask {
    fn from(s: String) -> Self {
        Self(s)
    }
}
