//! Mode strings: letter/argument pairing and parameter tables.
//!
//! Two shapes of mode data reach the core:
//!
//! - mode notifications, where the transport has already split the letters
//!   from their arguments and only the pairing is left ([`pair_mode_args`])
//! - `RPL_CHANNELMODEIS` replies, a raw `+modes params...` string that needs
//!   the server's parameter table to decode ([`parse_channel_modes`])

use crate::error::ModeParseError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single mode letter being set or unset, with its optional argument.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModeChange {
    /// `true` for `+`, `false` for `-`.
    pub set: bool,
    /// The mode letter.
    pub mode: char,
    /// The argument, if the mode carries one.
    pub arg: Option<String>,
}

impl ModeChange {
    /// Construct a mode change.
    pub fn new(set: bool, mode: char, arg: Option<String>) -> Self {
        Self { set, mode, arg }
    }
}

/// Pair `K` mode letters with their arguments.
///
/// `K` letters with `K` arguments pair positionally. Zero arguments means
/// every letter is argument-less. Any other count is an
/// [`ModeParseError::ArgumentMismatch`].
///
/// ```
/// use slbot_proto::pair_mode_args;
///
/// let pairs = pair_mode_args("ov", &[Some("alice".into()), Some("bob".into())]).unwrap();
/// assert_eq!(pairs[1], ('v', Some("bob".to_string())));
///
/// let bare = pair_mode_args("nt", &[]).unwrap();
/// assert_eq!(bare, vec![('n', None), ('t', None)]);
/// ```
pub fn pair_mode_args(
    modes: &str,
    args: &[Option<String>],
) -> Result<Vec<(char, Option<String>)>, ModeParseError> {
    let letters: Vec<char> = modes.chars().collect();
    if args.is_empty() {
        return Ok(letters.into_iter().map(|m| (m, None)).collect());
    }
    if args.len() != letters.len() {
        return Err(ModeParseError::ArgumentMismatch {
            modes: modes.to_owned(),
            args: args.len(),
        });
    }
    Ok(letters.into_iter().zip(args.iter().cloned()).collect())
}

/// Which channel modes take an argument, and the membership prefix table.
///
/// Built from the `CHANMODES` and `PREFIX` ISUPPORT tokens. The default
/// corresponds to `CHANMODES=b,k,l,imnpst` and `PREFIX=(ov)@+`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelModeParams {
    /// Type A: list modes, argument when set or unset.
    pub list: String,
    /// Type B: argument when set or unset.
    pub always: String,
    /// Type C: argument only when set.
    pub set_only: String,
    /// Type D: never an argument.
    pub flag: String,
    /// `(mode letter, nick prefix symbol)` pairs, highest rank first.
    pub prefixes: Vec<(char, char)>,
}

impl Default for ChannelModeParams {
    fn default() -> Self {
        Self {
            list: "b".into(),
            always: "k".into(),
            set_only: "l".into(),
            flag: "imnpst".into(),
            prefixes: vec![('o', '@'), ('v', '+')],
        }
    }
}

impl ChannelModeParams {
    /// Whether `mode` consumes an argument in the given direction.
    ///
    /// Prefix modes (`o`, `v`, ...) always take the target nick.
    pub fn takes_arg(&self, mode: char, set: bool) -> bool {
        self.prefixes.iter().any(|&(m, _)| m == mode)
            || self.list.contains(mode)
            || self.always.contains(mode)
            || (set && self.set_only.contains(mode))
    }

    /// The mode letters that take an argument when set, in table order.
    pub fn add_arg_modes(&self) -> String {
        let mut out: String = self.prefixes.iter().map(|&(m, _)| m).collect();
        out.push_str(&self.list);
        out.push_str(&self.always);
        out.push_str(&self.set_only);
        out
    }

    /// The mode letters that take an argument when unset.
    pub fn remove_arg_modes(&self) -> String {
        let mut out: String = self.prefixes.iter().map(|&(m, _)| m).collect();
        out.push_str(&self.list);
        out.push_str(&self.always);
        out
    }

    /// Map a NAMES prefix symbol (`@`, `+`, ...) to its mode letter.
    pub fn mode_for_prefix(&self, symbol: char) -> Option<char> {
        self.prefixes
            .iter()
            .find(|&&(_, s)| s == symbol)
            .map(|&(m, _)| m)
    }

    /// Update the table from `RPL_ISUPPORT` tokens.
    ///
    /// Recognizes `CHANMODES=A,B,C,D` and `PREFIX=(modes)symbols`; other
    /// tokens are ignored, as are malformed values of the recognized ones.
    /// Returns `true` if anything changed.
    pub fn apply_isupport<S: AsRef<str>>(&mut self, tokens: &[S]) -> bool {
        let mut changed = false;
        for token in tokens {
            let Some((key, value)) = token.as_ref().split_once('=') else {
                continue;
            };
            match key {
                "CHANMODES" => {
                    let mut groups = value.split(',');
                    let (Some(a), Some(b), Some(c), Some(d)) =
                        (groups.next(), groups.next(), groups.next(), groups.next())
                    else {
                        continue;
                    };
                    self.list = a.to_owned();
                    self.always = b.to_owned();
                    self.set_only = c.to_owned();
                    self.flag = d.to_owned();
                    changed = true;
                }
                "PREFIX" => {
                    if let Some(prefixes) = parse_prefix_spec(value) {
                        self.prefixes = prefixes;
                        changed = true;
                    }
                }
                _ => {}
            }
        }
        changed
    }
}

/// Parse a `PREFIX` value such as `(qaohv)~&@%+`.
fn parse_prefix_spec(value: &str) -> Option<Vec<(char, char)>> {
    let rest = value.strip_prefix('(')?;
    let (modes, symbols) = rest.split_once(')')?;
    if modes.chars().count() != symbols.chars().count() {
        return None;
    }
    Some(modes.chars().zip(symbols.chars()).collect())
}

/// Decode a raw channel mode string with its parameters, such as the body of
/// an `RPL_CHANNELMODEIS` reply.
///
/// A string without a leading `+` or `-` is read as setting modes.
///
/// ```
/// use slbot_proto::{parse_channel_modes, ChannelModeParams, ModeChange};
///
/// let table = ChannelModeParams::default();
/// let modes = parse_channel_modes("+ntl", &["25"], &table).unwrap();
/// assert_eq!(modes[2], ModeChange::new(true, 'l', Some("25".into())));
/// ```
pub fn parse_channel_modes<S: AsRef<str>>(
    modes: &str,
    params: &[S],
    table: &ChannelModeParams,
) -> Result<Vec<ModeChange>, ModeParseError> {
    let mut out = Vec::new();
    let mut args = params.iter().map(AsRef::as_ref);
    let mut set = true;

    for c in modes.chars() {
        match c {
            '+' => set = true,
            '-' => set = false,
            _ => {
                let arg = if table.takes_arg(c, set) {
                    match args.next() {
                        Some(a) => Some(a.to_owned()),
                        // bare list mode, e.g. a ban-list query echo
                        None if table.list.contains(c) => None,
                        None => return Err(ModeParseError::MissingArgument(c)),
                    }
                } else {
                    None
                };
                out.push(ModeChange::new(set, c, arg));
            }
        }
    }

    let unused = args.count();
    if unused > 0 {
        return Err(ModeParseError::UnusedArguments(unused));
    }
    Ok(out)
}
