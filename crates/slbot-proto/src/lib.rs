//! # slbot-proto
//!
//! Protocol-level building blocks for the slbot chat automation core.
//!
//! Nothing in this crate performs I/O. The transport decodes wire frames; the
//! types here describe what comes out of that decoding and the small parsing
//! jobs the core still has to do on its own:
//!
//! - [`Identity`] and [`Mask`]: total `nick!user@host` decomposition and
//!   part-wise wildcard matching
//! - [`ChannelExt`]: channel-name detection
//! - [`mode`]: mode-letter/argument pairing and `RPL_CHANNELMODEIS` parsing
//! - [`names`]: `RPL_NAMREPLY` token parsing
//!
//! ## Quick Start
//!
//! ```rust
//! use slbot_proto::{Identity, Mask};
//!
//! let who = Identity::parse("alice!ali@gw.example.org");
//! assert_eq!(who.nick, "alice");
//!
//! let mask = Mask::parse("alice!*@*.example.org");
//! assert!(mask.matches(&who));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod chan;
pub mod error;
pub mod identity;
pub mod mode;
pub mod names;

pub use self::chan::ChannelExt;
pub use self::error::ModeParseError;
pub use self::identity::{irc_eq, irc_to_lower, wildcard_match, Identity, Mask};
pub use self::mode::{pair_mode_args, parse_channel_modes, ChannelModeParams, ModeChange};
pub use self::names::{parse_names, NamesEntry};
