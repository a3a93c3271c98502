//! Network state tracking.
//!
//! - [`channel`]: per-channel membership, topic, modes and sync flag
//! - [`network`]: the network-wide view (server info, server-scope modes,
//!   own nickname, sign-on status)

mod channel;
mod network;

pub use channel::ChannelState;
pub use network::{NetworkState, ServerInfo};
