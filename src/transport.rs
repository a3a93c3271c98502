//! Outbound side of the connection.
//!
//! The core never speaks the wire protocol itself. Whatever owns the
//! connection implements [`Transport`]; the core calls it from the built-in
//! handlers for `msg`, `signedOn` and `joined`.

use async_trait::async_trait;
use thiserror::Error;

/// Errors a transport can report for an outbound request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,

    #[error("send failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport rejected {target}: {reason}")]
    Rejected { target: String, reason: String },
}

impl TransportError {
    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::Io(_) => "io_error",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// The primitives the core needs from a connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one line of text to a channel or nick.
    async fn send_message(&self, target: &str, text: &str) -> Result<(), TransportError>;

    /// Join a channel.
    async fn join(&self, channel: &str) -> Result<(), TransportError>;

    /// Ask the server for a channel's current modes (answered by
    /// `RPL_CHANNELMODEIS`).
    async fn request_channel_mode(&self, channel: &str) -> Result<(), TransportError>;
}
