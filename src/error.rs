//! Errors surfaced by the dispatch core.
//!
//! Plugin faults never reach the caller of [`Bot::dispatch`](crate::Bot::dispatch):
//! they are logged and delivery continues. What does reach the caller is a
//! failure of the built-in handling for an event, which in practice means the
//! transport refused an outbound request.

use crate::transport::TransportError;
use thiserror::Error;

/// Failure of a built-in event handler.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A follow-up event derived from this one failed in its own built-in.
    #[error("derived {event} event failed: {source}")]
    FollowUp {
        event: &'static str,
        #[source]
        source: Box<BotError>,
    },
}

impl BotError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(e) => e.error_code(),
            Self::FollowUp { .. } => "follow_up",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_convert_and_label() {
        let err: BotError = TransportError::NotConnected.into();
        assert_eq!(err.error_code(), "not_connected");
        assert_eq!(err.to_string(), "transport error: not connected");
    }

    #[test]
    fn follow_up_wraps_the_inner_failure() {
        let err = BotError::FollowUp {
            event: "channelModeChanged",
            source: Box::new(TransportError::NotConnected.into()),
        };
        assert_eq!(err.error_code(), "follow_up");
        assert!(err.to_string().contains("not connected"));
    }
}
