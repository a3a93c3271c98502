//! A transport that records every outbound request.

use async_trait::async_trait;
use parking_lot::Mutex;
use slbot::{Transport, TransportError};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Message { target: String, text: String },
    Join(String),
    ModeQuery(String),
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    refuse: AtomicBool,
}

#[allow(dead_code)]
impl RecordingTransport {
    /// Make every later request fail with [`TransportError::NotConnected`].
    pub fn disconnect(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    /// `(target, text)` of every message sent so far.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .iter()
            .filter_map(|s| match s {
                Sent::Message { target, text } => Some((target.clone(), text.clone())),
                _ => None,
            })
            .collect()
    }

    /// Message texts sent to `target`.
    pub fn texts_to(&self, target: &str) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(t, _)| t == target)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    fn record(&self, sent: Sent) -> Result<(), TransportError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().push(sent);
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.record(Sent::Message {
            target: target.to_owned(),
            text: text.to_owned(),
        })
    }

    async fn join(&self, channel: &str) -> Result<(), TransportError> {
        self.record(Sent::Join(channel.to_owned()))
    }

    async fn request_channel_mode(&self, channel: &str) -> Result<(), TransportError> {
        self.record(Sent::ModeQuery(channel.to_owned()))
    }
}
