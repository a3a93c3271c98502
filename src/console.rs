//! A [`Transport`] for running the bot from a terminal.
//!
//! Outbound messages are printed as `-> target: text`; joins and mode
//! requests are only logged.

use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use tracing::debug;

pub struct ConsoleTransport<W = Stdout> {
    out: Mutex<W>,
}

impl ConsoleTransport<Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> ConsoleTransport<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Transport for ConsoleTransport<W> {
    async fn send_message(&self, target: &str, text: &str) -> Result<(), TransportError> {
        let line = format!("-> {target}: {text}\n");
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }

    async fn join(&self, channel: &str) -> Result<(), TransportError> {
        debug!(channel, "JOIN requested");
        Ok(())
    }

    async fn request_channel_mode(&self, channel: &str) -> Result<(), TransportError> {
        debug!(channel, "MODE query requested");
        Ok(())
    }
}
