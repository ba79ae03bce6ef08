//! Transport Sink
//!
//! The boundary to the BLE link layer: fire-and-forget writes, one per
//! message, on a named channel. No acknowledgement, no ordering guarantee
//! beyond call order.

use crate::domain::models::Channel;
use async_trait::async_trait;
use std::io::Write;
use std::sync::Mutex;
use thiserror::Error;
use tracing::trace;

/// Errors that can occur while handing bytes to the link
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Write timed out")]
    Timeout,

    #[error("Device disconnected")]
    Disconnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait TransportSink: Send + Sync {
    /// Write one message without waiting for a response
    async fn send(&self, channel: Channel, bytes: &[u8]) -> Result<(), TransportError>;
}

/// Writes each message as `<channel> <hex>` on its own line.
///
/// Stands in for the BLE link when driving the bridge from a terminal or a
/// capture file.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl<W: Write + Send> TransportSink for WriterSink<W> {
    async fn send(&self, channel: Channel, bytes: &[u8]) -> Result<(), TransportError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| TransportError::Rejected("writer lock poisoned".to_string()))?;
        writeln!(writer, "{} {}", channel, hex::encode(bytes))?;
        writer.flush()?;
        trace!(%channel, len = bytes.len(), "message written");
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Records every message; optionally starts failing after `fail_after`
    /// successful sends.
    #[derive(Default)]
    pub struct RecordingSink {
        sent: Mutex<Vec<(Channel, Vec<u8>)>>,
        fail_after: Option<usize>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_after(n: usize) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_after: Some(n),
            }
        }

        pub fn sent(&self) -> Vec<(Channel, Vec<u8>)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TransportSink for RecordingSink {
        async fn send(&self, channel: Channel, bytes: &[u8]) -> Result<(), TransportError> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_after.is_some_and(|n| sent.len() >= n) {
                return Err(TransportError::Disconnected);
            }
            sent.push((channel, bytes.to_vec()));
            Ok(())
        }
    }
}
