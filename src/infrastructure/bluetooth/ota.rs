//! OTA Transfer Controller
//!
//! Pushes a firmware image over the relay's unencrypted OTA channel:
//!
//! ```text
//! Idle ──begin()──▶ Begin ──[0x42,len]──▶ Sending ──[0x44,chunk]*──▶ [0x45] ──▶ Done
//!                     │                      │
//!                     └───── send error ─────┴──▶ Failed
//! ```
//!
//! Chunks go out strictly in order, each after the previous send returned.
//! Nothing is retried; a failed transfer must be reset and started over.

use crate::domain::models::Channel;
use crate::infrastructure::bluetooth::protocol::{self, OTA_CHUNK_SIZE};
use crate::infrastructure::bluetooth::transport::{TransportError, TransportSink};
use crate::infrastructure::cancel::CancelToken;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    Idle,
    Begin,
    Sending,
    Done,
    Failed,
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Begin => write!(f, "starting transfer"),
            Self::Sending => write!(f, "sending firmware"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum OtaError {
    #[error("Firmware image is empty")]
    EmptyFirmware,

    #[error("Firmware image too large: {0} bytes")]
    TooLarge(usize),

    #[error("Transfer is {0}, reset it first")]
    Busy(TransferPhase),

    #[error("No firmware loaded")]
    NotStarted,

    #[error("Transfer aborted at {offset}/{length} bytes: {source}")]
    Aborted {
        offset: u32,
        length: u32,
        #[source]
        source: TransportError,
    },

    #[error("Transfer cancelled at {offset}/{length} bytes")]
    Cancelled { offset: u32, length: u32 },
}

/// Progress observer, implemented by the CLI, UI layers and tests
pub trait TransferProgress: Send {
    fn on_phase(&mut self, phase: TransferPhase);
    fn on_chunk(&mut self, offset: u32, length: u32, percent: u8);
    fn on_error(&mut self, error: &OtaError);
    fn on_complete(&mut self);
}

/// Reports progress through `tracing`
#[derive(Debug, Default)]
pub struct LogProgress {
    last_percent: Option<u8>,
}

impl TransferProgress for LogProgress {
    fn on_phase(&mut self, phase: TransferPhase) {
        info!("OTA: {}", phase);
    }

    fn on_chunk(&mut self, offset: u32, length: u32, percent: u8) {
        // one line per 10%
        if self.last_percent.map_or(true, |last| percent / 10 != last / 10) {
            info!("OTA: {}% ({}/{} bytes)", percent, offset, length);
        }
        self.last_percent = Some(percent);
    }

    fn on_error(&mut self, error: &OtaError) {
        warn!("OTA: {}", error);
    }

    fn on_complete(&mut self) {
        info!("OTA: transfer complete, relay is rebooting");
    }
}

pub struct OtaController {
    phase: TransferPhase,
    firmware: Vec<u8>,
    offset: u32,
}

impl Default for OtaController {
    fn default() -> Self {
        Self::new()
    }
}

impl OtaController {
    pub fn new() -> Self {
        Self {
            phase: TransferPhase::Idle,
            firmware: Vec::new(),
            offset: 0,
        }
    }

    pub fn phase(&self) -> TransferPhase {
        self.phase
    }

    /// Bytes confirmed handed to the transport so far
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn length(&self) -> u32 {
        self.firmware.len() as u32
    }

    /// Load a firmware image. Only valid from Idle.
    pub fn begin(&mut self, firmware: Vec<u8>) -> Result<(), OtaError> {
        if self.phase != TransferPhase::Idle {
            return Err(OtaError::Busy(self.phase));
        }
        if firmware.is_empty() {
            return Err(OtaError::EmptyFirmware);
        }
        if u32::try_from(firmware.len()).is_err() {
            return Err(OtaError::TooLarge(firmware.len()));
        }

        debug!("OTA: loaded {} byte image", firmware.len());
        self.firmware = firmware;
        self.offset = 0;
        self.phase = TransferPhase::Begin;
        Ok(())
    }

    /// Return to Idle, dropping any loaded image
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Drive the loaded image through Begin, Data* and End
    pub async fn run(
        &mut self,
        sink: &dyn TransportSink,
        progress: &mut dyn TransferProgress,
        cancel: &CancelToken,
    ) -> Result<(), OtaError> {
        if self.phase != TransferPhase::Begin {
            return Err(if self.phase == TransferPhase::Idle {
                OtaError::NotStarted
            } else {
                OtaError::Busy(self.phase)
            });
        }

        let length = self.length();
        progress.on_phase(TransferPhase::Begin);
        info!(
            "OTA: starting transfer of {} bytes in {} chunks",
            length,
            self.firmware.len().div_ceil(OTA_CHUNK_SIZE)
        );

        if let Err(source) = sink.send(Channel::Ota, &protocol::ota_begin(length)).await {
            return Err(self.fail(progress, source));
        }

        self.phase = TransferPhase::Sending;
        progress.on_phase(TransferPhase::Sending);

        while (self.offset as usize) < self.firmware.len() {
            if cancel.is_cancelled() {
                let error = OtaError::Cancelled {
                    offset: self.offset,
                    length,
                };
                return Err(self.fail_with(progress, error));
            }

            let start = self.offset as usize;
            let end = (start + OTA_CHUNK_SIZE).min(self.firmware.len());
            let message = protocol::ota_data(&self.firmware[start..end]);

            if let Err(source) = sink.send(Channel::Ota, &message).await {
                return Err(self.fail(progress, source));
            }

            self.offset = end as u32;
            progress.on_chunk(self.offset, length, percent(self.offset, length));
        }

        if let Err(source) = sink.send(Channel::Ota, &protocol::ota_end()).await {
            return Err(self.fail(progress, source));
        }

        self.phase = TransferPhase::Done;
        progress.on_phase(TransferPhase::Done);
        progress.on_complete();
        Ok(())
    }

    fn fail(&mut self, progress: &mut dyn TransferProgress, source: TransportError) -> OtaError {
        let error = OtaError::Aborted {
            offset: self.offset,
            length: self.length(),
            source,
        };
        self.fail_with(progress, error)
    }

    fn fail_with(&mut self, progress: &mut dyn TransferProgress, error: OtaError) -> OtaError {
        self.phase = TransferPhase::Failed;
        progress.on_phase(TransferPhase::Failed);
        progress.on_error(&error);
        error
    }
}

fn percent(offset: u32, length: u32) -> u8 {
    (offset as f64 / length as f64 * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::transport::testing::RecordingSink;

    #[derive(Default)]
    struct RecordingProgress {
        phases: Vec<TransferPhase>,
        percents: Vec<u8>,
        errors: usize,
        completed: bool,
    }

    impl TransferProgress for RecordingProgress {
        fn on_phase(&mut self, phase: TransferPhase) {
            self.phases.push(phase);
        }
        fn on_chunk(&mut self, _offset: u32, _length: u32, percent: u8) {
            self.percents.push(percent);
        }
        fn on_error(&mut self, _error: &OtaError) {
            self.errors += 1;
        }
        fn on_complete(&mut self) {
            self.completed = true;
        }
    }

    fn firmware(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    #[tokio::test]
    async fn test_300_byte_image_message_sequence() {
        let sink = RecordingSink::new();
        let mut progress = RecordingProgress::default();
        let mut ota = OtaController::new();
        let image = firmware(300);

        ota.begin(image.clone()).unwrap();
        ota.run(&sink, &mut progress, &CancelToken::new())
            .await
            .unwrap();

        let sent = sink.sent();
        assert!(sent.iter().all(|(channel, _)| *channel == Channel::Ota));
        let messages: Vec<Vec<u8>> = sent.into_iter().map(|(_, bytes)| bytes).collect();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0], vec![0x42, 0x2C, 0x01, 0x00, 0x00]);
        assert_eq!(
            messages[1..4]
                .iter()
                .map(|m| (m[0], m.len() - 1))
                .collect::<Vec<_>>(),
            vec![(0x44, 128), (0x44, 128), (0x44, 44)]
        );
        assert_eq!(messages[4], vec![0x45]);

        let payload: Vec<u8> = messages[1..4]
            .iter()
            .flat_map(|m| m[1..].to_vec())
            .collect();
        assert_eq!(payload, image);

        assert_eq!(progress.percents, vec![43, 85, 100]);
        assert!(progress.percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(
            progress.phases,
            vec![
                TransferPhase::Begin,
                TransferPhase::Sending,
                TransferPhase::Done
            ]
        );
        assert!(progress.completed);
        assert_eq!(ota.phase(), TransferPhase::Done);
        assert_eq!(ota.offset(), 300);
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_empty_chunk() {
        let sink = RecordingSink::new();
        let mut ota = OtaController::new();
        ota.begin(firmware(256)).unwrap();
        ota.run(&sink, &mut LogProgress::default(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(sink.sent().len(), 1 + 2 + 1);
    }

    #[test]
    fn test_empty_image_rejected() {
        let mut ota = OtaController::new();
        assert!(matches!(ota.begin(Vec::new()), Err(OtaError::EmptyFirmware)));
        assert_eq!(ota.phase(), TransferPhase::Idle);
    }

    #[tokio::test]
    async fn test_run_without_begin() {
        let mut ota = OtaController::new();
        let result = ota
            .run(
                &RecordingSink::new(),
                &mut LogProgress::default(),
                &CancelToken::new(),
            )
            .await;
        assert!(matches!(result, Err(OtaError::NotStarted)));
    }

    #[tokio::test]
    async fn test_send_failure_is_terminal() {
        // Begin and the first chunk go through, the second chunk fails
        let sink = RecordingSink::failing_after(2);
        let mut progress = RecordingProgress::default();
        let mut ota = OtaController::new();
        ota.begin(firmware(300)).unwrap();

        let result = ota.run(&sink, &mut progress, &CancelToken::new()).await;
        assert!(matches!(
            result,
            Err(OtaError::Aborted {
                offset: 128,
                length: 300,
                ..
            })
        ));
        assert_eq!(ota.phase(), TransferPhase::Failed);
        assert_eq!(progress.errors, 1);
        assert!(!progress.completed);
        assert_eq!(progress.phases.last(), Some(&TransferPhase::Failed));

        assert!(matches!(
            ota.begin(firmware(10)),
            Err(OtaError::Busy(TransferPhase::Failed))
        ));
        ota.reset();
        assert!(ota.begin(firmware(10)).is_ok());
    }

    #[tokio::test]
    async fn test_begin_failure() {
        let sink = RecordingSink::failing_after(0);
        let mut ota = OtaController::new();
        ota.begin(firmware(10)).unwrap();
        let result = ota
            .run(&sink, &mut LogProgress::default(), &CancelToken::new())
            .await;
        assert!(matches!(result, Err(OtaError::Aborted { offset: 0, .. })));
        assert_eq!(ota.phase(), TransferPhase::Failed);
    }

    #[tokio::test]
    async fn test_cancel_stops_between_chunks() {
        let sink = RecordingSink::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut ota = OtaController::new();
        ota.begin(firmware(300)).unwrap();
        let result = ota
            .run(&sink, &mut LogProgress::default(), &cancel)
            .await;

        assert!(matches!(result, Err(OtaError::Cancelled { offset: 0, .. })));
        // only Begin went out
        assert_eq!(sink.sent().len(), 1);
        assert_eq!(ota.phase(), TransferPhase::Failed);
    }
}
