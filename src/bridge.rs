//! Bridge session
//!
//! Owns the per-session shaping and gesture state and pushes every shaped
//! command through encode, seal and send. Live input is lossy: a command
//! that cannot be sealed or sent is logged and dropped, never retried.
//! Burst paste is strict and stops at the first failure.

use crate::domain::burst;
use crate::domain::gestures::{GestureDetector, GESTURE_WINDOW_MS};
use crate::domain::keymap::{route_key, KeyAction};
use crate::domain::models::{
    AppEvent, Command, InputEvent, MessageSeverity, Modifiers, StatusMessage,
};
use crate::domain::settings::ShapingSettings;
use crate::domain::shaper::InputShaper;
use crate::infrastructure::bluetooth::framer::FrameError;
use crate::infrastructure::bluetooth::{protocol, SecureFramer, TransportError, TransportSink};
use crate::infrastructure::cancel::CancelToken;
use crate::infrastructure::clipboard::{ClipboardError, ClipboardSource};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Encode, seal and write one command on its channel.
///
/// Cheap to clone; the live path and burst replays share one link.
#[derive(Clone)]
pub struct CommandLink {
    framer: SecureFramer,
    sink: Arc<dyn TransportSink>,
}

impl CommandLink {
    pub fn new(framer: SecureFramer, sink: Arc<dyn TransportSink>) -> Self {
        Self { framer, sink }
    }

    pub async fn send(&self, command: &Command) -> Result<(), SendError> {
        let payload = protocol::encode(command);
        let frame = self.framer.seal(&payload)?;
        self.sink.send(command.channel(), &frame).await?;
        trace!(?command, "command sent");
        Ok(())
    }

    /// Live-input variant: failures are logged and the command is dropped
    pub async fn send_lossy(&self, command: &Command) {
        match self.send(command).await {
            Ok(()) => {}
            Err(SendError::Frame(FrameError::NoKey)) => {
                debug!("No relay key set, dropping {:?}", command);
            }
            Err(e) => warn!("Dropping {:?}: {}", command, e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Handled,
    /// A Ctrl+V double chord completed; the caller should start a burst paste
    BurstPasteRequested,
}

pub struct Bridge {
    shaper: InputShaper,
    gestures: GestureDetector,
    link: CommandLink,
}

impl Bridge {
    pub fn new(shaping: ShapingSettings, link: CommandLink) -> Self {
        Self {
            shaper: InputShaper::new(shaping),
            gestures: GestureDetector::new(),
            link,
        }
    }

    pub fn set_shaping(&mut self, shaping: ShapingSettings) {
        self.shaper.set_settings(shaping);
    }

    pub async fn handle_event(&mut self, event: &InputEvent, now_ms: f64) -> EventOutcome {
        match event {
            InputEvent::PointerDelta { dx, dy, .. } => {
                if let Some(command) = self.shaper.on_pointer_delta(*dx, *dy, now_ms) {
                    self.link.send_lossy(&command).await;
                }
            }
            InputEvent::Wheel {
                delta_y,
                delta_mode,
                ..
            } => {
                for command in self.shaper.on_wheel(*delta_y, *delta_mode, now_ms) {
                    self.link.send_lossy(&command).await;
                }
            }
            InputEvent::Button { button, pressed } => {
                match self.shaper.on_button(*button, *pressed) {
                    Some(command) => self.link.send_lossy(&command).await,
                    None => debug!("Ignoring host button {}", button),
                }
            }
            InputEvent::Key {
                key,
                shift,
                ctrl,
                alt,
                meta,
                ..
            } => {
                let modifiers = Modifiers::from_flags(*shift, *ctrl, *alt, *meta);
                match route_key(&mut self.gestures, key, modifiers, now_ms) {
                    KeyAction::Send(commands) => {
                        for command in &commands {
                            self.link.send_lossy(command).await;
                        }
                    }
                    KeyAction::BurstPaste => return EventOutcome::BurstPasteRequested,
                }
            }
        }
        EventOutcome::Handled
    }

    /// Periodic housekeeping: scroll remainder decay and gesture timeouts
    pub async fn tick(&mut self, now_ms: f64) {
        self.shaper.decay_tick(now_ms);
        if let Some(command) = self.gestures.poll(now_ms) {
            self.link.send_lossy(&command).await;
        }
    }

    /// End of input: fire any pending gesture deadline now
    pub async fn flush(&mut self, now_ms: f64) {
        self.tick(now_ms + GESTURE_WINDOW_MS).await;
    }
}

#[derive(Debug, Error)]
pub enum BurstError {
    #[error("Clipboard unavailable: {0}")]
    ClipboardUnavailable(#[from] ClipboardError),

    #[error("Burst paste stopped after {sent} of {total} commands: {source}")]
    Send {
        sent: usize,
        total: usize,
        #[source]
        source: SendError,
    },

    #[error("Burst paste cancelled after {sent} of {total} commands")]
    Cancelled { sent: usize, total: usize },
}

/// Replays clipboard text as paced key commands
#[derive(Clone)]
pub struct BurstPaste {
    link: CommandLink,
    char_delay: Duration,
    events: Option<mpsc::UnboundedSender<AppEvent>>,
}

impl BurstPaste {
    pub fn new(link: CommandLink, char_delay: Duration) -> Self {
        Self {
            link,
            char_delay,
            events: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Read the clipboard and send it. Returns the number of commands sent.
    pub async fn run(
        &self,
        clipboard: &dyn ClipboardSource,
        cancel: &CancelToken,
    ) -> Result<usize, BurstError> {
        let text = match clipboard.read_text().await {
            Ok(text) => text,
            Err(e) => {
                self.status(format!("Could not read clipboard: {}", e), MessageSeverity::Error);
                return Err(e.into());
            }
        };

        let steps = burst::plan(&text, self.char_delay);
        let total = steps.len();
        if total == 0 {
            debug!("Clipboard empty, nothing to paste");
            return Ok(0);
        }

        info!("Burst paste: {} commands", total);
        self.status(
            format!("Pasting {} characters", text.chars().count()),
            MessageSeverity::Info,
        );

        for (sent, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(self.cancelled(sent, total));
            }

            if let Err(source) = self.link.send(&step.command).await {
                self.status(format!("Paste stopped: {}", source), MessageSeverity::Error);
                return Err(BurstError::Send {
                    sent,
                    total,
                    source,
                });
            }
            self.emit(AppEvent::BurstProgress {
                sent: sent + 1,
                total,
            });

            tokio::select! {
                _ = tokio::time::sleep(step.delay) => {}
                _ = cancel.cancelled() => return Err(self.cancelled(sent + 1, total)),
            }
        }

        self.status("Paste complete", MessageSeverity::Success);
        Ok(total)
    }

    fn cancelled(&self, sent: usize, total: usize) -> BurstError {
        self.status("Paste cancelled", MessageSeverity::Warning);
        BurstError::Cancelled { sent, total }
    }

    fn status(&self, message: impl Into<String>, severity: MessageSeverity) {
        self.emit(AppEvent::Status(StatusMessage::new(message, severity)));
    }

    fn emit(&self, event: AppEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
