//! Key gesture recognizers driven by a logical millisecond clock.
//!
//! Nothing here arms real timers. Deadlines are compared against the
//! timestamp of each new key press and against [`GestureDetector::poll`],
//! which the session calls from its periodic tick.

use crate::domain::models::{Command, Modifiers};
use tracing::debug;

/// Window for both the triple tap and the double chord
pub const GESTURE_WINDOW_MS: f64 = 500.0;
pub const TAPS_FOR_ESCAPE: u8 = 3;

pub const BACKTICK_CODE: u8 = b'`';
pub const ESCAPE_CODE: u8 = 27;

/// Three backtick presses inside the window become a single Escape.
///
/// A lone press is replayed as a literal backtick once its window closes.
/// Two presses followed by silence produce nothing.
#[derive(Debug, Clone, Default)]
pub struct TripleTap {
    count: u8,
    deadline_ms: Option<f64>,
    first_modifiers: Modifiers,
}

impl TripleTap {
    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn press(&mut self, modifiers: Modifiers, now_ms: f64) -> Vec<Command> {
        let mut out: Vec<Command> = self.poll(now_ms).into_iter().collect();

        self.count += 1;
        if self.count == 1 {
            self.first_modifiers = modifiers;
        }

        if self.count >= TAPS_FOR_ESCAPE {
            debug!("Triple tap recognized, sending Escape");
            self.count = 0;
            self.deadline_ms = None;
            out.push(Command::KeyEvent {
                code: ESCAPE_CODE,
                nav: true,
                modifiers: Modifiers::NONE,
            });
        } else {
            self.deadline_ms = Some(now_ms + GESTURE_WINDOW_MS);
        }
        out
    }

    /// Fire the deadline if it has passed. Resets the counter either way.
    pub fn poll(&mut self, now_ms: f64) -> Option<Command> {
        let deadline = self.deadline_ms?;
        if now_ms < deadline {
            return None;
        }

        let taps = self.count;
        self.count = 0;
        self.deadline_ms = None;

        (taps == 1).then_some(Command::KeyEvent {
            code: BACKTICK_CODE,
            nav: false,
            modifiers: self.first_modifiers,
        })
    }
}

/// Two modifier chords (Ctrl+V) inside the window request a burst paste
#[derive(Debug, Clone, Default)]
pub struct DoubleChord {
    last_chord_ms: Option<f64>,
}

impl DoubleChord {
    pub fn chord(&mut self, now_ms: f64) -> bool {
        match self.last_chord_ms {
            Some(last) if now_ms - last < GESTURE_WINDOW_MS => {
                // a third chord starts a fresh pair
                self.last_chord_ms = None;
                true
            }
            _ => {
                self.last_chord_ms = Some(now_ms);
                false
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GestureDetector {
    pub triple_tap: TripleTap,
    pub double_chord: DoubleChord,
}

impl GestureDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll(&mut self, now_ms: f64) -> Option<Command> {
        self.triple_tap.poll(now_ms)
    }
}
