//! Burst paste: clipboard text replayed as paced synthetic key presses.

use crate::domain::keymap::{byte_code, mode, ENTER_CODE, SHIFT_CODE};
use crate::domain::models::{Command, Modifiers};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_CHAR_DELAY: Duration = Duration::from_millis(75);

/// Gaps inside the Shift+Enter newline sequence
const SHIFT_DOWN_GAP: Duration = Duration::from_millis(30);
const ENTER_DOWN_GAP: Duration = Duration::from_millis(40);
const ENTER_UP_GAP: Duration = Duration::from_millis(20);

/// One command followed by the pause to observe before the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstStep {
    pub command: Command,
    pub delay: Duration,
}

/// Collapse `\r\n` and lone `\r` into `\n`
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Expand clipboard text into the exact paced command sequence.
///
/// Newlines become Shift-down, Enter-down, Enter-up, Shift-up so the relay
/// sees the modifier strictly before and after the key. Characters without
/// a one-byte code are skipped.
pub fn plan(text: &str, char_delay: Duration) -> Vec<BurstStep> {
    let text = normalize_line_endings(text);
    let mut steps = Vec::with_capacity(text.len());

    for c in text.chars() {
        if c == '\n' {
            steps.extend([
                hold(mode::KEY_PRESS, SHIFT_CODE, SHIFT_DOWN_GAP),
                hold(mode::KEY_PRESS, ENTER_CODE, ENTER_DOWN_GAP),
                hold(mode::KEY_RELEASE, ENTER_CODE, ENTER_UP_GAP),
                hold(mode::KEY_RELEASE, SHIFT_CODE, char_delay),
            ]);
            continue;
        }

        match byte_code(c) {
            Some(code) => steps.push(BurstStep {
                command: Command::KeyEvent {
                    code,
                    nav: false,
                    modifiers: Modifiers::NONE,
                },
                delay: char_delay,
            }),
            None => warn!("Skipping {:?}: no single-byte key code", c),
        }
    }
    steps
}

fn hold(mode: u8, key: u8, delay: Duration) -> BurstStep {
    BurstStep {
        command: Command::SystemRemap { mode, key },
        delay,
    }
}
