//! HID Relay Wire Protocol
//!
//! Fixed-layout command payloads for the relay and the OTA control
//! messages. Every command variant has a fixed length so the relay can
//! dispatch on the opcode alone.

use crate::domain::keymap::EXTENDED_CODE;
use crate::domain::models::{Command, Modifiers, MouseButton, ScrollDirection};
use thiserror::Error;

/// Relay BLE Service UUID (Nordic UART layout)
pub const SERVICE_UUID: &str = "6e400001-b5a3-f393-e0a9-e50e24dcca9e";

/// Mouse move / button / scroll commands
pub const MOUSE_CHAR_UUID: &str = "6e400002-b5a3-f393-e0a9-e50e24dcca9e";

/// Key and extended key commands
pub const KEY_CHAR_UUID: &str = "6e400003-b5a3-f393-e0a9-e50e24dcca9e";

/// Unencrypted firmware update channel
pub const OTA_CHAR_UUID: &str = "6e400004-b5a3-f393-e0a9-e50e24dcca9e";

/// Command opcodes (first payload byte)
pub mod opcode {
    pub const KEY: u8 = 0x6B; // 'k'
    pub const MOUSE_MOVE: u8 = 0x6D; // 'm'
    pub const MOUSE_BUTTON: u8 = 0x63; // 'c'
    pub const SCROLL: u8 = 0x73; // 's'

    pub const OTA_BEGIN: u8 = 0x42; // 'B'
    pub const OTA_DATA: u8 = 0x44; // 'D'
    pub const OTA_END: u8 = 0x45; // 'E'
}

/// Device button codes. Middle and right are swapped relative to the
/// host's index order.
pub mod button_code {
    pub const LEFT: u8 = 1;
    pub const RIGHT: u8 = 2;
    pub const MIDDLE: u8 = 4;
}

/// Maximum firmware bytes carried by one OTA Data message
pub const OTA_CHUNK_SIZE: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Empty payload")]
    Empty,
    #[error("Unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),
    #[error("Opcode 0x{opcode:02X} expects {expected} bytes, got {actual}")]
    Length {
        opcode: u8,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid operand 0x{value:02X} for opcode 0x{opcode:02X}")]
    Operand { opcode: u8, value: u8 },
}

impl MouseButton {
    pub fn device_code(self) -> u8 {
        match self {
            Self::Left => button_code::LEFT,
            Self::Right => button_code::RIGHT,
            Self::Middle => button_code::MIDDLE,
        }
    }

    pub fn from_device_code(code: u8) -> Option<Self> {
        match code {
            button_code::LEFT => Some(Self::Left),
            button_code::RIGHT => Some(Self::Right),
            button_code::MIDDLE => Some(Self::Middle),
            _ => None,
        }
    }
}

impl ScrollDirection {
    /// Wheel tick as a signed byte: up is +1, down is -1
    pub fn as_i8(self) -> i8 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

/// Encoded payload length for a command opcode
pub fn payload_len(opcode: u8) -> Option<usize> {
    match opcode {
        opcode::KEY => Some(4),
        opcode::MOUSE_MOVE | opcode::MOUSE_BUTTON => Some(3),
        opcode::SCROLL => Some(2),
        _ => None,
    }
}

/// Encode a command into its fixed binary layout
///
/// ```text
/// KeyEvent     [0x6B, code, nav(0/1), modifiers]
/// SystemRemap  [0x6B, 0x80, mode, key]
/// MouseMove    [0x6D, dx:i8, dy:i8]
/// MouseButton  [0x63, code(1|2|4), pressed(0/1)]
/// Scroll       [0x73, direction:i8(+1|-1)]
/// ```
pub fn encode(command: &Command) -> Vec<u8> {
    match *command {
        Command::KeyEvent {
            code,
            nav,
            modifiers,
        } => vec![opcode::KEY, code, nav as u8, modifiers.bits()],
        Command::SystemRemap { mode, key } => vec![opcode::KEY, EXTENDED_CODE, mode, key],
        Command::MouseMove { dx, dy } => vec![opcode::MOUSE_MOVE, dx as u8, dy as u8],
        Command::MouseButton { button, pressed } => {
            vec![opcode::MOUSE_BUTTON, button.device_code(), pressed as u8]
        }
        Command::Scroll { direction } => vec![opcode::SCROLL, direction.as_i8() as u8],
    }
}

/// Parse a payload the way the relay does
pub fn decode(bytes: &[u8]) -> Result<Command, DecodeError> {
    let &op = bytes.first().ok_or(DecodeError::Empty)?;
    let expected = payload_len(op).ok_or(DecodeError::UnknownOpcode(op))?;
    if bytes.len() != expected {
        return Err(DecodeError::Length {
            opcode: op,
            expected,
            actual: bytes.len(),
        });
    }

    let flag = |value: u8| match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(DecodeError::Operand { opcode: op, value }),
    };

    match op {
        opcode::KEY if bytes[1] == EXTENDED_CODE => Ok(Command::SystemRemap {
            mode: bytes[2],
            key: bytes[3],
        }),
        opcode::KEY => Ok(Command::KeyEvent {
            code: bytes[1],
            nav: flag(bytes[2])?,
            modifiers: Modifiers::from_bits(bytes[3]),
        }),
        opcode::MOUSE_MOVE => Ok(Command::MouseMove {
            dx: bytes[1] as i8,
            dy: bytes[2] as i8,
        }),
        opcode::MOUSE_BUTTON => {
            let button = MouseButton::from_device_code(bytes[1]).ok_or(DecodeError::Operand {
                opcode: op,
                value: bytes[1],
            })?;
            Ok(Command::MouseButton {
                button,
                pressed: flag(bytes[2])?,
            })
        }
        _ => match bytes[1] as i8 {
            1 => Ok(Command::Scroll {
                direction: ScrollDirection::Up,
            }),
            -1 => Ok(Command::Scroll {
                direction: ScrollDirection::Down,
            }),
            _ => Err(DecodeError::Operand {
                opcode: op,
                value: bytes[1],
            }),
        },
    }
}

/// `[0x42, length:u32 LE]`
pub fn ota_begin(length: u32) -> [u8; 5] {
    let mut msg = [opcode::OTA_BEGIN; 5];
    msg[1..].copy_from_slice(&length.to_le_bytes());
    msg
}

/// `[0x44, chunk...]`, chunk at most [`OTA_CHUNK_SIZE`] bytes
pub fn ota_data(chunk: &[u8]) -> Vec<u8> {
    debug_assert!(chunk.len() <= OTA_CHUNK_SIZE);
    let mut msg = Vec::with_capacity(chunk.len() + 1);
    msg.push(opcode::OTA_DATA);
    msg.extend_from_slice(chunk);
    msg
}

/// `[0x45]`
pub fn ota_end() -> [u8; 1] {
    [opcode::OTA_END]
}
