use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Modifier bitmask as carried on the wire (Shift=1, Ctrl=2, Alt=4, Meta=8)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(1);
    pub const CTRL: Modifiers = Modifiers(2);
    pub const ALT: Modifiers = Modifiers(4);
    pub const META: Modifiers = Modifiers(8);

    pub fn from_flags(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Self {
        let mut bits = 0;
        if shift {
            bits |= Self::SHIFT.0;
        }
        if ctrl {
            bits |= Self::CTRL.0;
        }
        if alt {
            bits |= Self::ALT.0;
        }
        if meta {
            bits |= Self::META.0;
        }
        Self(bits)
    }

    /// Only the low four bits are meaningful
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0F)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Host button index convention: 0 = left, 1 = middle, 2 = right
    pub fn from_host_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Left),
            1 => Some(Self::Middle),
            2 => Some(Self::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Logical channel a message travels on. Each maps to one characteristic
/// on the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Mouse,
    Key,
    Ota,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mouse => write!(f, "mouse"),
            Self::Key => write!(f, "key"),
            Self::Ota => write!(f, "ota"),
        }
    }
}

/// A single device command. Built, encoded, sent and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MouseMove {
        dx: i8,
        dy: i8,
    },
    MouseButton {
        button: MouseButton,
        pressed: bool,
    },
    Scroll {
        direction: ScrollDirection,
    },
    KeyEvent {
        code: u8,
        nav: bool,
        modifiers: Modifiers,
    },
    /// OS-level chord interception and held-key control (`mode` selects which)
    SystemRemap {
        mode: u8,
        key: u8,
    },
}

impl Command {
    pub fn channel(&self) -> Channel {
        match self {
            Self::MouseMove { .. } | Self::MouseButton { .. } | Self::Scroll { .. } => {
                Channel::Mouse
            }
            Self::KeyEvent { .. } | Self::SystemRemap { .. } => Channel::Key,
        }
    }
}

/// Browser-style wheel delta unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaMode {
    #[default]
    Pixel,
    Line,
    Page,
}

impl DeltaMode {
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Pixel => 1.0,
            Self::Line => 16.0,
            Self::Page => 100.0,
        }
    }
}

/// Minimal input event shape consumed by the bridge.
///
/// Timestamps are milliseconds on the session clock; when absent the
/// caller's clock is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    PointerDelta {
        dx: f64,
        dy: f64,
        #[serde(default)]
        t: Option<f64>,
    },
    Wheel {
        delta_y: f64,
        #[serde(default)]
        delta_mode: DeltaMode,
        #[serde(default)]
        t: Option<f64>,
    },
    Button {
        button: u8,
        pressed: bool,
    },
    Key {
        key: String,
        #[serde(default)]
        shift: bool,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        alt: bool,
        #[serde(default)]
        meta: bool,
        #[serde(default)]
        t: Option<f64>,
    },
}

impl InputEvent {
    pub fn timestamp(&self) -> Option<f64> {
        match self {
            Self::PointerDelta { t, .. } | Self::Wheel { t, .. } | Self::Key { t, .. } => *t,
            Self::Button { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    Status(StatusMessage),
    BurstProgress { sent: usize, total: usize },
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>, severity: MessageSeverity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}
