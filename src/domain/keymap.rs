use crate::domain::gestures::{GestureDetector, BACKTICK_CODE};
use crate::domain::models::{Command, Modifiers};

/// First byte after the opcode that marks an extended (non-literal) key command
pub const EXTENDED_CODE: u8 = 128;

/// Extended command modes
pub mod mode {
    /// Ctrl+key shortcut
    pub const CTRL_SHORTCUT: u8 = 3;
    /// Meta+key shortcut, also used for OS window/tab switching
    pub const META_SHORTCUT: u8 = 4;
    /// Press and hold a key until released
    pub const KEY_PRESS: u8 = 5;
    pub const KEY_RELEASE: u8 = 6;
}

pub const TAB_CODE: u8 = 9;
pub const ENTER_CODE: u8 = 13;
pub const SHIFT_CODE: u8 = 16;

const BACKTICK: &str = "`";
const PASTE_KEY: char = 'v';

/// Navigation and function keys, by host key identifier
pub fn nav_code(key: &str) -> Option<u8> {
    let code = match key {
        "Backspace" => 8,
        "Tab" => TAB_CODE,
        "Enter" => ENTER_CODE,
        "PageUp" => 33,
        "PageDown" => 34,
        "End" => 35,
        "Home" => 36,
        "ArrowLeft" => 37,
        "ArrowUp" => 38,
        "ArrowRight" => 39,
        "ArrowDown" => 40,
        "Insert" => 45,
        "Delete" => 46,
        _ => return function_key(key),
    };
    Some(code)
}

fn function_key(key: &str) -> Option<u8> {
    let n: u8 = key.strip_prefix('F')?.parse().ok()?;
    (1..=12).contains(&n).then(|| 111 + n)
}

/// The key identifier as a single character, if it is one
fn single_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

/// Latin-1 code of a character; anything wider has no one-byte encoding.
/// 128 is reserved for extended commands.
pub(crate) fn byte_code(c: char) -> Option<u8> {
    u8::try_from(u32::from(c))
        .ok()
        .filter(|code| *code != EXTENDED_CODE)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Zero or more commands to transmit, in order
    Send(Vec<Command>),
    /// The key completed a burst-paste chord and was consumed
    BurstPaste,
}

/// Route a host key-down through gestures, remaps, shortcuts and the
/// navigation table.
pub fn route_key(
    gestures: &mut GestureDetector,
    key: &str,
    modifiers: Modifiers,
    now_ms: f64,
) -> KeyAction {
    let ctrl = modifiers.contains(Modifiers::CTRL);
    let meta = modifiers.contains(Modifiers::META);
    let ch = single_char(key);

    let paste_chord = ctrl && ch.map(|c| c.to_ascii_lowercase()) == Some(PASTE_KEY);
    if paste_chord && gestures.double_chord.chord(now_ms) {
        return KeyAction::BurstPaste;
    }

    // Window / tab switching on the target OS
    if ctrl && key == BACKTICK {
        return send(Command::SystemRemap {
            mode: mode::META_SHORTCUT,
            key: BACKTICK_CODE,
        });
    }
    if ctrl && key == "Tab" {
        return send(Command::SystemRemap {
            mode: mode::META_SHORTCUT,
            key: TAB_CODE,
        });
    }

    if key == BACKTICK {
        return KeyAction::Send(gestures.triple_tap.press(modifiers, now_ms));
    }

    if ctrl || meta {
        if let Some(c) = ch {
            let lower = c.to_lowercase().next().unwrap_or(c);
            let shortcut_mode = if meta {
                mode::META_SHORTCUT
            } else {
                mode::CTRL_SHORTCUT
            };
            return match byte_code(lower) {
                Some(code) => send(Command::SystemRemap {
                    mode: shortcut_mode,
                    key: code,
                }),
                None => KeyAction::Send(Vec::new()),
            };
        }
    }

    if let Some(code) = nav_code(key) {
        return send(Command::KeyEvent {
            code,
            nav: true,
            modifiers,
        });
    }

    match ch.and_then(byte_code) {
        Some(code) => send(Command::KeyEvent {
            code,
            nav: false,
            modifiers,
        }),
        None => KeyAction::Send(Vec::new()),
    }
}

fn send(command: Command) -> KeyAction {
    KeyAction::Send(vec![command])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(key: &str, modifiers: Modifiers, now_ms: f64) -> KeyAction {
        route_key(&mut GestureDetector::new(), key, modifiers, now_ms)
    }

    #[test]
    fn test_nav_table() {
        assert_eq!(nav_code("Backspace"), Some(8));
        assert_eq!(nav_code("Enter"), Some(13));
        assert_eq!(nav_code("ArrowDown"), Some(40));
        assert_eq!(nav_code("Home"), Some(36));
        assert_eq!(nav_code("F1"), Some(112));
        assert_eq!(nav_code("F12"), Some(123));
        assert_eq!(nav_code("F13"), None);
        assert_eq!(nav_code("F"), None);
        assert_eq!(nav_code("Escape"), None);
    }

    #[test]
    fn test_plain_character_keeps_modifiers() {
        assert_eq!(
            route("A", Modifiers::SHIFT, 0.0),
            KeyAction::Send(vec![Command::KeyEvent {
                code: b'A',
                nav: false,
                modifiers: Modifiers::SHIFT
            }])
        );
    }

    #[test]
    fn test_nav_key_sets_flag() {
        let mods = Modifiers::from_flags(true, false, true, false);
        assert_eq!(
            route("PageDown", mods, 0.0),
            KeyAction::Send(vec![Command::KeyEvent {
                code: 34,
                nav: true,
                modifiers: mods
            }])
        );
    }

    #[test]
    fn test_shortcuts_lowercase_the_key() {
        assert_eq!(
            route("C", Modifiers::CTRL | Modifiers::SHIFT, 0.0),
            KeyAction::Send(vec![Command::SystemRemap { mode: 3, key: b'c' }])
        );
        assert_eq!(
            route("z", Modifiers::META, 0.0),
            KeyAction::Send(vec![Command::SystemRemap { mode: 4, key: b'z' }])
        );
    }

    #[test]
    fn test_system_remaps() {
        assert_eq!(
            route("`", Modifiers::CTRL, 0.0),
            KeyAction::Send(vec![Command::SystemRemap { mode: 4, key: 96 }])
        );
        assert_eq!(
            route("Tab", Modifiers::CTRL, 0.0),
            KeyAction::Send(vec![Command::SystemRemap { mode: 4, key: 9 }])
        );
        // Tab without Ctrl is plain navigation
        assert_eq!(
            route("Tab", Modifiers::NONE, 0.0),
            KeyAction::Send(vec![Command::KeyEvent {
                code: 9,
                nav: true,
                modifiers: Modifiers::NONE
            }])
        );
    }

    #[test]
    fn test_backtick_goes_through_gesture() {
        let mut gestures = GestureDetector::new();
        assert_eq!(
            route_key(&mut gestures, "`", Modifiers::NONE, 0.0),
            KeyAction::Send(vec![])
        );
        assert_eq!(gestures.triple_tap.count(), 1);
    }

    #[test]
    fn test_double_ctrl_v_requests_burst_paste() {
        let mut gestures = GestureDetector::new();
        assert_eq!(
            route_key(&mut gestures, "v", Modifiers::CTRL, 1000.0),
            KeyAction::Send(vec![Command::SystemRemap { mode: 3, key: b'v' }])
        );
        assert_eq!(
            route_key(&mut gestures, "v", Modifiers::CTRL, 1200.0),
            KeyAction::BurstPaste
        );
    }

    #[test]
    fn test_unmappable_keys_are_ignored() {
        assert_eq!(route("Escape", Modifiers::NONE, 0.0), KeyAction::Send(vec![]));
        assert_eq!(route("Shift", Modifiers::SHIFT, 0.0), KeyAction::Send(vec![]));
        assert_eq!(route("€", Modifiers::NONE, 0.0), KeyAction::Send(vec![]));
        assert_eq!(route("\u{80}", Modifiers::NONE, 0.0), KeyAction::Send(vec![]));
    }

    #[test]
    fn test_latin1_characters_pass_through() {
        assert_eq!(
            route("é", Modifiers::NONE, 0.0),
            KeyAction::Send(vec![Command::KeyEvent {
                code: 0xE9,
                nav: false,
                modifiers: Modifiers::NONE
            }])
        );
    }
}
