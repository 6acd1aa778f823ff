//! Input Encoding Module
//!
//! Translates normalized keyboard and pointer events into the byte
//! sequences a shell expects.
//!
//! # Keyboard Encoding
//!
//! Special keys come from a static table, except the four arrow keys whose
//! entries switch between the normal (`CSI A`) and application (`SS3 A`)
//! variants under DECCKM. Keys not in the table fall back to:
//! - Ctrl+letter: the control code (`letter - 64`)
//! - Alt+letter: `ESC` followed by the letter
//! - Ctrl+Space: `ESC @`
//!
//! Anything else is left to the host's ordinary text input path
//! ([`encode_text`]).
//!
//! # Mouse Encoding
//!
//! X10/normal tracking: `CSI M Cb Cx Cy`, each byte offset by 32 and the
//! coordinates 1-based. Reporting is gated by the terminal's mouse modes.

use serde::{Deserialize, Serialize};

/// Keyboard modifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    /// Bits added to a mouse button byte: shift 4, alt 8, ctrl 16
    fn mouse_bits(&self) -> u8 {
        let mut bits = 0;
        if self.shift {
            bits += 4;
        }
        if self.alt {
            bits += 8;
        }
        if self.ctrl {
            bits += 16;
        }
        bits
    }
}

/// Normalized key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Backspace,
    Tab,
    Escape,
    PageUp,
    PageDown,
    End,
    Home,
    Left,
    Up,
    Right,
    Down,
    Delete,
    /// Function key F1-F12
    F(u8),
    Space,
    /// Letter key, as its uppercase ASCII code
    Letter(u8),
    /// Any other key, by browser key code
    Other(u16),
}

impl KeyCode {
    /// Map a browser (`KeyboardEvent.keyCode`) key code
    pub fn from_dom(code: u16) -> Self {
        match code {
            8 => KeyCode::Backspace,
            9 => KeyCode::Tab,
            27 => KeyCode::Escape,
            32 => KeyCode::Space,
            33 => KeyCode::PageUp,
            34 => KeyCode::PageDown,
            35 => KeyCode::End,
            36 => KeyCode::Home,
            37 => KeyCode::Left,
            38 => KeyCode::Up,
            39 => KeyCode::Right,
            40 => KeyCode::Down,
            46 => KeyCode::Delete,
            65..=90 => KeyCode::Letter(code as u8),
            112..=123 => KeyCode::F((code - 111) as u8),
            other => KeyCode::Other(other),
        }
    }
}

/// A key press with its modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// A key press without modifiers
    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, Modifiers::NONE)
    }
}

/// Key table with the DECCKM-switchable arrow keys
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    application_cursor_keys: bool,
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the arrow keys between normal and application encodings
    pub fn set_application_cursor_keys(&mut self, enabled: bool) {
        self.application_cursor_keys = enabled;
    }

    pub fn application_cursor_keys(&self) -> bool {
        self.application_cursor_keys
    }

    /// Table entry for a key, if it has one
    fn lookup(&self, code: KeyCode) -> Option<&'static [u8]> {
        let app = self.application_cursor_keys;
        let bytes: &'static [u8] = match code {
            KeyCode::Backspace => b"\x08",
            KeyCode::Tab => b"\x09",
            KeyCode::Escape => b"\x1b",
            KeyCode::PageUp => b"\x1b[5~",
            KeyCode::PageDown => b"\x1b[6~",
            KeyCode::End => b"\x1b[4~",
            KeyCode::Home => b"\x1b[1~",
            KeyCode::Delete => b"\x1b[3~",
            KeyCode::Up if app => b"\x1bOA",
            KeyCode::Down if app => b"\x1bOB",
            KeyCode::Right if app => b"\x1bOC",
            KeyCode::Left if app => b"\x1bOD",
            KeyCode::Up => b"\x1b[A",
            KeyCode::Down => b"\x1b[B",
            KeyCode::Right => b"\x1b[C",
            KeyCode::Left => b"\x1b[D",
            KeyCode::F(1) => b"\x1bOP",
            KeyCode::F(2) => b"\x1bOQ",
            KeyCode::F(3) => b"\x1bOR",
            KeyCode::F(4) => b"\x1bOS",
            KeyCode::F(5) => b"\x1b[15~",
            KeyCode::F(6) => b"\x1b[17~",
            KeyCode::F(7) => b"\x1b[18~",
            KeyCode::F(8) => b"\x1b[19~",
            KeyCode::F(9) => b"\x1b[20~",
            KeyCode::F(10) => b"\x1b[21~",
            KeyCode::F(11) => b"\x1b[23~",
            KeyCode::F(12) => b"\x1b[24~",
            _ => return None,
        };
        Some(bytes)
    }

    /// Encode a key press, or `None` if the host should handle it as text
    pub fn encode(&self, event: &KeyEvent) -> Option<Vec<u8>> {
        if let Some(bytes) = self.lookup(event.code) {
            return Some(bytes.to_vec());
        }

        let mods = event.modifiers;
        match event.code {
            KeyCode::Letter(code) if mods.ctrl && code.is_ascii_alphabetic() => {
                Some(vec![code.to_ascii_uppercase() - 64])
            }
            KeyCode::Letter(code) if mods.alt && code.is_ascii_alphabetic() => {
                let letter = if mods.shift {
                    code.to_ascii_uppercase()
                } else {
                    code.to_ascii_lowercase()
                };
                Some(vec![0x1b, letter])
            }
            KeyCode::Space if mods.ctrl => Some(b"\x1b@".to_vec()),
            _ => None,
        }
    }
}

/// Encode ordinary typed text
pub fn encode_text(c: char) -> Vec<u8> {
    let mut buf = [0u8; 4];
    c.encode_utf8(&mut buf).as_bytes().to_vec()
}

/// Mouse button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Wheel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WheelDirection {
    Up,
    Down,
}

/// What happened at the pointer position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerAction {
    Press(MouseButton),
    Release(MouseButton),
    Wheel(WheelDirection),
}

/// Pointer event in surface pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub action: PointerAction,
    pub x: usize,
    pub y: usize,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(action: PointerAction, x: usize, y: usize) -> Self {
        Self {
            action,
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Encode a pointer event as `CSI M Cb Cx Cy`
///
/// Release adds 3 to the pressed button's code rather than reporting
/// button 3, so the release of middle and right stay distinguishable.
pub fn encode_pointer(event: &PointerEvent, cell_width: usize, cell_height: usize) -> Vec<u8> {
    let button = match event.action {
        PointerAction::Press(button) => button_code(button),
        PointerAction::Release(button) => button_code(button) + 3,
        PointerAction::Wheel(WheelDirection::Up) => 64,
        PointerAction::Wheel(WheelDirection::Down) => 65,
    };
    let cb = 32 + button + event.modifiers.mouse_bits();

    let col = event.x / cell_width.max(1);
    let row = event.y / cell_height.max(1);
    vec![0x1b, b'[', b'M', cb, coordinate_byte(col), coordinate_byte(row)]
}

fn button_code(button: MouseButton) -> u8 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
    }
}

/// `32 + coordinate + 1`, saturating at 255
fn coordinate_byte(coordinate: usize) -> u8 {
    u8::try_from(coordinate.saturating_add(33)).unwrap_or(u8::MAX)
}
