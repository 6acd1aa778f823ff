//! Units produced by the decoder
//!
//! Each unit is one complete, independently dispatchable piece of the
//! inbound stream: a printable byte, a C0 control, a plain ESC sequence,
//! a CSI command or an OSC string.

use serde::{Deserialize, Serialize};

use super::params::Params;
use super::SequenceError;

/// A decoded unit of the inbound stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    /// Printable byte in `[32, 126]`
    Print(u8),
    /// C0 control character
    Control(ControlCode),
    /// `ESC` followed by a fixed-length final
    Esc(EscCommand),
    /// `ESC [ args final`
    Csi(CsiCommand),
    /// `ESC ] body BEL`
    Osc(OscCommand),
}

/// Recognized C0 control characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlCode {
    /// 0x07 BEL
    Bell,
    /// 0x08 BS
    Backspace,
    /// 0x09 HT
    Tab,
    /// 0x0A LF
    LineFeed,
    /// 0x0D CR
    CarriageReturn,
}

impl ControlCode {
    /// Map a byte to a recognized control code
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x07 => Some(ControlCode::Bell),
            0x08 => Some(ControlCode::Backspace),
            0x09 => Some(ControlCode::Tab),
            0x0A => Some(ControlCode::LineFeed),
            0x0D => Some(ControlCode::CarriageReturn),
            _ => None,
        }
    }
}

/// Plain (non-CSI, non-OSC) escape sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscCommand {
    /// ESC = - application keypad
    KeypadApplication,
    /// ESC > - normal keypad
    KeypadNormal,
    /// ESC M - reverse index
    ReverseIndex,
    /// ESC ( c - designate G0 character set
    DesignateCharset(u8),
    /// ESC 7 - save cursor position
    SaveCursor,
    /// ESC 8 - restore cursor position
    RestoreCursor,
}

/// A CSI command: everything between `ESC [` and the final byte, plus the final byte
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsiCommand {
    /// Argument text before the final byte (may carry a `?` or `>` prefix)
    pub args: String,
    /// Final byte, one of `[A-Za-z@]`
    pub final_byte: u8,
}

impl CsiCommand {
    /// Create a command from its argument text and final byte
    pub fn new(args: impl Into<String>, final_byte: u8) -> Self {
        Self {
            args: args.into(),
            final_byte,
        }
    }

    /// Whether the arguments carry the DEC private marker `?`
    pub fn is_private(&self) -> bool {
        self.args.starts_with('?')
    }

    /// Whether the arguments carry the secondary marker `>`
    pub fn is_secondary(&self) -> bool {
        self.args.starts_with('>')
    }

    /// Parse the arguments as a `;`-separated numeric list
    pub fn params(&self) -> Result<Params, SequenceError> {
        Params::parse(&self.args)
    }
}

/// An OSC command: `id;payload`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OscCommand {
    /// Everything between `ESC ]` and the terminator
    pub body: String,
}

impl OscCommand {
    /// Create a command from its body
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// The command id (first `;`-separated field)
    pub fn id(&self) -> &str {
        self.body.split(';').next().unwrap_or("")
    }

    /// The payload (second field), if present; later fields are ignored
    pub fn payload(&self) -> Option<&str> {
        self.body.split(';').nth(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_codes() {
        assert_eq!(ControlCode::from_byte(0x07), Some(ControlCode::Bell));
        assert_eq!(ControlCode::from_byte(b'\n'), Some(ControlCode::LineFeed));
        assert_eq!(ControlCode::from_byte(0x0B), None);
        assert_eq!(ControlCode::from_byte(b'A'), None);
    }

    #[test]
    fn test_csi_markers() {
        assert!(CsiCommand::new("?25", b'h').is_private());
        assert!(!CsiCommand::new("25", b'h').is_private());
        assert!(CsiCommand::new(">", b'c').is_secondary());
    }

    #[test]
    fn test_private_marker_is_not_numeric() {
        assert!(CsiCommand::new("?1;1049", b'h').params().is_err());
        assert_eq!(CsiCommand::new("1;1049", b'h').params().unwrap().get(1, 0), 1049);
    }

    #[test]
    fn test_osc_fields() {
        let osc = OscCommand::new("0;user@host: ~;x");
        assert_eq!(osc.id(), "0");
        assert_eq!(osc.payload(), Some("user@host: ~"));
        assert_eq!(OscCommand::new("2").payload(), None);
    }

    #[test]
    fn test_unit_serialization() {
        let unit = Unit::Csi(CsiCommand::new("1;2", b'H'));
        let json = serde_json::to_string(&unit).unwrap();
        let restored: Unit = serde_json::from_str(&json).unwrap();
        assert_eq!(unit, restored);
    }
}
