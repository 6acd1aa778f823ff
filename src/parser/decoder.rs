//! Escape decoder
//!
//! Splits the inbound byte stream into [`Unit`]s, one at a time. The decoder
//! only recognizes the sequence shapes real terminal programs emit:
//!
//! - C0 controls BEL, BS, HT, LF, CR
//! - `ESC` followed by `= > M 7 8`, and `ESC ( c`
//! - CSI: `ESC [` up to and including the first byte in `[A-Za-z@]`
//! - OSC: `ESC ]` up to BEL or `ESC \`
//! - printable bytes in `[32, 126]`
//!
//! Everything else is logged and dropped. A sequence split across chunk
//! boundaries is held until the next [`Decoder::push`] completes it. A held
//! CSI or OSC that grows past its limit is treated as unterminated: the
//! introducer is dropped and decoding resumes right after it, so bytes
//! already scanned are never lost.

use super::actions::{ControlCode, CsiCommand, EscCommand, OscCommand, Unit};

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// Longest CSI (including `ESC [`) held across chunks before giving up
pub const MAX_PENDING_CSI: usize = 64;
/// Longest OSC (including `ESC ]`) held across chunks before giving up
pub const MAX_PENDING_OSC: usize = 4096;

/// Streaming escape decoder
#[derive(Debug, Default)]
pub struct Decoder {
    buf: Vec<u8>,
    pos: usize,
}

/// Outcome of scanning for a sequence terminator
enum Scan {
    Complete(Unit, usize),
    Incomplete,
}

impl Decoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of inbound bytes
    pub fn push(&mut self, data: &[u8]) {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(data);
    }

    /// Decode the next complete unit, or `None` if more input is needed
    pub fn next_unit(&mut self) -> Option<Unit> {
        loop {
            let rest = &self.buf[self.pos..];
            let &byte = rest.first()?;

            if byte != ESC {
                self.pos += 1;
                if let Some(code) = ControlCode::from_byte(byte) {
                    return Some(Unit::Control(code));
                }
                if (32..=126).contains(&byte) {
                    return Some(Unit::Print(byte));
                }
                tracing::debug!(byte, "dropping unrecognized byte");
                continue;
            }

            let &introducer = rest.get(1)?;
            let fixed = match introducer {
                b'=' => Some(EscCommand::KeypadApplication),
                b'>' => Some(EscCommand::KeypadNormal),
                b'M' => Some(EscCommand::ReverseIndex),
                b'7' => Some(EscCommand::SaveCursor),
                b'8' => Some(EscCommand::RestoreCursor),
                _ => None,
            };
            if let Some(command) = fixed {
                self.pos += 2;
                return Some(Unit::Esc(command));
            }

            let (scan, limit) = match introducer {
                b'(' => {
                    let &designator = rest.get(2)?;
                    self.pos += 3;
                    return Some(Unit::Esc(EscCommand::DesignateCharset(designator)));
                }
                b'[' => (scan_csi(rest), MAX_PENDING_CSI),
                b']' => (scan_osc(rest), MAX_PENDING_OSC),
                other => {
                    tracing::debug!(byte = other, "unrecognized escape sequence");
                    self.pos += 1;
                    continue;
                }
            };

            match scan {
                Scan::Complete(unit, len) => {
                    self.pos += len;
                    return Some(unit);
                }
                Scan::Incomplete if rest.len() <= limit => return None,
                Scan::Incomplete => {
                    tracing::warn!(
                        introducer = %(introducer as char),
                        len = rest.len(),
                        "unterminated sequence"
                    );
                    self.pos += 2;
                }
            }
        }
    }

    /// Decode a chunk and collect every complete unit
    pub fn decode(&mut self, data: &[u8]) -> Vec<Unit> {
        self.push(data);
        std::iter::from_fn(|| self.next_unit()).collect()
    }

    /// Number of bytes held waiting for the rest of a sequence
    pub fn pending(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Drop any held partial sequence
    pub fn reset(&mut self) {
        self.buf.clear();
        self.pos = 0;
    }
}

fn is_csi_final(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'@'
}

/// `rest` starts with `ESC [`
fn scan_csi(rest: &[u8]) -> Scan {
    match rest[2..].iter().position(|&b| is_csi_final(b)) {
        Some(i) => {
            let args = String::from_utf8_lossy(&rest[2..2 + i]).into_owned();
            let final_byte = rest[2 + i];
            Scan::Complete(Unit::Csi(CsiCommand::new(args, final_byte)), 2 + i + 1)
        }
        None => Scan::Incomplete,
    }
}

/// `rest` starts with `ESC ]`
fn scan_osc(rest: &[u8]) -> Scan {
    let body = &rest[2..];
    for (i, &b) in body.iter().enumerate() {
        let terminator = match b {
            BEL => 1,
            ESC if body.get(i + 1) == Some(&b'\\') => 2,
            _ => continue,
        };
        let text = String::from_utf8_lossy(&body[..i]).into_owned();
        return Scan::Complete(Unit::Osc(OscCommand::new(text)), 2 + i + terminator);
    }
    Scan::Incomplete
}
