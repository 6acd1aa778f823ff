//! Terminal escape sequence decoder
//!
//! Converts the inbound byte stream into dispatchable units. The decoder
//! recognizes the subset of ECMA-48/VT100/xterm shapes used by real programs
//! and carries partial sequences across chunk boundaries.

mod actions;
mod decoder;
mod params;

use thiserror::Error;

pub use actions::{ControlCode, CsiCommand, EscCommand, OscCommand, Unit};
pub use decoder::{Decoder, MAX_PENDING_CSI, MAX_PENDING_OSC};
pub use params::{parse_field, Params};

/// A malformed sequence; aborts only the unit it occurred in
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("invalid numeric argument {0:?}")]
    InvalidInteger(String),

    #[error("negative numeric argument {0:?}")]
    NegativeInteger(String),

    #[error("invalid scroll region: top {top} is not above bottom {bottom}")]
    BadScrollRegion { top: usize, bottom: usize },

    #[error("palette index {0} out of range")]
    BadColorIndex(u32),

    #[error("unsupported extended color selector {0:?}")]
    BadColorSelector(Option<u32>),

    #[error("extended color is missing its palette index")]
    MissingColorIndex,
}
