//! Deterministic state snapshots
//!
//! A snapshot captures the protocol-visible terminal state (everything except
//! the pixels) in a serializable form for tests and the headless runner.
//! Given the same byte stream, the terminal produces identical snapshots.

use serde::{Deserialize, Serialize};

use super::{Cursor, DisplayAttributes, ScrollRegion};

/// Serializable terminal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Screen dimensions
    pub cols: usize,
    pub rows: usize,
    /// Cursor position
    pub cursor: Cursor,
    /// Scrolling region
    pub scroll_region: ScrollRegion,
    /// Active DEC private modes, ascending
    pub private_modes: Vec<u16>,
    /// Active ANSI modes, ascending
    pub ansi_modes: Vec<u16>,
    /// Current SGR state
    pub attributes: DisplayAttributes,
    /// Application keypad flag (ESC = / ESC >)
    pub keypad_application: bool,
    /// Window title
    pub title: String,
    /// Whether an alternate screen snapshot is held
    pub alternate_screen: bool,
    /// Outstanding (not yet reconciled) scroll rotation
    pub pending_rotation: usize,
}

impl Snapshot {
    /// Serialize to pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
