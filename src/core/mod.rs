//! Terminal Core Module
//!
//! Platform-independent terminal state. This module contains:
//! - The fixed 256-color palette and its reverse-video lookup
//! - Display attributes set by SGR
//! - Cursor position and scrolling region
//! - Private and ANSI mode sets
//! - Deterministic snapshot generation
//!
//! None of these types touch pixels; the render surface lives in
//! [`crate::render`].

mod attributes;
mod cursor;
pub mod modes;
mod palette;
mod snapshot;

pub use attributes::{DisplayAttributes, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
pub use cursor::{Cursor, ScrollRegion};
pub use modes::{ModeSet, Modes};
pub use palette::{Palette, Rgb, PALETTE_SIZE};
pub use snapshot::Snapshot;
