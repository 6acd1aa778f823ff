//! Terminal mode sets
//!
//! Two independent sets of integer mode numbers: DEC private modes (`CSI ? Pm h`)
//! and ANSI modes (`CSI Pm h`). Only presence matters; any id may be set,
//! known or not. The ids below are the private modes with a behavioral effect.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// DECCKM - application cursor keys
pub const APPLICATION_CURSOR_KEYS: u16 = 1;
/// Blinking cursor (recorded, no effect)
pub const BLINKING_CURSOR: u16 = 12;
/// DECTCEM - show cursor
pub const SHOW_CURSOR: u16 = 25;
/// Normal mouse tracking (press and release)
pub const MOUSE_NORMAL: u16 = 1000;
/// Button-event mouse tracking
pub const MOUSE_BUTTON_EVENT: u16 = 1002;
/// Any-event mouse tracking
pub const MOUSE_ANY_EVENT: u16 = 1003;
/// Eight bit input (recorded, no effect)
pub const EIGHT_BIT_INPUT: u16 = 1034;
/// Alternate screen buffer with saved cursor
pub const ALTERNATE_SCREEN: u16 = 1049;

/// A set of active mode numbers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSet(BTreeSet<u16>);

impl ModeSet {
    /// Create an empty mode set
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a mode as set
    pub fn set(&mut self, mode: u16) {
        self.0.insert(mode);
    }

    /// Remove a mode
    pub fn reset(&mut self, mode: u16) {
        self.0.remove(&mode);
    }

    /// Whether a mode is currently set
    pub fn is_set(&self, mode: u16) -> bool {
        self.0.contains(&mode)
    }

    /// Active modes in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}

/// Private and ANSI modes together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modes {
    /// DEC private modes (`?`-prefixed)
    pub private: ModeSet,
    /// ANSI modes
    pub ansi: ModeSet,
}

impl Default for Modes {
    fn default() -> Self {
        let mut private = ModeSet::new();
        // Cursor is shown by default
        private.set(SHOW_CURSOR);
        Self {
            private,
            ansi: ModeSet::new(),
        }
    }
}

impl Modes {
    /// Create the power-on mode state
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cursor highlight should be drawn
    pub fn cursor_visible(&self) -> bool {
        self.private.is_set(SHOW_CURSOR)
    }

    /// Whether arrow keys use the application (SS3) encoding
    pub fn application_cursor_keys(&self) -> bool {
        self.private.is_set(APPLICATION_CURSOR_KEYS)
    }

    /// Whether any mouse reporting mode is active
    pub fn mouse_reporting(&self) -> bool {
        [MOUSE_NORMAL, MOUSE_BUTTON_EVENT, MOUSE_ANY_EVENT]
            .iter()
            .any(|&mode| self.private.is_set(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_modes() {
        let modes = Modes::new();
        assert!(modes.cursor_visible());
        assert!(!modes.application_cursor_keys());
        assert!(!modes.mouse_reporting());
        assert_eq!(modes.ansi.iter().count(), 0);
    }

    #[test]
    fn test_set_and_reset() {
        let mut set = ModeSet::new();
        set.set(4);
        set.set(4);
        assert!(set.is_set(4));
        set.reset(4);
        assert!(!set.is_set(4));
        // Resetting an absent mode is harmless
        set.reset(20);
        assert_eq!(set, ModeSet::new());
    }

    #[test]
    fn test_mouse_variants() {
        for mode in [MOUSE_NORMAL, MOUSE_BUTTON_EVENT, MOUSE_ANY_EVENT] {
            let mut modes = Modes::new();
            modes.private.set(mode);
            assert!(modes.mouse_reporting());
        }
    }

    #[test]
    fn test_private_and_ansi_are_independent() {
        let mut modes = Modes::new();
        modes.ansi.set(SHOW_CURSOR);
        modes.private.reset(SHOW_CURSOR);
        assert!(!modes.cursor_visible());
        assert!(modes.ansi.is_set(SHOW_CURSOR));
    }
}
