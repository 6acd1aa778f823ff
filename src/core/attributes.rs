//! Display attributes set by SGR
//!
//! Colors are stored as palette indices and resolved against the
//! [`Palette`](super::Palette) at draw time.

use serde::{Deserialize, Serialize};

use super::{Palette, Rgb};

/// Default foreground palette index
pub const DEFAULT_FOREGROUND: u8 = 7;
/// Default background palette index
pub const DEFAULT_BACKGROUND: u8 = 0;

/// Current text-rendering attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayAttributes {
    pub bright: bool,
    pub underline: bool,
    pub blink: bool,
    pub reverse: bool,
    pub hidden: bool,
    /// Foreground palette index
    pub foreground: u8,
    /// Background palette index
    pub background: u8,
}

impl Default for DisplayAttributes {
    fn default() -> Self {
        Self {
            bright: false,
            underline: false,
            blink: false,
            reverse: false,
            hidden: false,
            foreground: DEFAULT_FOREGROUND,
            background: DEFAULT_BACKGROUND,
        }
    }
}

impl DisplayAttributes {
    /// Reset all flags and colors (SGR 0)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Resolve the (foreground, background) colors a glyph is drawn with
    pub fn resolve(&self, palette: &Palette) -> (Rgb, Rgb) {
        if self.reverse {
            (
                palette.reversed(self.foreground),
                palette.reversed(self.background),
            )
        } else {
            (palette.color(self.foreground), palette.color(self.background))
        }
    }

    /// Color used to fill cleared or vacated cells
    pub fn fill_color(&self, palette: &Palette) -> Rgb {
        palette.color(self.background)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let attrs = DisplayAttributes::default();
        assert_eq!(attrs.foreground, 7);
        assert_eq!(attrs.background, 0);
        assert!(!attrs.bright && !attrs.underline && !attrs.blink);
        assert!(!attrs.reverse && !attrs.hidden);
    }

    #[test]
    fn test_reset() {
        let mut attrs = DisplayAttributes {
            bright: true,
            reverse: true,
            foreground: 200,
            ..Default::default()
        };
        attrs.reset();
        assert_eq!(attrs, DisplayAttributes::default());
    }

    #[test]
    fn test_resolve_reverse_inverts() {
        let palette = Palette::new();
        let mut attrs = DisplayAttributes::default();
        assert_eq!(attrs.resolve(&palette), (palette.color(7), Rgb::BLACK));

        attrs.reverse = true;
        assert_eq!(
            attrs.resolve(&palette),
            (palette.color(7).inverted(), Rgb::WHITE)
        );
        // Fills never use the reversed color
        assert_eq!(attrs.fill_color(&palette), Rgb::BLACK);
    }
}
