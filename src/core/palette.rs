//! Color palette
//!
//! The palette is fixed at startup and holds 256 concrete colors:
//! - 0-15: the 16 ANSI colors (8 regular, 8 bright)
//! - 16-231: a 6x6x6 color cube
//! - 232-255: a 24-step grayscale ramp
//!
//! Every entry also has a precomputed channel-inverted counterpart which is
//! what the reverse-video attribute renders with.

use serde::{Deserialize, Serialize};

/// A concrete 24-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    /// Create a new color from its channels
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a color from a packed `0xRRGGBB` value
    pub const fn from_hex(hex: u32) -> Self {
        Self::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// Per-channel inversion (`255 - channel`)
    pub const fn inverted(self) -> Self {
        Self::new(255 - self.r, 255 - self.g, 255 - self.b)
    }

    /// Composite `over` on top of `self` with the given opacity (0.0 - 1.0)
    pub fn blend(self, over: Rgb, alpha: f32) -> Self {
        let alpha = alpha.clamp(0.0, 1.0);
        let mix = |under: u8, over: u8| -> u8 {
            let value = f32::from(under) * (1.0 - alpha) + f32::from(over) * alpha;
            value.round().clamp(0.0, 255.0) as u8
        };
        Self::new(mix(self.r, over.r), mix(self.g, over.g), mix(self.b, over.b))
    }
}

/// The 16 ANSI colors; the default foreground (7) is full white
const ANSI_COLORS: [u32; 16] = [
    0x000000, // 0: Black
    0xAA0000, // 1: Red
    0x00AA00, // 2: Green
    0xAA5500, // 3: Yellow (brown)
    0x0000AA, // 4: Blue
    0xAA00AA, // 5: Magenta
    0x00AAAA, // 6: Cyan
    0xFFFFFF, // 7: White
    0x555555, // 8: Bright Black
    0xFF5555, // 9: Bright Red
    0x55FF55, // 10: Bright Green
    0xFFFF55, // 11: Bright Yellow
    0x5555FF, // 12: Bright Blue
    0xFF55FF, // 13: Bright Magenta
    0x55FFFF, // 14: Bright Cyan
    0xFFFFFF, // 15: Bright White
];

/// Number of entries in the palette
pub const PALETTE_SIZE: usize = 256;

/// Fixed 256-color table plus its reverse-video lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; PALETTE_SIZE],
    reversed: [Rgb; PALETTE_SIZE],
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl Palette {
    /// Build the standard palette
    pub fn new() -> Self {
        let mut colors = [Rgb::BLACK; PALETTE_SIZE];

        for (slot, hex) in colors.iter_mut().zip(ANSI_COLORS) {
            *slot = Rgb::from_hex(hex);
        }

        // 16-231: color cube, red varies slowest
        let mut index = 16;
        for red in 0..6u8 {
            for green in 0..6u8 {
                for blue in 0..6u8 {
                    colors[index] = Rgb::new(cube_level(red), cube_level(green), cube_level(blue));
                    index += 1;
                }
            }
        }

        // 232-255: grayscale ramp
        for level in 0..24u8 {
            let gray = 8 + 10 * level;
            colors[index] = Rgb::new(gray, gray, gray);
            index += 1;
        }

        let mut reversed = [Rgb::BLACK; PALETTE_SIZE];
        for (slot, color) in reversed.iter_mut().zip(colors) {
            *slot = color.inverted();
        }

        Self { colors, reversed }
    }

    /// Concrete color for a palette index
    pub fn color(&self, index: u8) -> Rgb {
        self.colors[usize::from(index)]
    }

    /// Channel-inverted color for a palette index (reverse video)
    pub fn reversed(&self, index: u8) -> Rgb {
        self.reversed[usize::from(index)]
    }

    /// All 256 colors in index order
    pub fn colors(&self) -> &[Rgb; PALETTE_SIZE] {
        &self.colors
    }
}

/// Component value of a color cube level (0-5)
fn cube_level(level: u8) -> u8 {
    if level == 0 {
        0
    } else {
        55 + 40 * level
    }
}
