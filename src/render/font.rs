//! Glyph rasterization
//!
//! Glyphs are coverage masks the size of one cell. Outline fonts are
//! rasterized with fontdue and thresholded into a mask sitting on the
//! cell's baseline. When no system monospace font can be loaded, a built-in
//! 5x7 bitmap font scaled by an integer factor is used instead.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use fontdue::{Font, FontSettings};

/// Coverage mask for one cell; `true` pixels are drawn in the foreground color
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphMask {
    width: usize,
    height: usize,
    bits: Vec<bool>,
}

impl GlyphMask {
    /// A mask with no ink
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width * height],
        }
    }

    /// Mask dimensions in pixels
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Whether (x, y) is inked
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.bits[y * self.width + x]
    }

    /// Ink (x, y); out-of-bounds is ignored
    pub fn set(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            self.bits[y * self.width + x] = true;
        }
    }

    /// Inked pixel coordinates
    pub fn ink(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.width;
        self.bits
            .iter()
            .enumerate()
            .filter(|&(_, &on)| on)
            .map(move |(i, _)| (i % width, i / width))
    }
}

/// Turns a printable byte into a cell-sized coverage mask
pub trait GlyphRasterizer {
    fn rasterize(&self, byte: u8, cell_width: usize, cell_height: usize) -> GlyphMask;
}

/// Built-in 5x7 bitmap font covering `[32, 126]`
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFont;

const GLYPH_COLUMNS: usize = 5;
const GLYPH_ROWS: usize = 7;

/// Column-major bitmaps, bit 0 is the top row
#[rustfmt::skip]
const FONT_5X7: [[u8; GLYPH_COLUMNS]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // #
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x55, 0x22, 0x50], // &
    [0x00, 0x05, 0x03, 0x00, 0x00], // '
    [0x00, 0x1C, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1C, 0x00], // )
    [0x08, 0x2A, 0x1C, 0x2A, 0x08], // *
    [0x08, 0x08, 0x3E, 0x08, 0x08], // +
    [0x00, 0x50, 0x30, 0x00, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x60, 0x60, 0x00, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // 0
    [0x00, 0x42, 0x7F, 0x40, 0x00], // 1
    [0x42, 0x61, 0x51, 0x49, 0x46], // 2
    [0x21, 0x41, 0x45, 0x4B, 0x31], // 3
    [0x18, 0x14, 0x12, 0x7F, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // 6
    [0x01, 0x71, 0x09, 0x05, 0x03], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x06, 0x49, 0x49, 0x29, 0x1E], // 9
    [0x00, 0x36, 0x36, 0x00, 0x00], // :
    [0x00, 0x56, 0x36, 0x00, 0x00], // ;
    [0x08, 0x14, 0x22, 0x41, 0x00], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x51, 0x09, 0x06], // ?
    [0x32, 0x49, 0x79, 0x41, 0x3E], // @
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // A
    [0x7F, 0x49, 0x49, 0x49, 0x36], // B
    [0x3E, 0x41, 0x41, 0x41, 0x22], // C
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // D
    [0x7F, 0x49, 0x49, 0x49, 0x41], // E
    [0x7F, 0x09, 0x09, 0x09, 0x01], // F
    [0x3E, 0x41, 0x49, 0x49, 0x7A], // G
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // H
    [0x00, 0x41, 0x7F, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3F, 0x01], // J
    [0x7F, 0x08, 0x14, 0x22, 0x41], // K
    [0x7F, 0x40, 0x40, 0x40, 0x40], // L
    [0x7F, 0x02, 0x0C, 0x02, 0x7F], // M
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // N
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // O
    [0x7F, 0x09, 0x09, 0x09, 0x06], // P
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // Q
    [0x7F, 0x09, 0x19, 0x29, 0x46], // R
    [0x46, 0x49, 0x49, 0x49, 0x31], // S
    [0x01, 0x01, 0x7F, 0x01, 0x01], // T
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // U
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // V
    [0x3F, 0x40, 0x38, 0x40, 0x3F], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x07, 0x08, 0x70, 0x08, 0x07], // Y
    [0x61, 0x51, 0x49, 0x45, 0x43], // Z
    [0x00, 0x7F, 0x41, 0x41, 0x00], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // backslash
    [0x00, 0x41, 0x41, 0x7F, 0x00], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x01, 0x02, 0x04, 0x00], // `
    [0x20, 0x54, 0x54, 0x54, 0x78], // a
    [0x7F, 0x48, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x20], // c
    [0x38, 0x44, 0x44, 0x48, 0x7F], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x08, 0x7E, 0x09, 0x01, 0x02], // f
    [0x0C, 0x52, 0x52, 0x52, 0x3E], // g
    [0x7F, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7D, 0x40, 0x00], // i
    [0x20, 0x40, 0x44, 0x3D, 0x00], // j
    [0x7F, 0x10, 0x28, 0x44, 0x00], // k
    [0x00, 0x41, 0x7F, 0x40, 0x00], // l
    [0x7C, 0x04, 0x18, 0x04, 0x78], // m
    [0x7C, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0x7C, 0x14, 0x14, 0x14, 0x08], // p
    [0x08, 0x14, 0x14, 0x18, 0x7C], // q
    [0x7C, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x20], // s
    [0x04, 0x3F, 0x44, 0x40, 0x20], // t
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // u
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // v
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x0C, 0x50, 0x50, 0x50, 0x3C], // y
    [0x44, 0x64, 0x54, 0x4C, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x7F, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x08, 0x04, 0x08, 0x10, 0x08], // ~
];

impl BuiltinFont {
    /// Bitmap columns for a printable byte
    fn columns(byte: u8) -> Option<&'static [u8; GLYPH_COLUMNS]> {
        let index = usize::from(byte).checked_sub(32)?;
        FONT_5X7.get(index)
    }
}

impl GlyphRasterizer for BuiltinFont {
    fn rasterize(&self, byte: u8, cell_width: usize, cell_height: usize) -> GlyphMask {
        let mut mask = GlyphMask::empty(cell_width, cell_height);
        let Some(columns) = Self::columns(byte) else {
            return mask;
        };

        // Leave a pixel of horizontal and two of vertical breathing room
        let scale = (cell_width.saturating_sub(2) / GLYPH_COLUMNS)
            .min(cell_height.saturating_sub(4) / GLYPH_ROWS)
            .max(1);
        let x_offset = cell_width.saturating_sub(GLYPH_COLUMNS * scale) / 2;
        let y_offset = cell_height.saturating_sub(GLYPH_ROWS * scale) / 2;

        for (gx, bits) in columns.iter().enumerate() {
            for gy in (0..GLYPH_ROWS).filter(|gy| *bits & (1u8 << gy) != 0) {
                for dy in 0..scale {
                    for dx in 0..scale {
                        mask.set(x_offset + gx * scale + dx, y_offset + gy * scale + dy);
                    }
                }
            }
        }
        mask
    }
}

/// Coverage at or above this is ink
const COVERAGE_THRESHOLD: u8 = 128;

/// System monospace fonts, in order of preference
const FONT_PATHS: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/truetype/ubuntu/UbuntuMono-R.ttf",
    "/usr/share/fonts/truetype/freefont/FreeMono.ttf",
];

/// Outline font rasterizer sized to fit the cell
#[derive(Clone)]
pub struct FontdueRasterizer {
    font: Arc<Font>,
    /// Advance of 'M' at 1px
    advance: f32,
    /// Ascent and descent at 1px; descent is negative
    ascent: f32,
    descent: f32,
}

impl FontdueRasterizer {
    /// Load a font file
    pub fn new(font_path: &Path) -> Result<Self, FontError> {
        let font_data = std::fs::read(font_path)?;
        Self::from_bytes(&font_data)
    }

    /// Parse font data
    pub fn from_bytes(font_data: &[u8]) -> Result<Self, FontError> {
        let font = Font::from_bytes(font_data, FontSettings::default())
            .map_err(|e| FontError::Parse(e.to_string()))?;
        Self::from_font(Arc::new(font))
    }

    fn from_font(font: Arc<Font>) -> Result<Self, FontError> {
        let line = font.horizontal_line_metrics(1.0).ok_or(FontError::NoLineMetrics)?;
        let advance = font.metrics('M', 1.0).advance_width;
        if advance <= 0.0 || line.ascent - line.descent <= 0.0 {
            return Err(FontError::NoLineMetrics);
        }
        Ok(Self {
            font,
            advance,
            ascent: line.ascent,
            descent: line.descent,
        })
    }

    /// The first system monospace font that loads, parsed once per process
    pub fn with_default_font() -> Result<Self, FontError> {
        static SYSTEM_FONT: OnceLock<Option<Arc<Font>>> = OnceLock::new();

        let font = SYSTEM_FONT.get_or_init(|| {
            FONT_PATHS.iter().find_map(|path| {
                let data = std::fs::read(path).ok()?;
                let font = Font::from_bytes(data.as_slice(), FontSettings::default()).ok()?;
                tracing::info!(path = *path, "loaded font");
                Some(Arc::new(font))
            })
        });
        match font {
            Some(font) => Self::from_font(Arc::clone(font)),
            None => Err(FontError::NoFontFound),
        }
    }

    /// Pixel size at which the font fills the cell without overflowing it
    fn font_size(&self, cell_width: usize, cell_height: usize) -> f32 {
        let by_width = cell_width as f32 / self.advance;
        let by_height = cell_height as f32 / (self.ascent - self.descent);
        by_width.min(by_height)
    }
}

impl GlyphRasterizer for FontdueRasterizer {
    fn rasterize(&self, byte: u8, cell_width: usize, cell_height: usize) -> GlyphMask {
        let mut mask = GlyphMask::empty(cell_width, cell_height);
        if !(33..=126).contains(&byte) {
            return mask;
        }

        let size = self.font_size(cell_width, cell_height);
        let (metrics, bitmap) = self.font.rasterize(char::from(byte), size);

        // Center the line box vertically, then the advance horizontally
        let line_height = (self.ascent - self.descent) * size;
        let baseline =
            ((cell_height as f32 - line_height) / 2.0 + self.ascent * size).round() as i32;
        let left = ((cell_width as f32 - metrics.advance_width) / 2.0).round() as i32 + metrics.xmin;
        let top = baseline - metrics.ymin - metrics.height as i32;

        for (i, _) in bitmap
            .iter()
            .enumerate()
            .filter(|&(_, &coverage)| coverage >= COVERAGE_THRESHOLD)
        {
            let x = left + (i % metrics.width) as i32;
            let y = top + (i / metrics.width) as i32;
            if let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) {
                mask.set(x, y);
            }
        }
        mask
    }
}

impl fmt::Debug for FontdueRasterizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontdueRasterizer")
            .field("advance", &self.advance)
            .field("ascent", &self.ascent)
            .field("descent", &self.descent)
            .finish()
    }
}

/// Font-related errors
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("font IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("font parse error: {0}")]
    Parse(String),
    #[error("font has no horizontal line metrics")]
    NoLineMetrics,
    #[error("no suitable font found")]
    NoFontFound,
}

/// The rasterizer for a configured font file, else a system monospace
/// font, else the built-in bitmap font
pub fn load_rasterizer(font_path: Option<&Path>) -> Box<dyn GlyphRasterizer + Send> {
    if let Some(path) = font_path {
        match FontdueRasterizer::new(path) {
            Ok(rasterizer) => return Box::new(rasterizer),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring font file"),
        }
    }
    match FontdueRasterizer::with_default_font() {
        Ok(rasterizer) => Box::new(rasterizer),
        Err(e) => {
            tracing::debug!(error = %e, "using built-in bitmap font");
            Box::new(BuiltinFont)
        }
    }
}

/// Caches rasterized glyphs for one cell size
pub struct GlyphCache {
    rasterizer: Box<dyn GlyphRasterizer + Send>,
    cell_width: usize,
    cell_height: usize,
    glyphs: HashMap<u8, GlyphMask>,
}

impl GlyphCache {
    /// Create a cache in front of a rasterizer
    pub fn new(
        rasterizer: Box<dyn GlyphRasterizer + Send>,
        cell_width: usize,
        cell_height: usize,
    ) -> Self {
        Self {
            rasterizer,
            cell_width,
            cell_height,
            glyphs: HashMap::new(),
        }
    }

    /// Rasterize a byte, using the cache if available
    pub fn get(&mut self, byte: u8) -> &GlyphMask {
        let (rasterizer, width, height) = (&self.rasterizer, self.cell_width, self.cell_height);
        self.glyphs
            .entry(byte)
            .or_insert_with(|| rasterizer.rasterize(byte, width, height))
    }

    /// Number of cached glyphs
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

impl fmt::Debug for GlyphCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlyphCache")
            .field("cell_width", &self.cell_width)
            .field("cell_height", &self.cell_height)
            .field("cached", &self.glyphs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_is_blank() {
        let mask = BuiltinFont.rasterize(b' ', 12, 22);
        assert_eq!(mask.size(), (12, 22));
        assert_eq!(mask.ink().count(), 0);
    }

    #[test]
    fn test_printable_glyphs_have_ink() {
        for byte in 33..=126u8 {
            let mask = BuiltinFont.rasterize(byte, 12, 22);
            assert!(mask.ink().count() > 0, "glyph {:?} is blank", byte as char);
        }
    }

    #[test]
    fn test_glyph_is_scaled_and_centered() {
        // 12x22 cell: scale 2, glyph 10x14 at offset (1, 4)
        let mask = BuiltinFont.rasterize(b'|', 12, 22);

        assert!(mask.is_set(5, 4));
        assert!(mask.is_set(6, 17));
        assert!(!mask.is_set(5, 3));
        assert!(!mask.is_set(5, 18));
        assert!(!mask.is_set(4, 10));
    }

    #[test]
    fn test_tiny_cell_does_not_panic() {
        let mask = BuiltinFont.rasterize(b'W', 3, 4);
        assert_eq!(mask.size(), (3, 4));
    }

    #[test]
    fn test_non_printable_is_blank() {
        assert_eq!(BuiltinFont.rasterize(0x7f, 8, 8).ink().count(), 0);
        assert_eq!(BuiltinFont.rasterize(0x1b, 8, 8).ink().count(), 0);
    }

    #[test]
    fn test_fontdue_glyphs_fit_the_cell() {
        // Skip if no system font is available
        let Ok(font) = FontdueRasterizer::with_default_font() else {
            return;
        };

        assert_eq!(font.rasterize(b' ', 12, 22).ink().count(), 0);
        assert_eq!(font.rasterize(0x1b, 12, 22).ink().count(), 0);
        for byte in [b'A', b'g', b'|', b'M', b'W', b'_'] {
            let mask = font.rasterize(byte, 12, 22);
            assert_eq!(mask.size(), (12, 22));
            assert!(mask.ink().count() > 0, "glyph {:?} is blank", byte as char);
        }
    }

    #[test]
    fn test_fontdue_descender_sits_below_baseline() {
        let Ok(font) = FontdueRasterizer::with_default_font() else {
            return;
        };

        let lowest = |byte: u8| font.rasterize(byte, 12, 22).ink().map(|(_, y)| y).max();
        let highest = |byte: u8| font.rasterize(byte, 12, 22).ink().map(|(_, y)| y).min();
        assert!(lowest(b'g') > lowest(b'a'));
        assert!(highest(b'T') < highest(b'a'));
    }

    #[test]
    fn test_fontdue_rejects_garbage() {
        assert!(matches!(
            FontdueRasterizer::from_bytes(b"not a font"),
            Err(FontError::Parse(_))
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FontdueRasterizer::new(&dir.path().join("missing.ttf")),
            Err(FontError::Io(_))
        ));
    }

    #[test]
    fn test_load_rasterizer_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"not a font").unwrap();

        let rasterizer = load_rasterizer(Some(&bogus));
        let mask = rasterizer.rasterize(b'A', 12, 22);
        assert!(mask.ink().count() > 0);
    }

    #[test]
    fn test_cache_reuses_masks() {
        let mut cache = GlyphCache::new(Box::new(BuiltinFont), 8, 12);
        let first = cache.get(b'a').clone();
        let second = cache.get(b'a').clone();
        cache.get(b'b');

        assert_eq!(first, second);
        assert_eq!(cache.len(), 2);
    }
}
