//! Pixel rendering
//!
//! The render surface is the only record of screen content. It owns the
//! framebuffer, the glyph rasterizer (fontdue, or a built-in bitmap font), the scroll rotation with its coalescing
//! scheduler, and the cursor highlight overlay.

mod canvas;
mod font;
mod scheduler;
mod surface;

pub use canvas::{Canvas, Image};
pub use font::{
    load_rasterizer, BuiltinFont, FontError, FontdueRasterizer, GlyphCache, GlyphMask,
    GlyphRasterizer,
};
pub use scheduler::{ScrollScheduler, DEFAULT_FLUSH_DELAY};
pub use surface::{GlyphPaint, Surface, DEFAULT_HIGHLIGHT_ALPHA};
