//! Render surface
//!
//! The pixel grid is the only record of what is on screen. Scrolling inside
//! the scroll region is done by rotating a row offset instead of moving
//! pixels: logical row `r` in `[top, bottom)` lives at physical row
//! `((r - top + rotation) % height) + top`. A scroll therefore costs one row
//! fill. The physical band is put back in address order later, in a single
//! rotation, either when the [`ScrollScheduler`] deadline passes or right
//! before any operation that addresses pixels by absolute row (block moves,
//! clears, snapshots, region changes, resize).
//!
//! The cursor highlight is an overlay: the pixels under it are kept in a
//! single backing image and put back before the next batch of input.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use super::canvas::{Canvas, Image};
use super::font::{BuiltinFont, GlyphCache, GlyphRasterizer};
use super::scheduler::{ScrollScheduler, DEFAULT_FLUSH_DELAY};
use crate::core::{Rgb, ScrollRegion};

/// Default cursor highlight opacity
pub const DEFAULT_HIGHLIGHT_ALPHA: f32 = 0.25;

/// How a glyph is painted into its cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphPaint {
    pub foreground: Rgb,
    pub background: Rgb,
    pub underline: bool,
    pub hidden: bool,
}

/// Pixels saved from under the cursor highlight
#[derive(Debug, Clone)]
struct CursorBacking {
    /// Logical row, translated again at restore time
    row: usize,
    col: usize,
    image: Image,
}

/// Pixel surface with deferred scroll reconciliation
#[derive(Debug)]
pub struct Surface {
    cols: usize,
    rows: usize,
    cell_width: usize,
    cell_height: usize,
    background: Rgb,
    canvas: Canvas,
    region: ScrollRegion,
    rotation: usize,
    scheduler: ScrollScheduler,
    backing: Option<CursorBacking>,
    highlight: Rgb,
    highlight_alpha: f32,
    glyphs: GlyphCache,
}

impl Surface {
    /// Create a surface of `cols x rows` cells filled with `background`
    pub fn new(
        cols: usize,
        rows: usize,
        cell_width: usize,
        cell_height: usize,
        background: Rgb,
    ) -> Self {
        Self {
            cols,
            rows,
            cell_width,
            cell_height,
            background,
            canvas: Canvas::new(cols * cell_width, rows * cell_height, background),
            region: ScrollRegion::full(rows),
            rotation: 0,
            scheduler: ScrollScheduler::new(DEFAULT_FLUSH_DELAY),
            backing: None,
            highlight: Rgb::WHITE,
            highlight_alpha: DEFAULT_HIGHLIGHT_ALPHA,
            glyphs: GlyphCache::new(Box::new(BuiltinFont), cell_width, cell_height),
        }
    }

    /// Use a different quiescent delay for coalesced scrolls
    pub fn with_flush_delay(mut self, delay: Duration) -> Self {
        self.scheduler = ScrollScheduler::new(delay);
        self
    }

    /// Use a different cursor highlight
    pub fn with_highlight(mut self, color: Rgb, alpha: f32) -> Self {
        self.highlight = color;
        self.highlight_alpha = alpha;
        self
    }

    /// Use a different glyph rasterizer
    pub fn with_rasterizer(mut self, rasterizer: Box<dyn GlyphRasterizer + Send>) -> Self {
        self.glyphs = GlyphCache::new(rasterizer, self.cell_width, self.cell_height);
        self
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Cell size in pixels (width, height)
    pub fn cell_size(&self) -> (usize, usize) {
        (self.cell_width, self.cell_height)
    }

    pub fn region(&self) -> ScrollRegion {
        self.region
    }

    /// Scroll rotation not yet reconciled into address order
    pub fn pending_rotation(&self) -> usize {
        self.rotation
    }

    /// When the coalesced blit is due, if one is pending
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    /// The raw canvas; rows inside the region may still be rotated
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Map a logical row to the physical pixel row that holds it
    pub fn translate_row(&self, row: usize) -> usize {
        if self.rotation == 0 || !self.region.contains(row) {
            return row;
        }
        let ScrollRegion { top, .. } = self.region;
        (row - top + self.rotation) % self.region.height() + top
    }

    fn fill_physical_row(&mut self, physical: usize, color: Rgb) {
        let (w, h) = (self.cols * self.cell_width, self.cell_height);
        self.canvas.fill_rect(0, physical * h, w, h, color);
    }

    /// Draw a printable byte at a logical cell
    pub fn draw_glyph(&mut self, row: usize, col: usize, byte: u8, paint: GlyphPaint) {
        if row >= self.rows || col >= self.cols {
            return;
        }
        let (cw, ch) = (self.cell_width, self.cell_height);
        let x = col * cw;
        let y = self.translate_row(row) * ch;

        self.canvas.fill_rect(x, y, cw, ch, paint.background);
        if paint.hidden {
            return;
        }

        let mask = self.glyphs.get(byte);
        for (gx, gy) in mask.ink() {
            self.canvas.set_pixel(x + gx, y + gy, paint.foreground);
        }
        if paint.underline {
            self.canvas
                .fill_rect(x, y + ch.saturating_sub(2), cw, 1, paint.foreground);
        }
    }

    /// Scroll the region up `n` lines, filling the vacated bottom rows
    pub fn scroll_up(&mut self, n: usize, fill: Rgb, now: Instant) {
        let height = self.region.height();
        if n == 0 || height == 0 {
            return;
        }
        self.rotation = (self.rotation + n % height) % height;
        let vacated = self.region.bottom - n.min(height)..self.region.bottom;
        for row in vacated {
            self.fill_physical_row(self.translate_row(row), fill);
        }
        self.after_rotation(now);
    }

    /// Scroll the region down `n` lines, filling the vacated top rows
    pub fn scroll_down(&mut self, n: usize, fill: Rgb, now: Instant) {
        let height = self.region.height();
        if n == 0 || height == 0 {
            return;
        }
        self.rotation = (self.rotation + height - n % height) % height;
        let vacated = self.region.top..self.region.top + n.min(height);
        for row in vacated {
            self.fill_physical_row(self.translate_row(row), fill);
        }
        self.after_rotation(now);
    }

    fn after_rotation(&mut self, now: Instant) {
        if self.rotation == 0 {
            self.scheduler.cancel();
        } else {
            self.scheduler.schedule(now);
        }
    }

    /// Put the scroll band back into address order
    pub fn flush_scroll(&mut self) {
        self.scheduler.cancel();
        if self.rotation == 0 {
            return;
        }
        let ch = self.cell_height;
        self.canvas.rotate_band(
            self.region.top * ch,
            self.region.height() * ch,
            self.rotation * ch,
        );
        tracing::trace!(rotation = self.rotation, "reconciled scroll region");
        self.rotation = 0;
    }

    /// Run the coalesced blit if its deadline has passed
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.scheduler.take_due(now) {
            self.flush_scroll();
            true
        } else {
            false
        }
    }

    /// Fill the cells `[top, bottom) x [left, right)` with a color
    pub fn clear(&mut self, top: usize, left: usize, bottom: usize, right: usize, color: Rgb) {
        self.flush_scroll();
        let (bottom, right) = (bottom.min(self.rows), right.min(self.cols));
        if top >= bottom || left >= right {
            return;
        }
        let (cw, ch) = (self.cell_width, self.cell_height);
        self.canvas.fill_rect(
            left * cw,
            top * ch,
            (right - left) * cw,
            (bottom - top) * ch,
            color,
        );
    }

    /// Copy the cells `[top, bottom) x [left, right)` so their corner lands at (`row`, `col`)
    pub fn move_block(
        &mut self,
        (top, left): (usize, usize),
        (bottom, right): (usize, usize),
        (row, col): (usize, usize),
    ) {
        self.flush_scroll();
        let (bottom, right) = (bottom.min(self.rows), right.min(self.cols));
        if top >= bottom || left >= right {
            return;
        }
        let (cw, ch) = (self.cell_width, self.cell_height);
        self.canvas.copy_rect(
            left * cw,
            top * ch,
            (right - left) * cw,
            (bottom - top) * ch,
            col * cw,
            row * ch,
        );
    }

    /// Put back the pixels under the cursor highlight, if any
    pub fn hide_cursor(&mut self) {
        if let Some(backing) = self.backing.take() {
            let y = self.translate_row(backing.row) * self.cell_height;
            self.canvas
                .put_image(&backing.image, backing.col * self.cell_width, y);
        }
    }

    /// Save the pixels under a cell and paint the highlight over it
    pub fn show_cursor(&mut self, row: usize, col: usize) {
        self.hide_cursor();
        if self.rows == 0 || self.cols == 0 {
            return;
        }
        let row = row.min(self.rows - 1);
        let col = col.min(self.cols - 1);
        let (cw, ch) = (self.cell_width, self.cell_height);
        let (x, y) = (col * cw, self.translate_row(row) * ch);

        let image = self.canvas.get_image(x, y, cw, ch);
        self.canvas
            .blend_rect(x, y, cw, ch, self.highlight, self.highlight_alpha);
        self.backing = Some(CursorBacking { row, col, image });
    }

    /// Cell the highlight is currently drawn on
    pub fn cursor_cell(&self) -> Option<(usize, usize)> {
        self.backing.as_ref().map(|b| (b.row, b.col))
    }

    /// Pixels of a logical cell, without the cursor highlight
    pub fn cell_image(&self, row: usize, col: usize) -> Image {
        if let Some(backing) = &self.backing {
            if backing.row == row && backing.col == col {
                return backing.image.clone();
            }
        }
        let (cw, ch) = (self.cell_width, self.cell_height);
        self.canvas
            .get_image(col * cw, self.translate_row(row) * ch, cw, ch)
    }

    /// Copy of the whole surface in address order
    pub fn snapshot(&mut self) -> Image {
        self.flush_scroll();
        self.canvas
            .get_image(0, 0, self.canvas.width(), self.canvas.height())
    }

    /// Paint a previously taken snapshot back
    pub fn restore(&mut self, image: &Image) {
        self.flush_scroll();
        self.canvas.put_image(image, 0, 0);
    }

    /// Change the scroll region
    pub fn set_region(&mut self, region: ScrollRegion) {
        self.flush_scroll();
        self.region = region;
    }

    /// Re-establish geometry, keeping the pixels that still fit
    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.hide_cursor();
        self.flush_scroll();
        self.canvas = self.canvas.resized(
            cols * self.cell_width,
            rows * self.cell_height,
            self.background,
        );
        self.cols = cols;
        self.rows = rows;
        self.region = ScrollRegion::full(rows);
    }

    /// Cancel pending coalesced work and drop the cursor backing
    pub fn shutdown(&mut self) {
        self.scheduler.cancel();
        self.backing = None;
    }

    /// The surface in address order, including the cursor highlight
    pub fn frame(&mut self) -> &Canvas {
        self.flush_scroll();
        &self.canvas
    }

    /// Export the surface as a binary PPM image
    pub fn write_ppm<W: Write>(&mut self, out: W) -> io::Result<()> {
        self.frame().write_ppm(out)
    }
}
