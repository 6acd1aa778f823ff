//! Pixel canvas
//!
//! A plain RGB framebuffer with the handful of primitives the render surface
//! needs: rectangle fill and blend, clipped image get/put, overlap-safe block
//! copy and in-place rotation of a horizontal band.

use std::io::{self, Write};

use crate::core::Rgb;

/// A rectangular block of pixels lifted off a canvas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl Image {
    /// Image dimensions in pixels
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Pixel at (x, y)
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// Whether every pixel has the given color
    pub fn is_uniform(&self, color: Rgb) -> bool {
        self.pixels.iter().all(|&p| p == color)
    }

    /// Raw pixels in row-major order
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }
}

/// Row-major RGB framebuffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl Canvas {
    /// Create a canvas filled with one color
    pub fn new(width: usize, height: usize, fill: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw pixels in row-major order
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Pixel at (x, y)
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Set one pixel; out-of-bounds writes are ignored
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Rgb) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Clip a rectangle to the canvas, returning (x0, y0, x1, y1)
    fn clip(&self, x: usize, y: usize, w: usize, h: usize) -> (usize, usize, usize, usize) {
        let x0 = x.min(self.width);
        let y0 = y.min(self.height);
        let x1 = x.saturating_add(w).min(self.width);
        let y1 = y.saturating_add(h).min(self.height);
        (x0, y0, x1, y1)
    }

    /// Fill a rectangle with a color
    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: Rgb) {
        let (x0, y0, x1, y1) = self.clip(x, y, w, h);
        for py in y0..y1 {
            let start = py * self.width;
            self.pixels[start + x0..start + x1].fill(color);
        }
    }

    /// Composite a translucent color over a rectangle
    pub fn blend_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: Rgb, alpha: f32) {
        let (x0, y0, x1, y1) = self.clip(x, y, w, h);
        for py in y0..y1 {
            let start = py * self.width;
            for pixel in &mut self.pixels[start + x0..start + x1] {
                *pixel = pixel.blend(color, alpha);
            }
        }
    }

    /// Copy out a rectangle (clipped to the canvas)
    pub fn get_image(&self, x: usize, y: usize, w: usize, h: usize) -> Image {
        let (x0, y0, x1, y1) = self.clip(x, y, w, h);
        let mut pixels = Vec::with_capacity((x1 - x0) * (y1 - y0));
        for py in y0..y1 {
            let start = py * self.width;
            pixels.extend_from_slice(&self.pixels[start + x0..start + x1]);
        }
        Image {
            width: x1 - x0,
            height: y1 - y0,
            pixels,
        }
    }

    /// Paste an image with its top-left corner at (x, y), clipped
    pub fn put_image(&mut self, image: &Image, x: usize, y: usize) {
        let (x0, y0, x1, y1) = self.clip(x, y, image.width, image.height);
        let w = x1 - x0;
        for (iy, py) in (y0..y1).enumerate() {
            let src = iy * image.width;
            let dst = py * self.width + x0;
            self.pixels[dst..dst + w].copy_from_slice(&image.pixels[src..src + w]);
        }
    }

    /// Copy a rectangle to another position; source and destination may overlap
    pub fn copy_rect(&mut self, sx: usize, sy: usize, w: usize, h: usize, dx: usize, dy: usize) {
        let block = self.get_image(sx, sy, w, h);
        self.put_image(&block, dx, dy);
    }

    /// Rotate the pixel rows `[y, y + h)` upwards by `shift` rows
    ///
    /// Row `y + shift` ends up at `y`; the rows that fall off the top wrap
    /// around to the bottom of the band.
    pub fn rotate_band(&mut self, y: usize, h: usize, shift: usize) {
        let (_, y0, _, y1) = self.clip(0, y, self.width, h);
        let rows = y1 - y0;
        if rows == 0 {
            return;
        }
        let band = &mut self.pixels[y0 * self.width..y1 * self.width];
        band.rotate_left((shift % rows) * self.width);
    }

    /// A new canvas of a different size keeping the overlapping pixels
    pub fn resized(&self, width: usize, height: usize, fill: Rgb) -> Self {
        let mut canvas = Canvas::new(width, height, fill);
        let overlap = self.get_image(0, 0, width, height);
        canvas.put_image(&overlap, 0, 0);
        canvas
    }

    /// Write the canvas as a binary PPM (P6) image
    pub fn write_ppm<W: Write>(&self, mut out: W) -> io::Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        let mut bytes = Vec::with_capacity(self.pixels.len() * 3);
        for pixel in &self.pixels {
            bytes.extend_from_slice(&[pixel.r, pixel.g, pixel.b]);
        }
        out.write_all(&bytes)?;
        out.flush()
    }
}
