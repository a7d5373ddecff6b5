use std::fmt;
use std::sync::Arc;

use image::{Rgba, RgbaImage};

/// Pixel colour used throughout the engine (straight RGBA, always written opaque).
pub type Color = Rgba<u8>;

/// A position in full-surface coordinates. May lie outside the surface;
/// every consumer bounds-checks or clips.
pub type Point = (i32, i32);

pub const BLACK: Color = Rgba([0, 0, 0, 255]);
pub const WHITE: Color = Rgba([255, 255, 255, 255]);
pub const RED: Color = Rgba([255, 0, 0, 255]);
pub const GREEN: Color = Rgba([0, 255, 0, 255]);
pub const BLUE: Color = Rgba([0, 0, 255, 255]);
pub const YELLOW: Color = Rgba([255, 255, 0, 255]);
pub const CYAN: Color = Rgba([0, 255, 255, 255]);
pub const MAGENTA: Color = Rgba([255, 0, 255, 255]);

// ============================================================================
// ERRORS
// ============================================================================

/// Errors raised by direct pixel access on a [`PixelSurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    /// Coordinate outside the full surface extent. Nothing was written.
    OutOfBounds { x: i32, y: i32, width: u32, height: u32 },
    /// A snapshot of a different size was offered to `restore`.
    SizeMismatch { expected: (u32, u32), found: (u32, u32) },
}

impl fmt::Display for CanvasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanvasError::OutOfBounds { x, y, width, height } => {
                write!(f, "pixel ({}, {}) is outside the {}×{} surface", x, y, width, height)
            }
            CanvasError::SizeMismatch { expected, found } => write!(
                f,
                "snapshot is {}×{} but the surface is {}×{}",
                found.0, found.1, expected.0, expected.1
            ),
        }
    }
}

impl std::error::Error for CanvasError {}

// ============================================================================
// RECTANGLES
// ============================================================================

/// Axis-aligned pixel rectangle, `x..x + width` × `y..y + height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x as i32 && y >= self.y as i32 && x < self.right() as i32 && y < self.bottom() as i32
    }

    /// Intersection with `other`; empty (zero-sized) when they do not overlap.
    pub fn intersect(&self, other: &PixelRect) -> PixelRect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        PixelRect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }

    /// Clamp a signed, inclusive bounding box (`min..=max`) into this rectangle.
    pub fn clip_inclusive(&self, min: Point, max: Point) -> PixelRect {
        let x0 = min.0.max(self.x as i32);
        let y0 = min.1.max(self.y as i32);
        let x1 = (max.0 + 1).min(self.right() as i32);
        let y1 = (max.1 + 1).min(self.bottom() as i32);
        if x1 <= x0 || y1 <= y0 {
            return PixelRect::new(0, 0, 0, 0);
        }
        PixelRect::new(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
    }
}

/// Running bounding box of written pixels.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirtyBounds {
    bounds: Option<(u32, u32, u32, u32)>,
}

impl DirtyBounds {
    #[inline]
    pub fn include(&mut self, x: u32, y: u32) {
        self.bounds = Some(match self.bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    pub fn merge(&mut self, other: Option<PixelRect>) {
        if let Some(r) = other {
            self.include(r.x, r.y);
            self.include(r.right() - 1, r.bottom() - 1);
        }
    }

    pub fn to_rect(self) -> Option<PixelRect> {
        self.bounds
            .map(|(x0, y0, x1, y1)| PixelRect::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Immutable deep copy of a surface's pixels at one instant.
///
/// The pixel buffer sits behind an `Arc` so handing a snapshot around (to the
/// preview restore path, to the frame composer) never copies pixels; there is
/// no mutable access, so a pushed snapshot can never change.
#[derive(Clone)]
pub struct Snapshot {
    pixels: Arc<RgbaImage>,
}

impl Snapshot {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(*self.pixels.get_pixel(x, y))
    }

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn memory_bytes(&self) -> usize {
        self.pixels.as_raw().len()
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.pixels.dimensions() == other.pixels.dimensions()
            && self.pixels.as_raw() == other.pixels.as_raw()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

// ============================================================================
// PIXEL SURFACE
// ============================================================================

/// The live raster. A flat RGBA buffer with a reserved toolbar band of
/// `toolbar_height` rows at the top; engine writes land only below it.
#[derive(Clone)]
pub struct PixelSurface {
    pixels: RgbaImage,
    toolbar_height: u32,
}

impl PixelSurface {
    /// Create a surface filled with `background`. The toolbar band is clamped
    /// so at least one drawable row remains.
    pub fn new(width: u32, height: u32, toolbar_height: u32, background: Color) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let toolbar_height = toolbar_height.min(height - 1);
        Self {
            pixels: RgbaImage::from_pixel(width, height, background),
            toolbar_height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[inline]
    pub fn toolbar_height(&self) -> u32 {
        self.toolbar_height
    }

    /// Full-width rectangle below the toolbar band.
    pub fn drawable_rect(&self) -> PixelRect {
        PixelRect::new(0, self.toolbar_height, self.width(), self.height() - self.toolbar_height)
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }

    #[inline]
    pub fn in_toolbar(&self, _x: i32, y: i32) -> bool {
        y < self.toolbar_height as i32
    }

    #[inline]
    pub fn is_drawable(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && !self.in_toolbar(x, y)
    }

    fn out_of_bounds(&self, x: i32, y: i32) -> CanvasError {
        CanvasError::OutOfBounds { x, y, width: self.width(), height: self.height() }
    }

    // ---- pixel access -------------------------------------------------------

    /// Read a pixel anywhere on the full surface.
    pub fn get_pixel(&self, x: i32, y: i32) -> Result<Color, CanvasError> {
        if !self.in_bounds(x, y) {
            return Err(self.out_of_bounds(x, y));
        }
        Ok(*self.pixels.get_pixel(x as u32, y as u32))
    }

    /// Write a pixel anywhere on the full surface. Rejected before any write
    /// when out of bounds.
    pub fn put_pixel(&mut self, x: i32, y: i32, color: Color) -> Result<(), CanvasError> {
        if !self.in_bounds(x, y) {
            return Err(self.out_of_bounds(x, y));
        }
        self.pixels.put_pixel(x as u32, y as u32, color);
        Ok(())
    }

    /// Raster write used by the drawing ops: silently clipped to the drawable
    /// region. Returns whether the pixel was written.
    #[inline]
    pub fn paint(&mut self, x: i32, y: i32, color: Color) -> bool {
        if !self.is_drawable(x, y) {
            return false;
        }
        self.pixels.put_pixel(x as u32, y as u32, color);
        true
    }

    /// Coverage-weighted write (used for anti-aliased glyphs), clipped to the
    /// drawable region. The result is always opaque.
    pub fn blend(&mut self, x: i32, y: i32, color: Color, coverage: f32) -> bool {
        if coverage <= 0.001 || !self.is_drawable(x, y) {
            return false;
        }
        let cov = coverage.min(1.0);
        let dst = self.pixels.get_pixel_mut(x as u32, y as u32);
        for c in 0..3 {
            let v = color[c] as f32 * cov + dst[c] as f32 * (1.0 - cov);
            dst[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        dst[3] = 255;
        true
    }

    /// Unchecked read for hot loops that have already bounds-checked.
    #[inline]
    pub(crate) fn pixel_at(&self, x: u32, y: u32) -> Color {
        *self.pixels.get_pixel(x, y)
    }

    #[inline]
    pub(crate) fn set_pixel_at(&mut self, x: u32, y: u32, color: Color) {
        self.pixels.put_pixel(x, y, color);
    }

    /// Fill `rect` (clipped to the drawable region) with `color`.
    pub fn fill_rect(&mut self, rect: PixelRect, color: Color) {
        let r = rect.intersect(&self.drawable_rect());
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                self.pixels.put_pixel(x, y, color);
            }
        }
    }

    // ---- snapshots ------------------------------------------------------------

    /// Deep copy of the current pixels.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot { pixels: Arc::new(self.pixels.clone()) }
    }

    /// Overwrite the whole buffer from `snapshot` in one copy.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), CanvasError> {
        let found = snapshot.pixels.dimensions();
        let expected = self.pixels.dimensions();
        if found != expected {
            return Err(CanvasError::SizeMismatch { expected, found });
        }
        self.pixels.copy_from_slice(snapshot.as_raw());
        Ok(())
    }

    /// True when the surface holds exactly the pixels of `snapshot`.
    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        self.pixels.dimensions() == snapshot.pixels.dimensions()
            && self.pixels.as_raw() == snapshot.as_raw()
    }

    // ---- export ---------------------------------------------------------------

    /// Tightly packed RGBA bytes of `rect`, clipped to the surface.
    /// Returns the clipped rectangle alongside the bytes.
    pub fn extract_region_rgba(&self, rect: PixelRect) -> (PixelRect, Vec<u8>) {
        let full = PixelRect::new(0, 0, self.width(), self.height());
        let r = rect.intersect(&full);
        let mut buf = Vec::with_capacity(r.width as usize * r.height as usize * 4);
        let stride = self.width() as usize * 4;
        let raw = self.pixels.as_raw();
        for y in r.y..r.bottom() {
            let start = y as usize * stride + r.x as usize * 4;
            buf.extend_from_slice(&raw[start..start + r.width as usize * 4]);
        }
        (r, buf)
    }

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn as_rgba_image(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl fmt::Debug for PixelSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelSurface")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("toolbar_height", &self.toolbar_height)
            .finish()
    }
}
