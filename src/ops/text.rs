use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};

use crate::canvas::{Color, DirtyBounds, PixelRect, PixelSurface, Point};

/// Smallest font pixel size the text tool renders at.
pub const MIN_FONT_SIZE: f32 = 14.0;

/// Font pixel size for a given brush size: `max(14, size * 4)`.
pub fn canvas_font_size(brush_size: u32) -> f32 {
    (brush_size as f32 * 4.0).max(MIN_FONT_SIZE)
}

/// Metrics of a laid-out single line, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    pub ascent: f32,
    pub line_height: f32,
}

impl TextExtent {
    /// Box the line occupies when its top-left corner sits at `anchor`.
    pub fn rect_at(&self, anchor: Point) -> (Point, Point) {
        let w = self.width.ceil() as i32;
        let h = self.line_height.ceil() as i32;
        (anchor, (anchor.0 + w - 1, anchor.1 + h - 1))
    }
}

/// Glyph rasterizer for the text tool.
#[derive(Clone)]
pub struct TextRenderer {
    font: FontArc,
}

impl TextRenderer {
    pub fn new(font: FontArc) -> Self {
        Self { font }
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ab_glyph::InvalidFont> {
        FontArc::try_from_vec(data).map(Self::new)
    }

    /// Load the proportional font egui ships with, so the canvas text matches
    /// the toolbar and no system font lookup is needed.
    pub fn from_egui_defaults() -> Option<Self> {
        let defs = egui::FontDefinitions::default();
        let data = defs
            .font_data
            .get("Ubuntu-Light")
            .or_else(|| defs.font_data.values().next())?;
        match Self::from_bytes(data.font.to_vec()) {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                log_warn!("Text: bundled font could not be parsed: {}", e);
                None
            }
        }
    }

    /// Left-aligned glyph positions along a baseline at y = ascent.
    fn layout(&self, text: &str, font_size: f32) -> (Vec<(GlyphId, f32)>, TextExtent) {
        let scaled = self.font.as_scaled(font_size);
        let mut glyphs = Vec::with_capacity(text.len());
        let mut cursor_x = 0.0f32;
        let mut last: Option<GlyphId> = None;

        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(prev) = last {
                cursor_x += scaled.kern(prev, id);
            }
            glyphs.push((id, cursor_x));
            cursor_x += scaled.h_advance(id);
            last = Some(id);
        }

        let extent = TextExtent {
            width: cursor_x,
            ascent: scaled.ascent(),
            line_height: scaled.height(),
        };
        (glyphs, extent)
    }

    pub fn measure(&self, text: &str, font_size: f32) -> TextExtent {
        self.layout(text, font_size).1
    }

    /// Blend `text` onto the drawable region with its top-left at `anchor`.
    /// Returns the bounds of the pixels touched.
    pub fn stamp(
        &self,
        surface: &mut PixelSurface,
        text: &str,
        anchor: Point,
        font_size: f32,
        color: Color,
    ) -> Option<PixelRect> {
        let (glyphs, extent) = self.layout(text, font_size);
        let origin_x = anchor.0 as f32;
        let baseline = anchor.1 as f32 + extent.ascent;
        let mut bounds = DirtyBounds::default();

        for (id, gx) in glyphs {
            let glyph = id.with_scale_and_position(font_size, point(origin_x + gx, baseline));
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let b = outlined.px_bounds();
            let (bx, by) = (b.min.x as i32, b.min.y as i32);
            outlined.draw(|px, py, cov| {
                let x = bx + px as i32;
                let y = by + py as i32;
                if surface.blend(x, y, color, cov) {
                    bounds.include(x as u32, y as u32);
                }
            });
        }
        bounds.to_rect()
    }
}

/// Colours of the in-progress text box.
pub const PREVIEW_BOX: Color = image::Rgba([240, 240, 240, 255]);
pub const PREVIEW_BORDER: Color = image::Rgba([100, 100, 100, 255]);

/// Draw the editing chrome: a light box inflated 2 px around the pending text
/// (plus caret cell), a 1 px border, then the text and, when `caret_visible`,
/// a trailing `_`.
pub fn draw_text_preview(
    surface: &mut PixelSurface,
    renderer: &TextRenderer,
    anchor: Point,
    buffer: &str,
    font_size: f32,
    color: Color,
    caret_visible: bool,
) {
    let caret = if caret_visible { "_" } else { " " };
    let line = format!("{}{}", buffer, caret);
    let extent = renderer.measure(&line, font_size);
    let (min, max) = extent.rect_at(anchor);
    let (min, max) = ((min.0 - 2, min.1 - 2), (max.0 + 2, max.1 + 2));

    let drawable = surface.drawable_rect();
    surface.fill_rect(drawable.clip_inclusive(min, max), PREVIEW_BOX);
    for x in min.0..=max.0 {
        surface.paint(x, min.1, PREVIEW_BORDER);
        surface.paint(x, max.1, PREVIEW_BORDER);
    }
    for y in min.1..=max.1 {
        surface.paint(min.0, y, PREVIEW_BORDER);
        surface.paint(max.0, y, PREVIEW_BORDER);
    }

    renderer.stamp(surface, &line, anchor, font_size, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{BLACK, WHITE};

    fn renderer() -> TextRenderer {
        TextRenderer::from_egui_defaults().expect("egui ships a default font")
    }

    fn dark_pixels(s: &PixelSurface) -> usize {
        let mut n = 0;
        for y in 0..s.height() as i32 {
            for x in 0..s.width() as i32 {
                if s.get_pixel(x, y).unwrap()[0] < 128 {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn font_size_has_a_floor() {
        assert_eq!(canvas_font_size(1), 14.0);
        assert_eq!(canvas_font_size(3), 14.0);
        assert_eq!(canvas_font_size(5), 20.0);
        assert_eq!(canvas_font_size(50), 200.0);
    }

    #[test]
    fn longer_text_measures_wider() {
        let r = renderer();
        let short = r.measure("Hi", 20.0);
        let long = r.measure("Hi there", 20.0);
        assert!(long.width > short.width);
        assert_eq!(short.line_height, long.line_height);
        assert_eq!(r.measure("", 20.0).width, 0.0);
    }

    #[test]
    fn stamp_paints_below_and_right_of_anchor() {
        let r = renderer();
        let mut s = PixelSurface::new(200, 80, 10, WHITE);
        let bounds = r.stamp(&mut s, "Hello", (20, 30), 20.0, BLACK).unwrap();
        assert!(bounds.x >= 19 && bounds.y >= 30);
        assert!(dark_pixels(&s) > 20);
    }

    #[test]
    fn stamp_never_touches_the_toolbar() {
        let r = renderer();
        let mut s = PixelSurface::new(200, 80, 20, WHITE);
        r.stamp(&mut s, "Clip", (10, 8), 28.0, BLACK);
        for y in 0..20 {
            for x in 0..200 {
                assert_eq!(s.get_pixel(x, y).unwrap(), WHITE);
            }
        }
    }

    #[test]
    fn whitespace_stamps_nothing() {
        let r = renderer();
        let mut s = PixelSurface::new(100, 60, 0, WHITE);
        assert!(r.stamp(&mut s, "   ", (5, 5), 20.0, BLACK).is_none());
    }

    #[test]
    fn preview_draws_box_and_border() {
        let r = renderer();
        let mut s = PixelSurface::new(200, 80, 0, WHITE);
        draw_text_preview(&mut s, &r, (20, 20), "", 20.0, BLACK, false);
        assert_eq!(s.get_pixel(18, 18).unwrap(), PREVIEW_BORDER);
        assert_eq!(s.get_pixel(20, 20).unwrap(), PREVIEW_BOX);
    }
}
