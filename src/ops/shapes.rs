use rayon::prelude::*;

use crate::canvas::{Color, DirtyBounds, PixelRect, PixelSurface, Point};
use crate::ops::stroke::within_radius;

/// Shape primitives offered by the drag tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Triangle,
}

impl ShapeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::Circle => "Circle",
            ShapeKind::Triangle => "Triangle",
        }
    }
}

/// How a shape is painted. `Filled` is expressed to the rasterizers as
/// thickness 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShapeFillMode {
    #[default]
    Outline,
    Filled,
}

impl ShapeFillMode {
    /// Thickness handed to the rasterizers for a given brush size.
    pub fn thickness(&self, brush_size: u32) -> u32 {
        match self {
            ShapeFillMode::Outline => brush_size.max(1),
            ShapeFillMode::Filled => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeFillMode::Outline => "outline",
            ShapeFillMode::Filled => "filled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outline" => Some(ShapeFillMode::Outline),
            "filled" | "fill" => Some(ShapeFillMode::Filled),
            _ => None,
        }
    }
}

/// Result of a shape preview draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeOutcome {
    /// Pixels were written within these bounds.
    Drawn(PixelRect),
    /// Zero-area shape; nothing was drawn.
    Degenerate,
    /// Non-degenerate but entirely outside the drawable region.
    Clipped,
}

// ============================================================================
// Geometry
// ============================================================================

/// Canonical `(x, y, width, height)` of the box spanned by two drag corners.
pub fn normalize_rect(c1: Point, c2: Point) -> (i32, i32, u32, u32) {
    let x = c1.0.min(c2.0);
    let y = c1.1.min(c2.1);
    let w = (c1.0 - c2.0).unsigned_abs();
    let h = (c1.1 - c2.1).unsigned_abs();
    (x, y, w, h)
}

/// Euclidean distance from `center` to `edge`, rounded, never below 1.
pub fn circle_radius(center: Point, edge: Point) -> u32 {
    let dx = (edge.0 - center.0) as f64;
    let dy = (edge.1 - center.1) as f64;
    ((dx * dx + dy * dy).sqrt().round() as u32).max(1)
}

/// Isosceles triangle for two drag corners: apex centred on the first
/// corner's row, base along the second corner's row.
pub fn triangle_vertices(c1: Point, c2: Point) -> [Point; 3] {
    let (x1, y1) = c1;
    let (x2, y2) = c2;
    [(x1 + (x2 - x1).div_euclid(2), y1), (x1, y2), (x2, y2)]
}

/// Distance from `(px, py)` to the segment `a`–`b`.
fn distance_to_segment(px: f32, py: f32, a: Point, b: Point) -> f32 {
    let (ax, ay) = (a.0 as f32, a.1 as f32);
    let (bx, by) = (b.0 as f32, b.1 as f32);
    let (abx, aby) = (bx - ax, by - ay);
    let len_sq = abx * abx + aby * aby;
    let t = if len_sq > 0.0 {
        (((px - ax) * abx + (py - ay) * aby) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (ax + abx * t - px, ay + aby * t - py);
    (cx * cx + cy * cy).sqrt()
}

/// Edge function: which side of `a`→`b` the point lies on.
#[inline]
fn edge(a: Point, b: Point, p: Point) -> i64 {
    (b.0 as i64 - a.0 as i64) * (p.1 as i64 - a.1 as i64)
        - (b.1 as i64 - a.1 as i64) * (p.0 as i64 - a.0 as i64)
}

fn inside_triangle(v: &[Point; 3], p: Point) -> bool {
    let e0 = edge(v[0], v[1], p);
    let e1 = edge(v[1], v[2], p);
    let e2 = edge(v[2], v[0], p);
    (e0 >= 0 && e1 >= 0 && e2 >= 0) || (e0 <= 0 && e1 <= 0 && e2 <= 0)
}

// ============================================================================
// Mask rasterization
// ============================================================================

/// Evaluate `inside` for every pixel of `rect` (rows in parallel), then write
/// the covered pixels. The mask is complete before the surface is touched.
fn rasterize_mask<F>(surface: &mut PixelSurface, rect: PixelRect, color: Color, inside: F) -> ShapeOutcome
where
    F: Fn(i32, i32) -> bool + Sync,
{
    if rect.is_empty() {
        return ShapeOutcome::Clipped;
    }
    let row_len = rect.width as usize;
    let mut mask = vec![0u8; row_len * rect.height as usize];

    mask.par_chunks_mut(row_len).enumerate().for_each(|(row, row_buf)| {
        let py = rect.y as i32 + row as i32;
        for (col, cell) in row_buf.iter_mut().enumerate() {
            if inside(rect.x as i32 + col as i32, py) {
                *cell = 1;
            }
        }
    });

    let mut bounds = DirtyBounds::default();
    for (i, _) in mask.iter().enumerate().filter(|(_, m)| **m != 0) {
        let x = rect.x + (i % row_len) as u32;
        let y = rect.y + (i / row_len) as u32;
        surface.set_pixel_at(x, y, color);
        bounds.include(x, y);
    }
    bounds.to_rect().map_or(ShapeOutcome::Clipped, ShapeOutcome::Drawn)
}

// ============================================================================
// Previews
// ============================================================================

/// Rectangle spanned by two corners. The outline band of `thickness` lies
/// inside the box; thickness 0 fills it. Zero width or height draws nothing.
pub fn preview_rectangle(
    surface: &mut PixelSurface,
    corner1: Point,
    corner2: Point,
    thickness: u32,
    color: Color,
) -> ShapeOutcome {
    let (x, y, w, h) = normalize_rect(corner1, corner2);
    if w == 0 || h == 0 {
        return ShapeOutcome::Degenerate;
    }
    let (x1, y1) = (x + w as i32, y + h as i32);
    let t = thickness as i32;
    let filled = thickness == 0 || 2 * thickness >= w.min(h);

    let clip = surface.drawable_rect().clip_inclusive((x, y), (x1 - 1, y1 - 1));
    rasterize_mask(surface, clip, color, |px, py| {
        filled || px < x + t || px >= x1 - t || py < y + t || py >= y1 - t
    })
}

/// Circle around `center` passing through `edge_point`. The outline ring of
/// `thickness` lies inside the radius; thickness 0 (or ≥ radius) fills it.
pub fn preview_circle(
    surface: &mut PixelSurface,
    center: Point,
    edge_point: Point,
    thickness: u32,
    color: Color,
) -> ShapeOutcome {
    let r = circle_radius(center, edge_point) as i64;
    let inner = if thickness == 0 || thickness as i64 >= r {
        None
    } else {
        Some(r - thickness as i64)
    };

    let ri = r as i32;
    let clip = surface
        .drawable_rect()
        .clip_inclusive((center.0 - ri, center.1 - ri), (center.0 + ri, center.1 + ri));
    let (cx, cy) = (center.0 as i64, center.1 as i64);
    rasterize_mask(surface, clip, color, |px, py| {
        let dx = px as i64 - cx;
        let dy = py as i64 - cy;
        let d2 = dx * dx + dy * dy;
        within_radius(d2, r) && inner.map_or(true, |ir| !within_radius(d2, ir))
    })
}

/// Triangle from [`triangle_vertices`]. Edges are `thickness` wide, centred on
/// the edge lines; thickness 0 fills it. Zero-area drags draw nothing.
pub fn preview_triangle(
    surface: &mut PixelSurface,
    corner1: Point,
    corner2: Point,
    thickness: u32,
    color: Color,
) -> ShapeOutcome {
    if corner1.0 == corner2.0 || corner1.1 == corner2.1 {
        return ShapeOutcome::Degenerate;
    }
    let v = triangle_vertices(corner1, corner2);
    let half = (thickness as f32 * 0.5).max(0.5);
    let pad = half.ceil() as i32;

    let min = (
        v.iter().map(|p| p.0).min().unwrap_or(0) - pad,
        v.iter().map(|p| p.1).min().unwrap_or(0) - pad,
    );
    let max = (
        v.iter().map(|p| p.0).max().unwrap_or(0) + pad,
        v.iter().map(|p| p.1).max().unwrap_or(0) + pad,
    );
    let clip = surface.drawable_rect().clip_inclusive(min, max);

    if thickness == 0 {
        return rasterize_mask(surface, clip, color, |px, py| inside_triangle(&v, (px, py)));
    }
    rasterize_mask(surface, clip, color, |px, py| {
        let (fx, fy) = (px as f32, py as f32);
        distance_to_segment(fx, fy, v[0], v[1]) <= half
            || distance_to_segment(fx, fy, v[1], v[2]) <= half
            || distance_to_segment(fx, fy, v[2], v[0]) <= half
    })
}

/// Dispatch to the preview for `kind`, from the drag anchor to the pointer.
pub fn preview_shape(
    kind: ShapeKind,
    surface: &mut PixelSurface,
    anchor: Point,
    current: Point,
    thickness: u32,
    color: Color,
) -> ShapeOutcome {
    match kind {
        ShapeKind::Rectangle => preview_rectangle(surface, anchor, current, thickness, color),
        ShapeKind::Circle => preview_circle(surface, anchor, current, thickness, color),
        ShapeKind::Triangle => preview_triangle(surface, anchor, current, thickness, color),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{BLACK, WHITE};

    fn surface() -> PixelSurface {
        PixelSurface::new(120, 80, 5, WHITE)
    }

    fn black_at(s: &PixelSurface, x: i32, y: i32) -> bool {
        s.get_pixel(x, y).unwrap() == BLACK
    }

    #[test]
    fn rectangle_with_equal_corners_draws_nothing() {
        let mut s = surface();
        let before = s.snapshot();
        assert_eq!(preview_rectangle(&mut s, (30, 30), (30, 30), 3, BLACK), ShapeOutcome::Degenerate);
        assert_eq!(preview_rectangle(&mut s, (10, 30), (60, 30), 3, BLACK), ShapeOutcome::Degenerate);
        assert!(s.matches(&before));
    }

    #[test]
    fn rectangle_normalizes_corners() {
        assert_eq!(normalize_rect((50, 40), (10, 20)), (10, 20, 40, 20));
        let mut a = surface();
        let mut b = surface();
        preview_rectangle(&mut a, (50, 40), (10, 20), 2, BLACK);
        preview_rectangle(&mut b, (10, 20), (50, 40), 2, BLACK);
        assert!(a.matches(&b.snapshot()));
    }

    #[test]
    fn rectangle_outline_band_lies_inside_the_box() {
        let mut s = surface();
        let outcome = preview_rectangle(&mut s, (10, 20), (50, 40), 2, BLACK);
        assert_eq!(outcome, ShapeOutcome::Drawn(PixelRect::new(10, 20, 40, 20)));
        assert!(black_at(&s, 10, 20));
        assert!(black_at(&s, 11, 30));
        assert!(!black_at(&s, 12, 30));
        assert!(black_at(&s, 49, 39));
        assert!(!black_at(&s, 50, 40));
        assert!(!black_at(&s, 30, 30));
    }

    #[test]
    fn rectangle_thickness_zero_fills() {
        let mut s = surface();
        preview_rectangle(&mut s, (10, 20), (20, 30), 0, BLACK);
        for y in 20..30 {
            for x in 10..20 {
                assert!(black_at(&s, x, y));
            }
        }
    }

    #[test]
    fn circle_radius_rounds_and_clamps() {
        assert_eq!(circle_radius((0, 0), (3, 4)), 5);
        assert_eq!(circle_radius((0, 0), (1, 1)), 1);
        assert_eq!(circle_radius((7, 7), (7, 7)), 1);
    }

    #[test]
    fn zero_length_circle_still_paints() {
        let mut s = surface();
        let outcome = preview_circle(&mut s, (40, 40), (40, 40), 3, BLACK);
        assert!(matches!(outcome, ShapeOutcome::Drawn(_)));
        assert!(black_at(&s, 40, 40));
    }

    #[test]
    fn circle_outline_is_a_ring() {
        let mut s = surface();
        preview_circle(&mut s, (60, 40), (80, 40), 2, BLACK);
        assert!(black_at(&s, 80, 40));
        assert!(black_at(&s, 60, 20));
        assert!(black_at(&s, 79, 40));
        assert!(!black_at(&s, 60, 40));
        assert!(!black_at(&s, 75, 40));
        assert!(!black_at(&s, 82, 40));
    }

    #[test]
    fn circle_is_clipped_at_the_toolbar() {
        let mut s = surface();
        preview_circle(&mut s, (60, 8), (60, 30), 0, BLACK);
        for y in 0..5 {
            for x in 0..120 {
                assert!(!black_at(&s, x, y));
            }
        }
        assert!(black_at(&s, 60, 5));
    }

    #[test]
    fn triangle_vertices_follow_the_drag_box() {
        assert_eq!(triangle_vertices((0, 0), (100, 50)), [(50, 0), (0, 50), (100, 50)]);
        // Right-to-left drags floor towards the left corner.
        assert_eq!(triangle_vertices((11, 0), (0, 9)), [(5, 0), (11, 9), (0, 9)]);
    }

    #[test]
    fn triangle_outline_touches_all_vertices() {
        let mut s = surface();
        let outcome = preview_triangle(&mut s, (10, 10), (70, 60), 1, BLACK);
        assert!(matches!(outcome, ShapeOutcome::Drawn(_)));
        for (x, y) in triangle_vertices((10, 10), (70, 60)) {
            assert!(black_at(&s, x, y), "vertex ({}, {})", x, y);
        }
        assert!(black_at(&s, 40, 60));
        assert!(!black_at(&s, 40, 45));
    }

    #[test]
    fn filled_triangle_covers_interior() {
        let mut s = surface();
        preview_triangle(&mut s, (10, 10), (70, 60), 0, BLACK);
        assert!(black_at(&s, 40, 45));
        assert!(!black_at(&s, 12, 12));
    }

    #[test]
    fn flat_triangle_is_degenerate() {
        let mut s = surface();
        let before = s.snapshot();
        assert_eq!(preview_triangle(&mut s, (10, 30), (70, 30), 2, BLACK), ShapeOutcome::Degenerate);
        assert_eq!(preview_triangle(&mut s, (10, 30), (10, 70), 2, BLACK), ShapeOutcome::Degenerate);
        assert!(s.matches(&before));
    }

    #[test]
    fn shape_entirely_in_toolbar_reports_clipped() {
        let mut s = surface();
        assert_eq!(preview_rectangle(&mut s, (0, 0), (20, 4), 1, BLACK), ShapeOutcome::Clipped);
    }

    #[test]
    fn fill_mode_maps_to_thickness() {
        assert_eq!(ShapeFillMode::Outline.thickness(5), 5);
        assert_eq!(ShapeFillMode::Filled.thickness(5), 0);
        assert_eq!(ShapeFillMode::parse(" Filled "), Some(ShapeFillMode::Filled));
        assert_eq!(ShapeFillMode::parse("dotted"), None);
    }
}
