use crate::canvas::{Color, DirtyBounds, PixelRect, PixelSurface, Point};

/// Squared-distance test for a disc of integer `radius`, biased by half a
/// pixel so small discs come out round rather than as a plus sign.
#[inline]
pub(crate) fn within_radius(d2: i64, radius: i64) -> bool {
    d2 <= radius * radius + radius
}

/// Stamp a filled disc of `radius` at `center`, clipped to the drawable region.
/// Returns the bounds of the pixels written.
pub fn stamp_disc(
    surface: &mut PixelSurface,
    center: Point,
    radius: u32,
    color: Color,
) -> Option<PixelRect> {
    let r = radius as i32;
    let clip = surface
        .drawable_rect()
        .clip_inclusive((center.0 - r, center.1 - r), (center.0 + r, center.1 + r));
    if clip.is_empty() {
        return None;
    }

    let mut bounds = DirtyBounds::default();
    for y in clip.y..clip.bottom() {
        let dy = y as i64 - center.1 as i64;
        for x in clip.x..clip.right() {
            let dx = x as i64 - center.0 as i64;
            if within_radius(dx * dx + dy * dy, r as i64) {
                surface.set_pixel_at(x, y, color);
                bounds.include(x, y);
            }
        }
    }
    bounds.to_rect()
}

/// Draw a gap-free stroke from `from` to `to`.
///
/// Walks the segment in `max(|dx|, |dy|)` uniform steps so consecutive stamp
/// centres are at most one pixel apart on each axis, stamping a disc of
/// radius `thickness` at each step. `from == to` stamps a single dot.
pub fn stamp_line(
    surface: &mut PixelSurface,
    from: Point,
    to: Point,
    thickness: u32,
    color: Color,
) -> Option<PixelRect> {
    let radius = thickness.max(1);
    let dx = to.0 as i64 - from.0 as i64;
    let dy = to.1 as i64 - from.1 as i64;
    let steps = dx.abs().max(dy.abs());

    if steps == 0 {
        return stamp_disc(surface, from, radius, color);
    }

    let mut bounds = DirtyBounds::default();
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = (from.0 as f64 + dx as f64 * t).round() as i32;
        let y = (from.1 as f64 + dy as f64 * t).round() as i32;
        bounds.merge(stamp_disc(surface, (x, y), radius, color));
    }
    bounds.to_rect()
}
