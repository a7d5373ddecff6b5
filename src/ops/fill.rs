use std::collections::{HashSet, VecDeque};

use crate::canvas::{CanvasError, Color, DirtyBounds, PixelRect, PixelSurface, Point};

/// What a flood fill did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillOutcome {
    /// `pixels` were recoloured inside `bounds`.
    Filled { pixels: usize, bounds: PixelRect },
    /// The seed lies in the toolbar band; nothing was touched.
    SeedInToolbar,
    /// The seed already has the replacement colour; nothing was touched.
    AlreadyFilled,
}

impl FillOutcome {
    pub fn pixels(&self) -> usize {
        match self {
            FillOutcome::Filled { pixels, .. } => *pixels,
            _ => 0,
        }
    }
}

/// Recolour the 4-connected region of same-coloured pixels around `seed`.
///
/// Breadth-first over up/down/left/right neighbours, confined to the drawable
/// region. Every dequeued pixel is written before its neighbours are examined
/// and a neighbour is marked visited before it is enqueued, so no pixel is
/// queued twice. The seed colour is captured once before any write. The
/// visited set only ever holds region pixels, so memory tracks the region
/// rather than the surface.
pub fn flood_fill(
    surface: &mut PixelSurface,
    seed: Point,
    replacement: Color,
) -> Result<FillOutcome, CanvasError> {
    if surface.in_toolbar(seed.0, seed.1) {
        return Ok(FillOutcome::SeedInToolbar);
    }
    let target = surface.get_pixel(seed.0, seed.1)?;
    if target == replacement {
        return Ok(FillOutcome::AlreadyFilled);
    }

    let region = surface.drawable_rect();
    let mut visited: HashSet<(u32, u32)> = HashSet::new();
    let mut queue: VecDeque<(u32, u32)> = VecDeque::new();
    let mut bounds = DirtyBounds::default();
    let mut filled = 0usize;

    let start = (seed.0 as u32, seed.1 as u32);
    visited.insert(start);
    queue.push_back(start);

    while let Some((x, y)) = queue.pop_front() {
        surface.set_pixel_at(x, y, replacement);
        bounds.include(x, y);
        filled += 1;

        let neighbors = [
            (x as i64 + 1, y as i64),
            (x as i64 - 1, y as i64),
            (x as i64, y as i64 + 1),
            (x as i64, y as i64 - 1),
        ];

        for (nx, ny) in neighbors {
            if nx < region.x as i64
                || ny < region.y as i64
                || nx >= region.right() as i64
                || ny >= region.bottom() as i64
            {
                continue;
            }
            let next = (nx as u32, ny as u32);
            if !visited.contains(&next) && surface.pixel_at(next.0, next.1) == target {
                visited.insert(next);
                queue.push_back(next);
            }
        }
    }

    // The seed is always filled, so bounds is never empty here.
    let bounds = bounds.to_rect().unwrap_or(PixelRect::new(start.0, start.1, 1, 1));
    Ok(FillOutcome::Filled { pixels: filled, bounds })
}
