// ============================================================================
// RASTER PRIMITIVES - pixel writes, brush stamps, Bresenham lines
// ============================================================================
//
// Every primitive writes through `EditCollector`, which bounds-checks, skips
// writes that would not change the pixel and records the real changes.
// ============================================================================

use image::RgbaImage;

use crate::canvas::{PixelColor, PixelEdit};
use crate::ops::shapes::filled_ellipse_into;

/// Replay direction for a recorded edit list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Apply `new_color` (redo).
    Forward,
    /// Apply `old_color` (undo).
    Backward,
}

/// Write sink shared by all primitives of one operation.
pub(crate) struct EditCollector<'a> {
    pixels: &'a mut RgbaImage,
    edits: Vec<PixelEdit>,
}

impl<'a> EditCollector<'a> {
    pub(crate) fn new(pixels: &'a mut RgbaImage) -> Self {
        Self {
            pixels,
            edits: Vec::new(),
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub(crate) fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub(crate) fn pixels(&self) -> &RgbaImage {
        self.pixels
    }

    /// Set one pixel. Out-of-range coordinates and no-op writes are ignored.
    pub(crate) fn put(&mut self, x: i32, y: i32, color: PixelColor) {
        if x < 0 || y < 0 || x as u32 >= self.pixels.width() || y as u32 >= self.pixels.height() {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        let old_color = PixelColor::from_rgba(*self.pixels.get_pixel(x, y));
        if old_color == color {
            return;
        }
        self.pixels.put_pixel(x, y, color.to_rgba());
        self.edits.push(PixelEdit {
            x,
            y,
            old_color,
            new_color: color,
        });
    }

    /// Fill the inclusive horizontal span `[x0, x1]` on row `y`.
    pub(crate) fn span(&mut self, x0: i32, x1: i32, y: i32, color: PixelColor) {
        if y < 0 || y as u32 >= self.pixels.height() {
            return;
        }
        let max_x = self.pixels.width() as i32 - 1;
        for x in x0.max(0)..=x1.min(max_x) {
            self.put(x, y, color);
        }
    }

    pub(crate) fn finish(self) -> Vec<PixelEdit> {
        self.edits
    }
}

/// Stamp radius for a brush size; sizes of 1 or less stamp a single pixel.
pub fn brush_radius(brush_size: u32) -> i32 {
    (brush_size / 2) as i32
}

pub(crate) fn stamp_into(c: &mut EditCollector<'_>, x: i32, y: i32, color: PixelColor, brush_size: u32) {
    if brush_size > 1 {
        let r = brush_radius(brush_size);
        filled_ellipse_into(c, x, y, r, r, color);
    } else {
        c.put(x, y, color);
    }
}

/// Set one pixel, or stamp a filled disk of radius `brush_size / 2` when the
/// brush is larger than one pixel.
pub fn draw_pixel(pixels: &mut RgbaImage, x: i32, y: i32, color: PixelColor, brush_size: u32) -> Vec<PixelEdit> {
    let mut c = EditCollector::new(pixels);
    stamp_into(&mut c, x, y, color, brush_size);
    c.finish()
}

/// Visit every pixel of the integer Bresenham line from `(x0, y0)` to
/// `(x1, y1)`, both endpoints included, in order. The walk visits
/// `max(|dx|, |dy|) + 1` points; raster callers clip first (see `line_into`).
pub fn for_each_line_point(x0: i32, y0: i32, x1: i32, y1: i32, mut visit: impl FnMut(i32, i32)) {
    let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        // x and y stay between the endpoints, so they fit back into i32
        visit(x as i32, y as i32);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Clip a segment to the inclusive box `[min, max]` (Liang-Barsky). Endpoints
/// already inside the box are returned unchanged; clipped ones are rounded to
/// the nearest pixel. `None` when the segment misses the box.
pub(crate) fn clip_segment(
    (x0, y0): (i32, i32),
    (x1, y1): (i32, i32),
    min: (i64, i64),
    max: (i64, i64),
) -> Option<((i32, i32), (i32, i32))> {
    let inside = |x: i32, y: i32| {
        let (x, y) = (x as i64, y as i64);
        x >= min.0 && x <= max.0 && y >= min.1 && y <= max.1
    };
    if inside(x0, y0) && inside(x1, y1) {
        return Some(((x0, y0), (x1, y1)));
    }

    let (fx0, fy0) = (x0 as f64, y0 as f64);
    let (dx, dy) = (x1 as f64 - fx0, y1 as f64 - fy0);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    let edges = [
        (-dx, fx0 - min.0 as f64),
        (dx, max.0 as f64 - fx0),
        (-dy, fy0 - min.1 as f64),
        (dy, max.1 as f64 - fy0),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
        }
    }
    if t0 > t1 {
        return None;
    }

    let point = |t: f64| {
        if t == 0.0 {
            return (x0, y0);
        }
        if t == 1.0 {
            return (x1, y1);
        }
        let x = (fx0 + dx * t).round().clamp(min.0 as f64, max.0 as f64);
        let y = (fy0 + dy * t).round().clamp(min.1 as f64, max.1 as f64);
        (x as i32, y as i32)
    };
    Some((point(t0), point(t1)))
}

pub(crate) fn line_into(
    c: &mut EditCollector<'_>,
    from: (i32, i32),
    to: (i32, i32),
    color: PixelColor,
    brush_size: u32,
    use_brush: bool,
) {
    // Adjacent stamps overlap heavily; the collector drops the repeated
    // writes so only the first touch of each pixel becomes an edit.
    let stamp = if use_brush { brush_size } else { 1 };
    let margin = brush_radius(stamp) as i64 + 1;
    let max = (c.width() as i64 - 1 + margin, c.height() as i64 - 1 + margin);
    let Some(((x0, y0), (x1, y1))) = clip_segment(from, to, (-margin, -margin), max) else {
        return;
    };
    for_each_line_point(x0, y0, x1, y1, |x, y| stamp_into(c, x, y, color, stamp));
}

/// Draw a Bresenham line. With `use_brush` and a brush larger than one pixel,
/// every sampled point stamps the brush disk.
#[allow(clippy::too_many_arguments)]
pub fn draw_line(
    pixels: &mut RgbaImage,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    color: PixelColor,
    brush_size: u32,
    use_brush: bool,
) -> Vec<PixelEdit> {
    let mut c = EditCollector::new(pixels);
    line_into(&mut c, (x0, y0), (x1, y1), color, brush_size, use_brush);
    c.finish()
}

/// Re-apply a recorded edit list. Edits that no longer change anything (or
/// fall outside the buffer) are skipped; the returned list holds what
/// actually changed.
pub fn apply_edits(pixels: &mut RgbaImage, edits: &[PixelEdit], direction: Direction) -> Vec<PixelEdit> {
    let mut c = EditCollector::new(pixels);
    let mut apply = |edit: PixelEdit| c.put(edit.x as i32, edit.y as i32, edit.new_color);
    match direction {
        Direction::Forward => edits.iter().copied().for_each(&mut apply),
        Direction::Backward => edits.iter().rev().map(PixelEdit::inverted).for_each(&mut apply),
    }
    c.finish()
}
