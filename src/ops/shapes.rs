// ============================================================================
// SHAPES - rectangles and midpoint ellipses (outline + scanline fill)
// ============================================================================

use image::RgbaImage;

use crate::canvas::{PixelColor, PixelEdit};
use crate::ops::raster::{EditCollector, line_into};

/// Radii are capped here so one walk stays bounded. Wider than any canvas
/// the pointer can reach at the minimum zoom.
pub const MAX_ELLIPSE_RADIUS: i32 = 1 << 16;

/// Walk one quadrant of the midpoint ellipse with radii `(rx, ry)`, calling
/// `visit(x, y)` for every step (`x` grows from 0 to `rx`, `y` shrinks from
/// `ry` to 0). Integer arithmetic only; region 2 is tracked at 4x scale so the
/// `(x + 0.5)` term stays exact. The decision terms are i128: at the radius
/// cap `ry² · (2x + 1)²` no longer fits in i64.
fn midpoint_ellipse(rx: i32, ry: i32, mut visit: impl FnMut(i32, i32)) {
    if rx <= 0 || ry <= 0 {
        return;
    }
    let (rx, ry) = (rx.min(MAX_ELLIPSE_RADIUS), ry.min(MAX_ELLIPSE_RADIUS));
    let rx2 = rx as i128 * rx as i128;
    let ry2 = ry as i128 * ry as i128;

    let mut x: i128 = 0;
    let mut y: i128 = ry as i128;
    let mut px: i128 = 0;
    let mut py: i128 = 2 * rx2 * y;

    // Region 1: slope magnitude < 1, step x every iteration.
    let mut d1 = ry2 - rx2 * ry as i128 + rx2 / 4;
    while px < py {
        visit(x as i32, y as i32);
        x += 1;
        px += 2 * ry2;
        if d1 < 0 {
            d1 += ry2 + px;
        } else {
            y -= 1;
            py -= 2 * rx2;
            d1 += ry2 + px - py;
        }
    }

    // Region 2: slope magnitude >= 1, step y every iteration.
    let mut d2 = ry2 * (2 * x + 1) * (2 * x + 1) + 4 * rx2 * (y - 1) * (y - 1) - 4 * rx2 * ry2;
    while y >= 0 {
        visit(x as i32, y as i32);
        y -= 1;
        py -= 2 * rx2;
        if d2 > 0 {
            d2 += 4 * (rx2 - py);
        } else {
            x += 1;
            px += 2 * ry2;
            d2 += 4 * (rx2 - py + px);
        }
    }

    // Very flat ellipses leave region 2 short of the tip; finish along the axis.
    while x < rx as i128 {
        x += 1;
        visit(x as i32, 0);
    }
}

/// `base + offset` saturated to i32; saturated points are off any canvas.
fn offset(base: i32, offset: i32) -> i32 {
    base.saturating_add(offset)
}

pub(crate) fn ellipse_outline_into(c: &mut EditCollector<'_>, cx: i32, cy: i32, rx: i32, ry: i32, color: PixelColor) {
    if !touches_canvas(c, cx, cy, rx, ry) {
        return;
    }
    midpoint_ellipse(rx, ry, |x, y| {
        c.put(offset(cx, x), offset(cy, y), color);
        c.put(offset(cx, -x), offset(cy, y), color);
        c.put(offset(cx, x), offset(cy, -y), color);
        c.put(offset(cx, -x), offset(cy, -y), color);
    });
}

pub(crate) fn filled_ellipse_into(c: &mut EditCollector<'_>, cx: i32, cy: i32, rx: i32, ry: i32, color: PixelColor) {
    if !touches_canvas(c, cx, cy, rx, ry) {
        return;
    }
    midpoint_ellipse(rx, ry, |x, y| {
        c.span(offset(cx, -x), offset(cx, x), offset(cy, y), color);
        c.span(offset(cx, -x), offset(cx, x), offset(cy, -y), color);
    });
}

/// Whether the ellipse's bounding box overlaps the buffer at all.
fn touches_canvas(c: &EditCollector<'_>, cx: i32, cy: i32, rx: i32, ry: i32) -> bool {
    let (cx, cy, rx, ry) = (cx as i64, cy as i64, rx as i64, ry as i64);
    cx + rx >= 0 && cy + ry >= 0 && cx - rx < c.width() as i64 && cy - ry < c.height() as i64
}

/// Center and radii of the ellipse inscribed in the box starting at `(x, y)`
/// with signed extent `(width, height)`. Radii are capped at
/// [`MAX_ELLIPSE_RADIUS`].
pub fn ellipse_geometry(x: i32, y: i32, width: i32, height: i32) -> (i32, i32, i32, i32) {
    let center = |origin: i32, extent: i32| {
        let c = (2 * origin as i64 + extent as i64).div_euclid(2);
        c.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    };
    let radius = |extent: i32| ((extent as i64).abs() / 2).min(MAX_ELLIPSE_RADIUS as i64) as i32;
    (center(x, width), center(y, height), radius(width), radius(height))
}

/// Ellipse outline inside the box `(x, y, width, height)`; zero radii draw nothing.
pub fn draw_ellipse(pixels: &mut RgbaImage, x: i32, y: i32, width: i32, height: i32, color: PixelColor) -> Vec<PixelEdit> {
    let (cx, cy, rx, ry) = ellipse_geometry(x, y, width, height);
    let mut c = EditCollector::new(pixels);
    ellipse_outline_into(&mut c, cx, cy, rx, ry, color);
    c.finish()
}

/// Scanline-filled ellipse inside the box `(x, y, width, height)`.
pub fn draw_filled_ellipse(pixels: &mut RgbaImage, x: i32, y: i32, width: i32, height: i32, color: PixelColor) -> Vec<PixelEdit> {
    let (cx, cy, rx, ry) = ellipse_geometry(x, y, width, height);
    let mut c = EditCollector::new(pixels);
    filled_ellipse_into(&mut c, cx, cy, rx, ry, color);
    c.finish()
}

/// Opposite corner after the perfect-square constraint: both sides take the
/// larger absolute extent, each keeping its own direction (saturating).
pub fn square_corner(x0: i32, y0: i32, x1: i32, y1: i32) -> (i32, i32) {
    let (w, h) = (x1 as i64 - x0 as i64, y1 as i64 - y0 as i64);
    let side = w.abs().max(h.abs());
    let sign = |v: i64| if v < 0 { -1 } else { 1 };
    let fit = |v: i64| v.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    (fit(x0 as i64 + side * sign(w)), fit(y0 as i64 + side * sign(h)))
}

/// Rectangle between two corners (inclusive). The outline is four brush-aware
/// lines; the filled form paints every covered pixel and ignores the brush.
#[allow(clippy::too_many_arguments)]
pub fn draw_rect(
    pixels: &mut RgbaImage,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    color: PixelColor,
    filled: bool,
    perfect_square: bool,
    brush_size: u32,
    use_brush: bool,
) -> Vec<PixelEdit> {
    let (x1, y1) = if perfect_square { square_corner(x0, y0, x1, y1) } else { (x1, y1) };
    let mut c = EditCollector::new(pixels);

    if filled {
        // only rows on the buffer are walked; `span` clips the columns
        let (min_y, max_y) = (y0.min(y1).max(0), y0.max(y1).min(c.height() as i32 - 1));
        let (min_x, max_x) = (x0.min(x1), x0.max(x1));
        for y in min_y..=max_y {
            c.span(min_x, max_x, y, color);
        }
    } else {
        line_into(&mut c, (x0, y0), (x1, y0), color, brush_size, use_brush);
        line_into(&mut c, (x1, y0), (x1, y1), color, brush_size, use_brush);
        line_into(&mut c, (x1, y1), (x0, y1), color, brush_size, use_brush);
        line_into(&mut c, (x0, y1), (x0, y0), color, brush_size, use_brush);
    }
    c.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::raster::tests::{assert_minimal, blank, coords};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    const BLUE: PixelColor = PixelColor::rgb(0, 0, 255);

    #[test]
    fn rectangle_outline_perimeter() {
        let mut img = blank(10, 10);
        let edits = draw_rect(&mut img, 1, 1, 5, 4, BLUE, false, false, 1, false);
        // 5 wide, 4 tall: perimeter pixels = 2*5 + 2*4 - 4
        assert_minimal(&edits);
        assert_eq!(edits.len(), 14);
        let set = coords(&edits);
        assert!(set.contains(&(1, 1)) && set.contains(&(5, 4)));
        assert!(!set.contains(&(3, 2)));
    }

    #[test]
    fn filled_rectangle_covers_interior_with_reversed_corners() {
        let mut img = blank(10, 10);
        let edits = draw_rect(&mut img, 6, 5, 2, 3, BLUE, true, false, 9, true);
        assert_minimal(&edits);
        assert_eq!(edits.len(), 5 * 3);
        let set = coords(&edits);
        for y in 3..=5 {
            for x in 2..=6 {
                assert!(set.contains(&(x, y)));
            }
        }
    }

    #[test]
    fn perfect_square_keeps_sign() {
        assert_eq!(square_corner(5, 5, 2, 6), (2, 8));
        assert_eq!(square_corner(5, 5, 9, 3), (9, 1));
        assert_eq!(square_corner(0, 0, 0, -4), (4, -4));
        let mut img = blank(10, 10);
        let edits = draw_rect(&mut img, 0, 0, 3, 1, BLUE, true, true, 1, false);
        assert_minimal(&edits);
        assert_eq!(edits.len(), 16);
    }

    #[test]
    fn ellipse_geometry_floors() {
        assert_eq!(ellipse_geometry(0, 0, 5, 3), (2, 1, 2, 1));
        assert_eq!(ellipse_geometry(6, 6, -5, -4), (3, 4, 2, 2));
    }

    #[test]
    fn degenerate_ellipse_draws_nothing() {
        let mut img = blank(10, 10);
        assert!(draw_ellipse(&mut img, 2, 2, 1, 6, BLUE).is_empty());
        assert!(draw_filled_ellipse(&mut img, 2, 2, 6, 0, BLUE).is_empty());
    }

    #[test]
    fn ellipse_outline_is_symmetric_and_inside_filled() {
        for (w, h) in [(8, 8), (12, 6), (6, 14), (3, 9), (17, 11)] {
            let mut outline_img = blank(40, 40);
            let outline_edits = draw_ellipse(&mut outline_img, 4, 5, w, h, BLUE);
            let mut filled_img = blank(40, 40);
            let filled_edits = draw_filled_ellipse(&mut filled_img, 4, 5, w, h, BLUE);
            assert_minimal(&outline_edits);
            assert_minimal(&filled_edits);
            let (outline, filled) = (coords(&outline_edits), coords(&filled_edits));
            let (cx, cy, rx, ry) = ellipse_geometry(4, 5, w, h);

            assert!(outline.is_subset(&filled), "outline escapes fill for {}x{}", w, h);
            for &(x, y) in &outline {
                assert!(outline.contains(&(2 * cx - x, y)));
                assert!(outline.contains(&(x, 2 * cy - y)));
            }
            // extreme points sit exactly on the radii
            for p in [(cx + rx, cy), (cx - rx, cy), (cx, cy + ry), (cx, cy - ry)] {
                assert!(outline.contains(&p), "missing extreme {:?} for {}x{}", p, w, h);
            }
        }
    }

    #[test]
    fn filled_ellipse_rows_have_no_gaps() {
        let mut img = blank(40, 40);
        let filled = coords(&draw_filled_ellipse(&mut img, 2, 2, 21, 13, BLUE));
        let rows: HashSet<i32> = filled.iter().map(|p| p.1).collect();
        for y in rows {
            let xs: Vec<i32> = filled.iter().filter(|p| p.1 == y).map(|p| p.0).collect();
            let (min, max) = (*xs.iter().min().unwrap(), *xs.iter().max().unwrap());
            assert_eq!(xs.len() as i32, max - min + 1);
        }
    }

    #[test]
    fn circle_outline_radius_two() {
        let mut img = blank(10, 10);
        let set = coords(&draw_ellipse(&mut img, 0, 0, 4, 4, BLUE));
        let expected: HashSet<(i32, i32)> = [
            (2, 0), (1, 0), (3, 0),
            (0, 1), (4, 1), (0, 2), (4, 2), (0, 3), (4, 3),
            (2, 4), (1, 4), (3, 4),
        ]
        .into_iter()
        .collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn huge_ellipses_stay_bounded() {
        let mut img = blank(16, 16);
        // the ring passes far outside; only its bounding box covers the canvas
        let outline = draw_ellipse(&mut img, -40_000, -40_000, 80_000, 80_000, BLUE);
        assert!(outline.is_empty());
        let filled = draw_filled_ellipse(&mut img, -40_000, -40_000, 80_000, 80_000, BLUE);
        assert_minimal(&filled);
        assert_eq!(filled.len(), 16 * 16);

        let mut img = blank(16, 16);
        assert!(draw_filled_ellipse(&mut img, i32::MIN, i32::MIN, i32::MAX, i32::MAX, BLUE).is_empty());
        assert!(draw_ellipse(&mut img, i32::MAX, 0, i32::MAX, 8, BLUE).is_empty());
        assert_eq!(ellipse_geometry(0, 0, i32::MAX, -8), (i32::MAX / 2, -4, MAX_ELLIPSE_RADIUS, 4));
    }

    #[test]
    fn huge_rectangles_are_clipped() {
        let mut img = blank(8, 8);
        let filled = draw_rect(&mut img, i32::MIN, i32::MIN, i32::MAX, i32::MAX, BLUE, true, false, 1, false);
        assert_minimal(&filled);
        assert_eq!(filled.len(), 64);

        let mut img = blank(8, 8);
        assert!(draw_rect(&mut img, i32::MIN, i32::MIN, i32::MAX, i32::MAX, BLUE, false, false, 3, true).is_empty());
        // only the left edge crosses the canvas
        let edits = draw_rect(&mut img, 2, -1_000_000, 1_000_000, 1_000_000, BLUE, false, true, 1, false);
        assert_minimal(&edits);
        assert_eq!(coords(&edits), (0..8).map(|y| (2, y)).collect::<HashSet<_>>());
        assert_eq!(square_corner(0, 0, i32::MAX, i32::MIN), (i32::MAX, i32::MIN));
    }
}
