use image::{Rgba, RgbaImage};

use crate::canvas::{PixelColor, PixelEdit};
use crate::ops::raster::EditCollector;

/// Visitation counters of one flood fill.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillStats {
    /// Coordinates inspected (each at most once), including the boundary.
    pub visited: usize,
    /// Coordinates whose color matched the seed and were repainted.
    pub painted: usize,
}

/// 4-connected flood fill from `(x, y)` with `color`, matching the seed's
/// exact RGBA. A seed outside the buffer, or one already showing `color`, is
/// a no-op.
pub fn flood_fill(pixels: &mut RgbaImage, x: i32, y: i32, color: PixelColor) -> Vec<PixelEdit> {
    flood_fill_with_stats(pixels, x, y, color).0
}

pub fn flood_fill_with_stats(pixels: &mut RgbaImage, x: i32, y: i32, color: PixelColor) -> (Vec<PixelEdit>, FillStats) {
    let mut stats = FillStats::default();
    let (w, h) = (pixels.width() as i32, pixels.height() as i32);
    if x < 0 || y < 0 || x >= w || y >= h {
        return (Vec::new(), stats);
    }

    let target: Rgba<u8> = *pixels.get_pixel(x as u32, y as u32);
    if PixelColor::from_rgba(target) == color {
        return (Vec::new(), stats);
    }

    let mut c = EditCollector::new(pixels);
    // visited doubles as the processed set; duplicates on the stack are skipped
    let mut visited = vec![false; (w * h) as usize];
    let mut stack: Vec<(i32, i32)> = Vec::with_capacity(1024);
    stack.push((x, y));

    while let Some((px, py)) = stack.pop() {
        if px < 0 || py < 0 || px >= w || py >= h {
            continue;
        }
        let idx = (py * w + px) as usize;
        if visited[idx] {
            continue;
        }
        visited[idx] = true;
        stats.visited += 1;

        if *c.pixels().get_pixel(px as u32, py as u32) != target {
            continue;
        }
        c.put(px, py, color);
        stats.painted += 1;

        stack.push((px + 1, py));
        stack.push((px - 1, py));
        stack.push((px, py + 1));
        stack.push((px, py - 1));
    }

    (c.finish(), stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::raster::draw_line;
    use crate::ops::raster::tests::{assert_minimal, blank, coords};
    use pretty_assertions::assert_eq;

    const BLUE: PixelColor = PixelColor::rgb(0, 0, 255);
    const BLACK: PixelColor = PixelColor::BLACK;

    #[test]
    fn fills_whole_transparent_canvas() {
        let mut img = blank(4, 4);
        let edits = flood_fill(&mut img, 0, 0, BLUE);
        assert_minimal(&edits);
        assert_eq!(edits.len(), 16);
        assert!(edits.iter().all(|e| e.old_color == PixelColor::Transparent && e.new_color == BLUE));
    }

    #[test]
    fn second_fill_is_idempotent() {
        let mut img = blank(5, 5);
        assert!(!flood_fill(&mut img, 2, 2, BLUE).is_empty());
        let (edits, stats) = flood_fill_with_stats(&mut img, 2, 2, BLUE);
        assert!(edits.is_empty());
        assert_eq!(stats, FillStats::default());
    }

    #[test]
    fn stops_at_boundary_and_counts_visits() {
        let mut img = blank(7, 7);
        // vertical wall at x = 3
        draw_line(&mut img, 3, 0, 3, 6, BLACK, 1, false);
        let (edits, stats) = flood_fill_with_stats(&mut img, 0, 0, BLUE);
        assert_minimal(&edits);
        assert_eq!(edits.len(), 3 * 7);
        assert!(edits.iter().all(|e| e.x < 3));
        assert_eq!(stats.painted, edits.len());
        // left region plus the wall pixels touching it
        assert_eq!(stats.visited, 3 * 7 + 7);
        assert!(stats.visited >= stats.painted);
    }

    #[test]
    fn diagonal_gaps_do_not_leak() {
        let mut img = blank(6, 6);
        draw_line(&mut img, 0, 5, 5, 0, BLACK, 1, false);
        let edits = flood_fill(&mut img, 0, 0, BLUE);
        // strictly above the anti-diagonal: x + y < 5
        assert_minimal(&edits);
        assert_eq!(edits.len(), 15);
        assert!(edits.iter().all(|e| e.x + e.y < 5));
    }

    #[test]
    fn matches_exact_rgba_only() {
        let mut img = blank(3, 1);
        img.put_pixel(1, 0, Rgba([0, 0, 0, 1]));
        let edits = flood_fill(&mut img, 0, 0, BLUE);
        assert_eq!(coords(&edits), [(0, 0)].into_iter().collect());
    }

    #[test]
    fn fills_translucent_region_with_same_rgb() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 128]));
        let edits = flood_fill(&mut img, 0, 0, BLUE);
        assert_minimal(&edits);
        assert_eq!(edits.len(), 4);
        assert!(edits.iter().all(|e| e.old_color == PixelColor::Rgba([0, 0, 255, 128])));
    }

    #[test]
    fn seed_out_of_bounds_is_a_no_op() {
        let mut img = blank(3, 3);
        assert!(flood_fill(&mut img, 3, 0, BLUE).is_empty());
        assert!(flood_fill(&mut img, 0, -1, BLUE).is_empty());
    }
}
