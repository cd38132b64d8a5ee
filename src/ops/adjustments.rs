// ============================================================================
// ADJUSTMENT OPERATIONS - whole-layer per-pixel color adjustments
// ============================================================================
//
// Operations rewrite a single layer buffer in place and are parallelized over
// rows via rayon. Fully transparent pixels are left untouched. History for
// these is a before/after layer snapshot taken by the caller, not per-pixel
// edits.
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

/// Apply `transform` to every non-transparent pixel, row-parallel.
/// `transform` receives `[r, g, b]` and returns the new `[r, g, b]`; alpha is
/// preserved.
fn apply_pixel_transform<F>(pixels: &mut RgbaImage, transform: F)
where
    F: Fn([u8; 3]) -> [u8; 3] + Sync,
{
    let stride = pixels.width() as usize * 4;
    if stride == 0 {
        return;
    }
    let raw: &mut [u8] = &mut *pixels;
    raw.par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            if px[3] == 0 {
                continue;
            }
            let [r, g, b] = transform([px[0], px[1], px[2]]);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
    });
}

/// Invert all color channels (R, G, B). Alpha is preserved.
pub fn invert_colors(pixels: &mut RgbaImage) {
    apply_pixel_transform(pixels, |[r, g, b]| [255 - r, 255 - g, 255 - b]);
}

/// Rec.601 luminance grayscale.
pub fn grayscale(pixels: &mut RgbaImage) {
    apply_pixel_transform(pixels, |[r, g, b]| {
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        let v = luma.round().clamp(0.0, 255.0) as u8;
        [v, v, v]
    });
}

/// Add `delta` to every channel, saturating at 0 and 255.
pub fn brightness(pixels: &mut RgbaImage, delta: i16) {
    if delta == 0 {
        return;
    }
    apply_pixel_transform(pixels, |rgb| rgb.map(|c| (c as i16 + delta).clamp(0, 255) as u8));
}
