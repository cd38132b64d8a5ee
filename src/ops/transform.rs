// ============================================================================
// TRANSFORM OPERATIONS - flip / rotate for layers and the whole canvas
// ============================================================================

use image::imageops;
use rayon::prelude::*;

use crate::canvas::Layer;
use crate::ops::adjustments;
use crate::project::Project;

/// Whole-buffer operations on a single layer. Recorded in history as one
/// before/after snapshot instead of per-pixel edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerTransform {
    FlipHorizontal,
    FlipVertical,
    Rotate180,
    Invert,
    Grayscale,
    Brightness(i16),
}

impl LayerTransform {
    pub fn label(&self) -> String {
        match self {
            LayerTransform::FlipHorizontal => "Flip Horizontal".to_string(),
            LayerTransform::FlipVertical => "Flip Vertical".to_string(),
            LayerTransform::Rotate180 => "Rotate 180°".to_string(),
            LayerTransform::Invert => "Invert Colors".to_string(),
            LayerTransform::Grayscale => "Grayscale".to_string(),
            LayerTransform::Brightness(delta) => format!("Brightness {:+}", delta),
        }
    }

    pub fn apply(&self, layer: &mut Layer) {
        let pixels = &mut layer.pixels;
        match *self {
            LayerTransform::FlipHorizontal => imageops::flip_horizontal_in_place(pixels),
            LayerTransform::FlipVertical => imageops::flip_vertical_in_place(pixels),
            LayerTransform::Rotate180 => imageops::rotate180_in_place(pixels),
            LayerTransform::Invert => adjustments::invert_colors(pixels),
            LayerTransform::Grayscale => adjustments::grayscale(pixels),
            LayerTransform::Brightness(delta) => adjustments::brightness(pixels, delta),
        }
    }
}

/// Rotate the entire canvas 90° (every layer of every frame plus the
/// reference image) and swap width and height.
pub fn rotate_canvas_90(project: &mut Project, clockwise: bool) {
    let rotate = |img: &image::RgbaImage| {
        if clockwise {
            imageops::rotate90(img)
        } else {
            imageops::rotate270(img)
        }
    };
    project.frames.par_iter_mut().for_each(|frame| {
        for layer in &mut frame.layers {
            layer.pixels = rotate(&layer.pixels);
        }
    });
    if let Some(reference) = project.reference.as_mut() {
        *reference = rotate(reference);
    }
    std::mem::swap(&mut project.width, &mut project.height);
}
