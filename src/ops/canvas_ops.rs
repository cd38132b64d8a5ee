// ============================================================================
// PROJECT-LEVEL OPERATIONS - add / delete / duplicate layers and frames
// ============================================================================
//
// These keep `current_frame` / `current_layer` valid but record no history:
// layer-structure undo belongs to the host's history collaborator.
// ============================================================================

use crate::canvas::{Frame, Layer};
use crate::project::Project;

/// Add a new transparent layer above the active layer and select it.
pub fn add_layer(project: &mut Project) {
    let (w, h) = (project.width, project.height);
    let frame = &mut project.frames[project.current_frame];
    let idx = (project.current_layer + 1).min(frame.layers.len());
    let name = format!("Layer {}", frame.layers.len() + 1);
    frame.layers.insert(idx, Layer::new(name, w, h));
    project.current_layer = idx;
}

/// Duplicate the active layer above itself and select the copy.
pub fn duplicate_layer(project: &mut Project) {
    let frame = &mut project.frames[project.current_frame];
    let idx = project.current_layer;
    let src = &frame.layers[idx];
    let mut dup = src.duplicate(format!("{} Copy", src.name));
    dup.visible = src.visible;
    frame.layers.insert(idx + 1, dup);
    project.current_layer = idx + 1;
}

/// Delete the active layer (a frame always keeps at least one layer).
pub fn delete_layer(project: &mut Project) {
    let frame = &mut project.frames[project.current_frame];
    if frame.layers.len() <= 1 {
        return;
    }
    frame.layers.remove(project.current_layer);
    project.clamp_indices();
}

pub fn toggle_layer_visibility(project: &mut Project, layer_idx: usize) {
    if let Some(layer) = project.frames[project.current_frame].layers.get_mut(layer_idx) {
        layer.visible = !layer.visible;
    }
}

/// Insert a blank single-layer frame after the current one and select it.
pub fn add_frame(project: &mut Project) {
    let duration = project.active_frame().duration;
    let idx = project.current_frame + 1;
    project.frames.insert(idx, Frame::new(project.width, project.height, duration));
    project.current_frame = idx;
    project.clamp_indices();
}

/// Clone the current frame (all layers) after itself and select the copy.
pub fn duplicate_frame(project: &mut Project) {
    let copy = project.active_frame().duplicate();
    let idx = project.current_frame + 1;
    project.frames.insert(idx, copy);
    project.current_frame = idx;
}

/// Delete the current frame (a project always keeps at least one frame).
pub fn delete_frame(project: &mut Project) {
    if project.frames.len() <= 1 {
        return;
    }
    project.frames.remove(project.current_frame);
    project.clamp_indices();
}

/// Select a frame; out-of-range indices are ignored.
pub fn select_frame(project: &mut Project, frame_idx: usize) {
    if frame_idx < project.frames.len() {
        project.current_frame = frame_idx;
        project.clamp_indices();
    }
}

/// Select a layer of the current frame; out-of-range indices are ignored.
pub fn select_layer(project: &mut Project, layer_idx: usize) {
    if layer_idx < project.active_frame().layers.len() {
        project.current_layer = layer_idx;
    }
}
