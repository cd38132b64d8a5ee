use std::time::Duration;

use image::RgbaImage;
use uuid::Uuid;

use crate::canvas::{Frame, Layer, LayerAddress, LayerId, LayerTarget, PixelColor};
use crate::error::{Result, SurfaceError};

/// Single open document: frames of layers sharing one canvas size.
pub struct Project {
    pub id: Uuid,
    /// Display name ("Untitled-X" until the host renames it)
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub frames: Vec<Frame>,
    pub current_frame: usize,
    pub current_layer: usize,
    /// Optional tracing reference sampled by the color picker under all layers.
    pub reference: Option<RgbaImage>,
}

impl Project {
    pub fn new(width: u32, height: u32, frame_duration: Duration) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SurfaceError::InvalidDimensions { width, height });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: "Untitled-1".to_string(),
            width,
            height,
            frames: vec![Frame::new(width, height, frame_duration)],
            current_frame: 0,
            current_layer: 0,
            reference: None,
        })
    }

    pub fn new_untitled(untitled_counter: usize, width: u32, height: u32, frame_duration: Duration) -> Result<Self> {
        let mut project = Self::new(width, height, frame_duration)?;
        project.name = format!("Untitled-{}", untitled_counter);
        Ok(project)
    }

    /// Address of the layer the tools currently paint on.
    pub fn active_address(&self) -> LayerAddress {
        LayerAddress::new(self.current_frame, self.current_layer)
    }

    /// Active layer as a tracker target.
    pub fn active_target(&self) -> LayerTarget {
        LayerTarget {
            address: self.active_address(),
            id: self.active_layer().id,
        }
    }

    pub fn target(&self, addr: LayerAddress) -> Option<LayerTarget> {
        self.layer(addr).map(|layer| LayerTarget { address: addr, id: layer.id })
    }

    /// Current address of the layer with `id`, if it still exists.
    pub fn find_layer(&self, id: LayerId) -> Option<LayerAddress> {
        self.frames.iter().enumerate().find_map(|(frame, f)| {
            f.layers
                .iter()
                .position(|layer| layer.id == id)
                .map(|layer| LayerAddress::new(frame, layer))
        })
    }

    /// Where a recorded target now lives. The recorded address is tried first;
    /// after structural edits the layer is looked up by id.
    pub fn resolve(&self, target: LayerTarget) -> Option<LayerAddress> {
        match self.layer(target.address) {
            Some(layer) if layer.id == target.id => Some(target.address),
            _ => self.find_layer(target.id),
        }
    }

    pub fn active_frame(&self) -> &Frame {
        &self.frames[self.current_frame]
    }

    pub fn active_layer(&self) -> &Layer {
        &self.frames[self.current_frame].layers[self.current_layer]
    }

    pub fn active_layer_mut(&mut self) -> &mut Layer {
        &mut self.frames[self.current_frame].layers[self.current_layer]
    }

    pub fn layer(&self, addr: LayerAddress) -> Option<&Layer> {
        self.frames.get(addr.frame)?.layers.get(addr.layer)
    }

    pub fn layer_mut(&mut self, addr: LayerAddress) -> Option<&mut Layer> {
        self.frames.get_mut(addr.frame)?.layers.get_mut(addr.layer)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Color under `(x, y)` in the current frame: top-most visible layer first,
    /// falling through to lower layers, then the reference image.
    pub fn sample_color(&self, x: u32, y: u32) -> Option<PixelColor> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.active_frame().sample(x, y).or_else(|| {
            let reference = self.reference.as_ref()?;
            if x < reference.width() && y < reference.height() {
                let color = PixelColor::from_rgba(*reference.get_pixel(x, y));
                (!color.is_transparent()).then_some(color)
            } else {
                None
            }
        })
    }

    /// Re-establish the index invariants after any structural change.
    pub fn clamp_indices(&mut self) {
        if self.current_frame >= self.frames.len() {
            self.current_frame = self.frames.len().saturating_sub(1);
        }
        let layer_count = self.frames[self.current_frame].layers.len();
        if self.current_layer >= layer_count {
            self.current_layer = layer_count.saturating_sub(1);
        }
    }

    pub fn frame_durations(&self) -> Vec<Duration> {
        self.frames.iter().map(|f| f.duration).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn new_project_has_one_blank_layer() {
        let project = Project::new(8, 4, Duration::from_millis(100)).unwrap();
        assert_eq!(project.frames.len(), 1);
        assert_eq!(project.active_layer().width(), 8);
        assert_eq!(project.active_layer().height(), 4);
        assert_eq!(project.active_address(), LayerAddress::new(0, 0));
        assert!(Project::new(0, 4, Duration::ZERO).is_err());
    }

    #[test]
    fn untitled_name() {
        let project = Project::new_untitled(3, 2, 2, Duration::ZERO).unwrap();
        assert_eq!(project.name, "Untitled-3");
    }

    #[test]
    fn sample_uses_reference_below_layers() {
        let mut project = Project::new(2, 2, Duration::ZERO).unwrap();
        let mut reference = RgbaImage::from_pixel(2, 2, Rgba([5, 6, 7, 255]));
        reference.put_pixel(1, 1, Rgba([0, 0, 0, 0]));
        project.reference = Some(reference);
        project.active_layer_mut().pixels.put_pixel(0, 0, Rgba([1, 2, 3, 255]));
        assert_eq!(project.sample_color(0, 0), Some(PixelColor::rgb(1, 2, 3)));
        assert_eq!(project.sample_color(1, 0), Some(PixelColor::rgb(5, 6, 7)));
        assert_eq!(project.sample_color(1, 1), None);
        assert_eq!(project.sample_color(2, 0), None);
    }

    #[test]
    fn targets_follow_layers_across_structural_edits() {
        use crate::ops::canvas_ops::{add_layer, delete_layer, duplicate_frame, select_layer};
        let mut project = Project::new(2, 2, Duration::ZERO).unwrap();
        add_layer(&mut project);
        let top = project.active_target();
        assert_eq!(top.address, LayerAddress::new(0, 1));

        select_layer(&mut project, 0);
        delete_layer(&mut project);
        assert_eq!(project.resolve(top), Some(LayerAddress::new(0, 0)));

        duplicate_frame(&mut project);
        assert_ne!(project.frames[1].layers[0].id, top.id);
        assert_eq!(project.find_layer(top.id), Some(LayerAddress::new(0, 0)));

        let gone = project.active_target();
        project.frames.remove(1);
        project.clamp_indices();
        assert_eq!(project.resolve(gone), None);
    }
}
