use egui::{Pos2, Rect, Vec2};

use crate::config::ViewportConfig;

/// Placement of the canvas inside its container, in container-local screen
/// pixels. Overlays (grid, selection, tool previews) position themselves with
/// this so they stay aligned with the pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayLayout {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Called after every viewport mutation with the new overlay layout.
pub type TransformHook = Box<dyn FnMut(OverlayLayout)>;

/// Pan/zoom state of the canvas view.
///
/// `pos` is the screen-space offset of the canvas center from the container
/// center, `scale` is screen pixels per canvas pixel.
pub struct Viewport {
    scale: f32,
    pos: Vec2,
    container: Rect,
    canvas_width: u32,
    canvas_height: u32,
    limits: ViewportConfig,
    hook: Option<TransformHook>,
}

impl Viewport {
    pub fn new(canvas_width: u32, canvas_height: u32, container: Rect, limits: ViewportConfig) -> Self {
        Self {
            scale: 1.0_f32.clamp(limits.min_scale, limits.max_scale),
            pos: Vec2::ZERO,
            container,
            canvas_width,
            canvas_height,
            limits,
            hook: None,
        }
    }

    pub fn set_transform_hook(&mut self, hook: Option<TransformHook>) {
        self.hook = hook;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    pub fn container(&self) -> Rect {
        self.container
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    fn canvas_center(&self) -> Vec2 {
        Vec2::new(self.canvas_width as f32 / 2.0, self.canvas_height as f32 / 2.0)
    }

    fn clamp_scale(&self, scale: f32) -> f32 {
        if scale.is_finite() {
            scale.clamp(self.limits.min_scale, self.limits.max_scale)
        } else {
            self.scale
        }
    }

    // ========================================================================
    // COORDINATE MAPPING
    // ========================================================================

    /// Unbounded sub-pixel canvas coordinates under a screen point.
    pub fn screen_to_canvas_f32(&self, screen: Pos2) -> Pos2 {
        let rel = screen - self.container.center() - self.pos;
        (rel / self.scale + self.canvas_center()).to_pos2()
    }

    /// Integer canvas pixel under a screen point, `None` outside the canvas.
    pub fn screen_to_canvas(&self, screen: Pos2) -> Option<(i32, i32)> {
        let p = self.screen_to_canvas_f32(screen);
        let (x, y) = (p.x.floor(), p.y.floor());
        if x >= 0.0 && y >= 0.0 && x < self.canvas_width as f32 && y < self.canvas_height as f32 {
            Some((x as i32, y as i32))
        } else {
            None
        }
    }

    /// Floored canvas pixel under a screen point, possibly off-canvas. Shape
    /// tools use this so a drag can extend past the edges.
    pub fn screen_to_canvas_unbounded(&self, screen: Pos2) -> (i32, i32) {
        let p = self.screen_to_canvas_f32(screen);
        (p.x.floor() as i32, p.y.floor() as i32)
    }

    /// Screen position of a (sub-pixel) canvas point.
    pub fn canvas_to_screen(&self, canvas: Pos2) -> Pos2 {
        self.container.center() + self.pos + (canvas.to_vec2() - self.canvas_center()) * self.scale
    }

    pub fn overlay_layout(&self) -> OverlayLayout {
        let cw = self.container.width();
        let ch = self.container.height();
        let width = self.canvas_width as f32 * self.scale;
        let height = self.canvas_height as f32 * self.scale;
        OverlayLayout {
            left: cw / 2.0 + self.pos.x - width / 2.0,
            top: ch / 2.0 + self.pos.y - height / 2.0,
            width,
            height,
        }
    }

    // ========================================================================
    // MUTATIONS - each one ends with `notify`
    // ========================================================================

    /// Pan by a screen-space delta.
    pub fn pan(&mut self, delta: Vec2) {
        self.pos += delta;
        self.notify();
    }

    /// Zoom by `factor` keeping the canvas point under `anchor` fixed.
    pub fn zoom_at(&mut self, factor: f32, anchor: Pos2) {
        let old = self.scale;
        let new = self.clamp_scale(old * factor);
        let actual_factor = new / old;
        let anchor_rel = anchor - self.container.center();
        self.scale = new;
        self.pos = anchor_rel - (anchor_rel - self.pos) * actual_factor;
        self.notify();
    }

    /// Set an absolute scale and put `canvas_point` under `screen_point`.
    pub fn zoom_to_anchor(&mut self, scale: f32, canvas_point: Pos2, screen_point: Pos2) {
        self.scale = self.clamp_scale(scale);
        let anchor_rel = screen_point - self.container.center();
        self.pos = anchor_rel - (canvas_point.to_vec2() - self.canvas_center()) * self.scale;
        self.notify();
    }

    pub fn zoom_in(&mut self, anchor: Pos2) {
        self.zoom_at(self.limits.zoom_step, anchor);
    }

    pub fn zoom_out(&mut self, anchor: Pos2) {
        self.zoom_at(1.0 / self.limits.zoom_step, anchor);
    }

    /// Largest scale that shows the whole canvas, capped, and centered.
    pub fn reset_to_fit(&mut self) {
        let fit_x = self.container.width() / self.canvas_width.max(1) as f32;
        let fit_y = self.container.height() / self.canvas_height.max(1) as f32;
        let fit = fit_x.min(fit_y).min(self.limits.fit_max_scale);
        self.scale = if fit > 0.0 { self.clamp_scale(fit) } else { self.limits.min_scale };
        self.pos = Vec2::ZERO;
        self.notify();
    }

    pub fn set_container(&mut self, container: Rect) {
        self.container = container;
        self.notify();
    }

    pub fn set_canvas_size(&mut self, width: u32, height: u32) {
        self.canvas_width = width;
        self.canvas_height = height;
        self.notify();
    }

    fn notify(&mut self) {
        let layout = self.overlay_layout();
        if let Some(hook) = self.hook.as_mut() {
            hook(layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn container() -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::splat(100.0))
    }

    fn viewport_10x10_at_4() -> Viewport {
        let mut vp = Viewport::new(10, 10, container(), ViewportConfig::default());
        vp.zoom_to_anchor(4.0, Pos2::new(5.0, 5.0), Pos2::new(50.0, 50.0));
        vp
    }

    #[test]
    fn maps_center_and_corners() {
        let vp = viewport_10x10_at_4();
        assert_eq!(vp.pos(), Vec2::ZERO);
        assert_eq!(vp.screen_to_canvas(Pos2::new(50.0, 50.0)), Some((5, 5)));
        assert_eq!(vp.screen_to_canvas(Pos2::new(30.0, 30.0)), Some((0, 0)));
        assert_eq!(vp.screen_to_canvas(Pos2::new(69.9, 69.9)), Some((9, 9)));
        assert_eq!(vp.screen_to_canvas(Pos2::new(29.9, 50.0)), None);
        assert_eq!(vp.screen_to_canvas(Pos2::new(70.0, 50.0)), None);
        assert_eq!(vp.canvas_to_screen(Pos2::new(0.0, 0.0)), Pos2::new(30.0, 30.0));
    }

    #[test]
    fn zoom_keeps_anchor_pixel() {
        let mut vp = viewport_10x10_at_4();
        let p = Pos2::new(44.0, 44.0);
        assert_eq!(vp.screen_to_canvas(p), Some((3, 3)));
        vp.zoom_at(1.2, p);
        assert_eq!(vp.screen_to_canvas(p), Some((3, 3)));
        assert!((vp.scale() - 4.8).abs() < 1e-5);
    }

    #[test]
    fn zoom_anchor_holds_for_many_points() {
        let mut vp = Viewport::new(32, 24, Rect::from_min_size(Pos2::new(10.0, 20.0), Vec2::new(300.0, 200.0)), ViewportConfig::default());
        vp.reset_to_fit();
        vp.pan(Vec2::new(13.0, -7.0));
        for (i, factor) in [1.2_f32, 0.8, 2.5, 0.5, 1.1].iter().enumerate() {
            let anchor = Pos2::new(40.0 + 37.0 * i as f32, 60.0 + 23.0 * i as f32);
            let before = vp.screen_to_canvas_f32(anchor);
            vp.zoom_at(*factor, anchor);
            let after = vp.screen_to_canvas_f32(anchor);
            assert!((before - after).length() < 1e-3, "{:?} vs {:?}", before, after);
        }
    }

    #[test]
    fn zoom_steps_use_configured_factor_and_pin_anchor() {
        let mut vp = viewport_10x10_at_4();
        let anchor = Pos2::new(37.0, 61.0);
        let before = vp.screen_to_canvas_f32(anchor);
        vp.zoom_in(anchor);
        assert!((vp.scale() - 4.8).abs() < 1e-5);
        assert!((vp.screen_to_canvas_f32(anchor) - before).length() < 1e-4);
        vp.zoom_out(anchor);
        vp.zoom_out(anchor);
        assert!((vp.scale() - 4.0 / 1.2).abs() < 1e-4);
        assert!((vp.screen_to_canvas_f32(anchor) - before).length() < 1e-4);

        let config = ViewportConfig {
            zoom_step: 2.0,
            ..ViewportConfig::default()
        };
        let mut vp = Viewport::new(10, 10, container(), config);
        vp.zoom_to_anchor(4.0, Pos2::new(5.0, 5.0), Pos2::new(50.0, 50.0));
        vp.zoom_in(Pos2::new(50.0, 50.0));
        assert_eq!(vp.scale(), 8.0);
    }

    #[test]
    fn scale_is_clamped() {
        let mut vp = viewport_10x10_at_4();
        vp.zoom_at(1000.0, Pos2::new(50.0, 50.0));
        assert_eq!(vp.scale(), 100.0);
        vp.zoom_at(0.0, Pos2::new(50.0, 50.0));
        assert_eq!(vp.scale(), 0.1);
        vp.zoom_at(f32::NAN, Pos2::new(50.0, 50.0));
        assert_eq!(vp.scale(), 0.1);
    }

    #[test]
    fn fit_is_capped_and_centered() {
        let mut vp = Viewport::new(200, 100, Rect::from_min_size(Pos2::ZERO, Vec2::new(400.0, 400.0)), ViewportConfig::default());
        vp.pan(Vec2::new(5.0, 5.0));
        vp.reset_to_fit();
        assert_eq!(vp.scale(), 2.0);
        assert_eq!(vp.pos(), Vec2::ZERO);

        vp.set_canvas_size(2, 2);
        vp.reset_to_fit();
        assert_eq!(vp.scale(), 32.0);
    }

    #[test]
    fn overlay_layout_follows_pan_and_scale() {
        let mut vp = viewport_10x10_at_4();
        vp.pan(Vec2::new(6.0, -4.0));
        assert_eq!(
            vp.overlay_layout(),
            OverlayLayout {
                left: 50.0 + 6.0 - 20.0,
                top: 50.0 - 4.0 - 20.0,
                width: 40.0,
                height: 40.0,
            }
        );
    }

    #[test]
    fn hook_runs_after_every_mutation() {
        let seen = Rc::new(RefCell::new(Vec::<OverlayLayout>::new()));
        let sink = seen.clone();
        let mut vp = viewport_10x10_at_4();
        vp.set_transform_hook(Some(Box::new(move |layout: OverlayLayout| sink.borrow_mut().push(layout))));
        vp.pan(Vec2::new(1.0, 0.0));
        vp.zoom_at(1.2, Pos2::new(50.0, 50.0));
        vp.reset_to_fit();
        vp.set_container(container());
        assert_eq!(seen.borrow().len(), 4);
        assert_eq!(*seen.borrow().last().unwrap(), vp.overlay_layout());
    }
}
