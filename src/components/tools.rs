use image::RgbaImage;

use crate::canvas::{LayerTarget, PixelColor, PixelEdit, TRANSPARENT_RGBA};
use crate::components::history::{BatchKind, ChangeTracker, EditOrigin};
use crate::config::EditorConfig;
use crate::ops::fill::flood_fill;
use crate::ops::raster::{draw_line, draw_pixel};
use crate::ops::shapes::{draw_ellipse, draw_filled_ellipse, draw_rect};
use crate::project::Project;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Pencil,
    Eraser,
    Line,
    Rectangle,
    Ellipse,
    Bucket,
    Pipette,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pencil => "Pencil",
            Tool::Eraser => "Eraser",
            Tool::Line => "Line",
            Tool::Rectangle => "Rectangle",
            Tool::Ellipse => "Ellipse",
            Tool::Bucket => "Fill",
            Tool::Pipette => "Color Picker",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[
            Tool::Pencil,
            Tool::Eraser,
            Tool::Line,
            Tool::Rectangle,
            Tool::Ellipse,
            Tool::Bucket,
            Tool::Pipette,
        ]
    }

    pub fn batch_kind(&self) -> BatchKind {
        match self {
            Tool::Pencil | Tool::Eraser | Tool::Pipette => BatchKind::Draw,
            Tool::Line | Tool::Rectangle | Tool::Ellipse => BatchKind::Shape,
            Tool::Bucket => BatchKind::Fill,
        }
    }
}

// ============================================================================
// DRAWING CONTEXT - caller-owned drawing state passed into every tool call
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct DrawingContext {
    pub primary_color: PixelColor,
    brush_size: u32,
    min_brush_size: u32,
    max_brush_size: u32,
    /// Rectangle / ellipse tools paint filled shapes
    pub fill_shapes: bool,
    /// Rectangle tool keeps both sides equal
    pub perfect_square: bool,
    /// Pan modifier (space) held: a mouse drag pans instead of drawing
    pub pan_modifier: bool,
    /// Chebyshev distance at which a stroke draws a line segment from the
    /// last sample instead of one stamp
    pub line_threshold: u32,
}

impl Default for DrawingContext {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl DrawingContext {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            primary_color: PixelColor::BLACK,
            brush_size: config.brush.default_size,
            min_brush_size: config.brush.min_size,
            max_brush_size: config.brush.max_size,
            fill_shapes: false,
            perfect_square: false,
            pan_modifier: false,
            line_threshold: config.stroke.line_threshold_px.max(1),
        }
    }

    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    pub fn brush_limits(&self) -> (u32, u32) {
        (self.min_brush_size, self.max_brush_size)
    }

    /// Set the brush size, clamped to the configured range. Returns the size
    /// actually applied.
    pub fn set_brush_size(&mut self, size: u32) -> u32 {
        self.brush_size = size.clamp(self.min_brush_size, self.max_brush_size);
        self.brush_size
    }
}

// ============================================================================
// TOOL CONTEXT & HANDLER INTERFACE
// ============================================================================

/// Everything a tool may touch during one gesture callback.
pub struct ToolContext<'a> {
    pub project: &'a mut Project,
    pub drawing: &'a mut DrawingContext,
    pub tracker: &'a mut ChangeTracker,
    pub origin: EditOrigin,
}

impl ToolContext<'_> {
    /// Run a raster operation on one layer and hand its edits to the tracker.
    fn paint(
        &mut self,
        target: LayerTarget,
        kind: BatchKind,
        label: &str,
        op: impl FnOnce(&mut RgbaImage) -> Vec<PixelEdit>,
    ) -> usize {
        let Some(layer) = self.project.resolve(target).and_then(|addr| self.project.layer_mut(addr)) else {
            log::warn!("{}: layer {:?} does not exist", label, target.address);
            return 0;
        };
        let edits = op(&mut layer.pixels);
        let count = edits.len();
        self.tracker.record_edits(kind, label, target, edits, self.origin);
        count
    }
}

/// Pointer callbacks every tool implements. `point` is the floored canvas
/// pixel under the pointer and may lie outside the canvas.
pub trait GestureHandler {
    fn on_down(&mut self, ctx: &mut ToolContext<'_>, point: (i32, i32));
    fn on_move(&mut self, ctx: &mut ToolContext<'_>, point: (i32, i32));
    fn on_up(&mut self, ctx: &mut ToolContext<'_>, point: (i32, i32));
    /// Abort the gesture. Safe to call when nothing is in progress.
    fn cancel(&mut self, ctx: &mut ToolContext<'_>);
}

// ============================================================================
// STROKE TOOLS (pencil, eraser)
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct StrokeTool {
    erase: bool,
    target: Option<LayerTarget>,
    last: Option<(i32, i32)>,
}

impl StrokeTool {
    pub fn pencil() -> Self {
        Self::default()
    }

    pub fn eraser() -> Self {
        Self {
            erase: true,
            ..Self::default()
        }
    }

    fn tool(&self) -> Tool {
        if self.erase { Tool::Eraser } else { Tool::Pencil }
    }

    fn color(&self, drawing: &DrawingContext) -> PixelColor {
        if self.erase { PixelColor::Transparent } else { drawing.primary_color }
    }

    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }

    fn sample(&mut self, ctx: &mut ToolContext<'_>, (x, y): (i32, i32)) {
        let Some(target) = self.target else { return };
        if !ctx.project.contains(x, y) {
            // leaving the canvas breaks the stroke
            self.last = None;
            return;
        }
        let color = self.color(ctx.drawing);
        let brush = ctx.drawing.brush_size();
        let threshold = ctx.drawing.line_threshold as i32;
        let label = self.tool().label();
        match self.last {
            Some(last) if last == (x, y) => {}
            Some((lx, ly)) if (x - lx).abs().max((y - ly).abs()) >= threshold => {
                ctx.paint(target, BatchKind::Draw, label, |px| draw_line(px, lx, ly, x, y, color, brush, true));
            }
            _ => {
                ctx.paint(target, BatchKind::Draw, label, |px| draw_pixel(px, x, y, color, brush));
            }
        }
        self.last = Some((x, y));
    }

    fn finish(&mut self, ctx: &mut ToolContext<'_>) {
        if self.target.take().is_some() {
            ctx.tracker.end_batch(ctx.origin);
        }
        self.last = None;
    }
}

impl GestureHandler for StrokeTool {
    fn on_down(&mut self, ctx: &mut ToolContext<'_>, point: (i32, i32)) {
        self.finish(ctx);
        let target = ctx.project.active_target();
        ctx.tracker.start_batch(BatchKind::Draw, self.tool().label(), target, ctx.origin);
        self.target = Some(target);
        self.sample(ctx, point);
    }

    fn on_move(&mut self, ctx: &mut ToolContext<'_>, point: (i32, i32)) {
        self.sample(ctx, point);
    }

    fn on_up(&mut self, ctx: &mut ToolContext<'_>, _point: (i32, i32)) {
        self.finish(ctx);
    }

    /// Pixels already painted stay; the batch is closed so they remain undoable.
    fn cancel(&mut self, ctx: &mut ToolContext<'_>) {
        self.finish(ctx);
    }
}

// ============================================================================
// SHAPE TOOLS (line, rectangle, ellipse)
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Line,
    Rectangle,
    Ellipse,
}

#[derive(Clone, Debug)]
pub struct ShapeTool {
    kind: ShapeKind,
    start: Option<(i32, i32)>,
    current: (i32, i32),
}

impl ShapeTool {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            start: None,
            current: (0, 0),
        }
    }

    fn tool(&self) -> Tool {
        match self.kind {
            ShapeKind::Line => Tool::Line,
            ShapeKind::Rectangle => Tool::Rectangle,
            ShapeKind::Ellipse => Tool::Ellipse,
        }
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some()
    }

    /// Pending shape endpoints, if a drag is in progress.
    pub fn pending(&self) -> Option<((i32, i32), (i32, i32))> {
        self.start.map(|start| (start, self.current))
    }

    fn rasterize(&self, pixels: &mut RgbaImage, start: (i32, i32), drawing: &DrawingContext) -> Vec<PixelEdit> {
        let (x0, y0) = start;
        let (x1, y1) = self.current;
        let color = drawing.primary_color;
        let brush = drawing.brush_size();
        match self.kind {
            ShapeKind::Line => draw_line(pixels, x0, y0, x1, y1, color, brush, true),
            ShapeKind::Rectangle => draw_rect(
                pixels,
                x0,
                y0,
                x1,
                y1,
                color,
                drawing.fill_shapes,
                drawing.perfect_square,
                brush,
                true,
            ),
            // extents saturate; radii are capped well below i32::MAX anyway
            ShapeKind::Ellipse if drawing.fill_shapes => {
                draw_filled_ellipse(pixels, x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0), color)
            }
            ShapeKind::Ellipse => draw_ellipse(pixels, x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0), color),
        }
    }

    /// Render the pending shape into a transparent scratch buffer of the
    /// canvas size, for the host's preview overlay.
    pub fn preview(&self, width: u32, height: u32, drawing: &DrawingContext) -> Option<RgbaImage> {
        let start = self.start?;
        let mut scratch = RgbaImage::from_pixel(width, height, TRANSPARENT_RGBA);
        self.rasterize(&mut scratch, start, drawing);
        Some(scratch)
    }
}

impl GestureHandler for ShapeTool {
    fn on_down(&mut self, _ctx: &mut ToolContext<'_>, point: (i32, i32)) {
        self.start = Some(point);
        self.current = point;
    }

    fn on_move(&mut self, _ctx: &mut ToolContext<'_>, point: (i32, i32)) {
        if self.start.is_some() {
            self.current = point;
        }
    }

    fn on_up(&mut self, ctx: &mut ToolContext<'_>, point: (i32, i32)) {
        let Some(start) = self.start.take() else { return };
        self.current = point;
        let target = ctx.project.active_target();
        let label = self.tool().label();
        ctx.tracker.start_batch(BatchKind::Shape, label, target, ctx.origin);
        let drawing = ctx.drawing.clone();
        ctx.paint(target, BatchKind::Shape, label, |px| self.rasterize(px, start, &drawing));
        ctx.tracker.end_batch(ctx.origin);
    }

    /// Drop the pending shape; nothing was painted yet.
    fn cancel(&mut self, _ctx: &mut ToolContext<'_>) {
        self.start = None;
    }
}

// ============================================================================
// BUCKET & PIPETTE
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct BucketTool;

impl GestureHandler for BucketTool {
    fn on_down(&mut self, ctx: &mut ToolContext<'_>, (x, y): (i32, i32)) {
        if !ctx.project.contains(x, y) {
            return;
        }
        let target = ctx.project.active_target();
        let color = ctx.drawing.primary_color;
        let label = Tool::Bucket.label();
        ctx.tracker.start_batch(BatchKind::Fill, label, target, ctx.origin);
        let painted = ctx.paint(target, BatchKind::Fill, label, |px| flood_fill(px, x, y, color));
        ctx.tracker.end_batch(ctx.origin);
        log::debug!("Fill at ({}, {}) painted {} pixels", x, y, painted);
    }

    fn on_move(&mut self, _ctx: &mut ToolContext<'_>, _point: (i32, i32)) {}

    fn on_up(&mut self, _ctx: &mut ToolContext<'_>, _point: (i32, i32)) {}

    fn cancel(&mut self, _ctx: &mut ToolContext<'_>) {}
}

#[derive(Clone, Debug, Default)]
pub struct PipetteTool;

impl GestureHandler for PipetteTool {
    fn on_down(&mut self, ctx: &mut ToolContext<'_>, (x, y): (i32, i32)) {
        if !ctx.project.contains(x, y) {
            return;
        }
        if let Some(color) = ctx.project.sample_color(x as u32, y as u32) {
            ctx.drawing.primary_color = color;
        }
    }

    fn on_move(&mut self, _ctx: &mut ToolContext<'_>, _point: (i32, i32)) {}

    fn on_up(&mut self, _ctx: &mut ToolContext<'_>, _point: (i32, i32)) {}

    fn cancel(&mut self, _ctx: &mut ToolContext<'_>) {}
}

// ============================================================================
// ACTIVE TOOL
// ============================================================================

/// The selected tool together with its gesture state.
#[derive(Clone, Debug)]
pub enum ActiveTool {
    Pencil(StrokeTool),
    Eraser(StrokeTool),
    Line(ShapeTool),
    Rectangle(ShapeTool),
    Ellipse(ShapeTool),
    Bucket(BucketTool),
    Pipette(PipetteTool),
}

impl Default for ActiveTool {
    fn default() -> Self {
        Self::new(Tool::default())
    }
}

impl ActiveTool {
    pub fn new(tool: Tool) -> Self {
        match tool {
            Tool::Pencil => ActiveTool::Pencil(StrokeTool::pencil()),
            Tool::Eraser => ActiveTool::Eraser(StrokeTool::eraser()),
            Tool::Line => ActiveTool::Line(ShapeTool::new(ShapeKind::Line)),
            Tool::Rectangle => ActiveTool::Rectangle(ShapeTool::new(ShapeKind::Rectangle)),
            Tool::Ellipse => ActiveTool::Ellipse(ShapeTool::new(ShapeKind::Ellipse)),
            Tool::Bucket => ActiveTool::Bucket(BucketTool),
            Tool::Pipette => ActiveTool::Pipette(PipetteTool),
        }
    }

    pub fn tool(&self) -> Tool {
        match self {
            ActiveTool::Pencil(_) => Tool::Pencil,
            ActiveTool::Eraser(_) => Tool::Eraser,
            ActiveTool::Line(_) => Tool::Line,
            ActiveTool::Rectangle(_) => Tool::Rectangle,
            ActiveTool::Ellipse(_) => Tool::Ellipse,
            ActiveTool::Bucket(_) => Tool::Bucket,
            ActiveTool::Pipette(_) => Tool::Pipette,
        }
    }

    /// A stroke or shape drag is in progress.
    pub fn is_busy(&self) -> bool {
        match self {
            ActiveTool::Pencil(t) | ActiveTool::Eraser(t) => t.is_active(),
            ActiveTool::Line(t) | ActiveTool::Rectangle(t) | ActiveTool::Ellipse(t) => t.is_active(),
            ActiveTool::Bucket(_) | ActiveTool::Pipette(_) => false,
        }
    }

    pub fn shape(&self) -> Option<&ShapeTool> {
        match self {
            ActiveTool::Line(t) | ActiveTool::Rectangle(t) | ActiveTool::Ellipse(t) => Some(t),
            _ => None,
        }
    }

    fn handler(&mut self) -> &mut dyn GestureHandler {
        match self {
            ActiveTool::Pencil(t) | ActiveTool::Eraser(t) => t,
            ActiveTool::Line(t) | ActiveTool::Rectangle(t) | ActiveTool::Ellipse(t) => t,
            ActiveTool::Bucket(t) => t,
            ActiveTool::Pipette(t) => t,
        }
    }
}

impl GestureHandler for ActiveTool {
    fn on_down(&mut self, ctx: &mut ToolContext<'_>, point: (i32, i32)) {
        self.handler().on_down(ctx, point);
    }

    fn on_move(&mut self, ctx: &mut ToolContext<'_>, point: (i32, i32)) {
        self.handler().on_move(ctx, point);
    }

    fn on_up(&mut self, ctx: &mut ToolContext<'_>, point: (i32, i32)) {
        self.handler().on_up(ctx, point);
    }

    fn cancel(&mut self, ctx: &mut ToolContext<'_>) {
        self.handler().cancel(ctx);
    }
}

// ============================================================================
// REMOTE PEER - replays a collaborator's tool gestures locally
// ============================================================================

/// Phase of a replayed tool gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// A collaborator's own tool and drawing state. Its gestures run through the
/// same handlers with `EditOrigin::Remote`, so they are bounds/diff checked
/// but never reach local history or the collaboration sink.
#[derive(Clone, Debug, Default)]
pub struct RemotePeer {
    pub drawing: DrawingContext,
    tool: ActiveTool,
}

impl RemotePeer {
    pub fn new(drawing: DrawingContext) -> Self {
        Self {
            drawing,
            tool: ActiveTool::default(),
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool.tool()
    }

    pub fn set_tool(&mut self, tool: Tool, project: &mut Project, tracker: &mut ChangeTracker) {
        if self.tool.tool() != tool {
            self.replay(project, tracker, ToolPhase::Cancel, (0, 0));
            self.tool = ActiveTool::new(tool);
        }
    }

    pub fn replay(&mut self, project: &mut Project, tracker: &mut ChangeTracker, phase: ToolPhase, point: (i32, i32)) {
        let mut ctx = ToolContext {
            project,
            drawing: &mut self.drawing,
            tracker,
            origin: EditOrigin::Remote,
        };
        match phase {
            ToolPhase::Down => self.tool.on_down(&mut ctx, point),
            ToolPhase::Move => self.tool.on_move(&mut ctx, point),
            ToolPhase::Up => self.tool.on_up(&mut ctx, point),
            ToolPhase::Cancel => self.tool.cancel(&mut ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::history::{ChangeBatch, HistorySink};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    const RED: PixelColor = PixelColor::rgb(255, 0, 0);

    #[derive(Default)]
    struct Recorder(Vec<ChangeBatch>);

    impl HistorySink for Recorder {
        fn on_batch_complete(&mut self, batch: ChangeBatch) {
            self.0.push(batch);
        }
    }

    struct Rig {
        project: Project,
        drawing: DrawingContext,
        tracker: ChangeTracker,
        history: Rc<RefCell<Recorder>>,
    }

    impl Rig {
        fn new() -> Self {
            let history = Rc::new(RefCell::new(Recorder::default()));
            let mut drawing = DrawingContext::default();
            drawing.primary_color = RED;
            Self {
                project: Project::new(16, 16, Duration::from_millis(100)).unwrap(),
                drawing,
                tracker: ChangeTracker::new(Box::new(history.clone())),
                history,
            }
        }

        fn ctx(&mut self) -> ToolContext<'_> {
            ToolContext {
                project: &mut self.project,
                drawing: &mut self.drawing,
                tracker: &mut self.tracker,
                origin: EditOrigin::Local,
            }
        }

        fn color(&self, x: u32, y: u32) -> Option<PixelColor> {
            self.project.active_layer().color_at(x, y)
        }

        fn batches(&self) -> usize {
            self.history.borrow().0.len()
        }
    }

    #[test]
    fn brush_size_is_clamped() {
        let mut drawing = DrawingContext::default();
        assert_eq!(drawing.set_brush_size(0), 1);
        assert_eq!(drawing.set_brush_size(500), 64);
        assert_eq!(drawing.brush_size(), 64);
        assert_eq!(drawing.brush_limits(), (1, 64));

        let mut config = EditorConfig::default();
        config.brush.min_size = 2;
        config.brush.max_size = 9;
        config.brush.default_size = 3;
        let mut narrow = DrawingContext::from_config(&config);
        assert_eq!(narrow.brush_limits(), (2, 9));
        assert_eq!(narrow.brush_size(), 3);
        assert_eq!(narrow.set_brush_size(1), 2);
    }

    #[test]
    fn pencil_stroke_is_one_connected_batch() {
        let mut rig = Rig::new();
        let mut tool = ActiveTool::new(Tool::Pencil);
        tool.on_down(&mut rig.ctx(), (1, 1));
        tool.on_move(&mut rig.ctx(), (2, 1));
        // jump far enough to draw a segment
        tool.on_move(&mut rig.ctx(), (8, 1));
        assert!(tool.is_busy());
        tool.on_up(&mut rig.ctx(), (8, 1));
        assert!(!tool.is_busy());

        assert_eq!(rig.batches(), 1);
        for x in 1..=8 {
            assert_eq!(rig.color(x, 1), Some(RED), "x = {}", x);
        }
        assert_eq!(rig.history.borrow().0[0].edit_count(), 8);
    }

    #[test]
    fn leaving_canvas_breaks_stroke_continuity() {
        let mut rig = Rig::new();
        let mut tool = ActiveTool::new(Tool::Pencil);
        tool.on_down(&mut rig.ctx(), (14, 5));
        tool.on_move(&mut rig.ctx(), (20, 5));
        tool.on_move(&mut rig.ctx(), (10, 5));
        tool.on_up(&mut rig.ctx(), (10, 5));
        assert_eq!(rig.color(14, 5), Some(RED));
        assert_eq!(rig.color(10, 5), Some(RED));
        assert_eq!(rig.color(12, 5), Some(PixelColor::Transparent));
    }

    #[test]
    fn eraser_clears_pixels() {
        let mut rig = Rig::new();
        let mut pencil = ActiveTool::new(Tool::Pencil);
        pencil.on_down(&mut rig.ctx(), (3, 3));
        pencil.on_up(&mut rig.ctx(), (3, 3));
        let mut eraser = ActiveTool::new(Tool::Eraser);
        eraser.on_down(&mut rig.ctx(), (3, 3));
        eraser.on_up(&mut rig.ctx(), (3, 3));
        assert_eq!(rig.color(3, 3), Some(PixelColor::Transparent));
        assert_eq!(rig.batches(), 2);
    }

    #[test]
    fn shape_commits_only_on_up() {
        let mut rig = Rig::new();
        let mut tool = ActiveTool::new(Tool::Rectangle);
        tool.on_down(&mut rig.ctx(), (2, 2));
        tool.on_move(&mut rig.ctx(), (6, 5));
        assert_eq!(rig.color(2, 2), Some(PixelColor::Transparent));

        let preview = tool.shape().and_then(|s| s.preview(16, 16, &rig.drawing)).unwrap();
        assert_eq!(*preview.get_pixel(6, 5), RED.to_rgba());
        assert_eq!(rig.batches(), 0);

        tool.on_up(&mut rig.ctx(), (6, 5));
        assert_eq!(rig.batches(), 1);
        assert_eq!(rig.color(2, 2), Some(RED));
        assert_eq!(rig.color(6, 5), Some(RED));
        assert_eq!(rig.color(4, 3), Some(PixelColor::Transparent));
    }

    #[test]
    fn cancelled_shape_paints_nothing() {
        let mut rig = Rig::new();
        let mut tool = ActiveTool::new(Tool::Ellipse);
        tool.on_down(&mut rig.ctx(), (0, 0));
        tool.on_move(&mut rig.ctx(), (10, 10));
        tool.cancel(&mut rig.ctx());
        tool.cancel(&mut rig.ctx());
        tool.on_up(&mut rig.ctx(), (10, 10));
        assert_eq!(rig.batches(), 0);
        assert!(rig.project.active_layer().pixels.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn filled_ellipse_tool() {
        let mut rig = Rig::new();
        rig.drawing.fill_shapes = true;
        let mut tool = ActiveTool::new(Tool::Ellipse);
        tool.on_down(&mut rig.ctx(), (2, 2));
        tool.on_up(&mut rig.ctx(), (10, 8));
        // center (6, 5), radii (4, 3)
        assert_eq!(rig.color(6, 5), Some(RED));
        assert_eq!(rig.color(2, 5), Some(RED));
        assert_eq!(rig.color(2, 2), Some(PixelColor::Transparent));
    }

    #[test]
    fn bucket_fill_twice_records_once() {
        let mut rig = Rig::new();
        let mut tool = ActiveTool::new(Tool::Bucket);
        tool.on_down(&mut rig.ctx(), (0, 0));
        tool.on_down(&mut rig.ctx(), (0, 0));
        tool.on_down(&mut rig.ctx(), (-1, 0));
        assert_eq!(rig.batches(), 1);
        assert_eq!(rig.history.borrow().0[0].edit_count(), 256);
    }

    #[test]
    fn pipette_sets_primary_color() {
        let mut rig = Rig::new();
        rig.project.active_layer_mut().pixels.put_pixel(4, 4, PixelColor::rgb(1, 2, 3).to_rgba());
        let mut tool = ActiveTool::new(Tool::Pipette);
        tool.on_down(&mut rig.ctx(), (4, 4));
        assert_eq!(rig.drawing.primary_color, PixelColor::rgb(1, 2, 3));
        // transparent spot keeps the current color
        tool.on_down(&mut rig.ctx(), (0, 0));
        assert_eq!(rig.drawing.primary_color, PixelColor::rgb(1, 2, 3));
        assert_eq!(rig.batches(), 0);
    }

    #[test]
    fn remote_peer_paints_without_history() {
        let mut rig = Rig::new();
        let mut peer = RemotePeer::default();
        peer.drawing.primary_color = PixelColor::rgb(0, 0, 255);
        peer.set_tool(Tool::Line, &mut rig.project, &mut rig.tracker);
        peer.replay(&mut rig.project, &mut rig.tracker, ToolPhase::Down, (0, 0));
        peer.replay(&mut rig.project, &mut rig.tracker, ToolPhase::Up, (5, 0));
        assert_eq!(rig.color(5, 0), Some(PixelColor::rgb(0, 0, 255)));
        assert_eq!(rig.batches(), 0);
        assert!(!rig.tracker.is_open());
    }
}
