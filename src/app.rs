use std::cell::RefCell;
use std::time::{Duration, Instant};

use egui::{Pos2, Rect};
use image::RgbaImage;
use indexmap::IndexMap;

use crate::canvas::{LayerAddress, PixelEdit};
use crate::components::gestures::{GestureDispatcher, GestureMode, PointerEvent, Targets};
use crate::components::history::{
    CanvasPixels, CanvasSnapshot, ChangeBatch, ChangeTracker, CollabSink, EditOrigin, HistorySink, LayerSnapshot,
    UndoStack,
};
use crate::components::tools::{ActiveTool, DrawingContext, GestureHandler, RemotePeer, Tool, ToolContext, ToolPhase};
use crate::config::EditorConfig;
use crate::error::Result;
use crate::io::{EditPacket, decode_packet};
use crate::ops::raster::{Direction, apply_edits};
use crate::ops::transform::{LayerTransform, rotate_canvas_90};
use crate::playback::Playback;
use crate::project::Project;
use crate::viewport::Viewport;

/// Host-facing drawing surface: owns the project and everything that acts on
/// it, and exposes input, timer and command entry points.
pub struct Editor {
    project: Project,
    viewport: Viewport,
    drawing: DrawingContext,
    tool: ActiveTool,
    tracker: ChangeTracker,
    gestures: GestureDispatcher,
    playback: Playback,
    config: EditorConfig,
    /// Collaborators' tool state, keyed by peer id
    remote_peers: IndexMap<String, RemotePeer>,
    needs_redraw: bool,
}

impl Editor {
    pub fn new(project: Project, container: Rect, config: EditorConfig, history: Box<dyn HistorySink>) -> Self {
        let mut viewport = Viewport::new(project.width, project.height, container, config.viewport.clone());
        viewport.reset_to_fit();
        log::info!(
            "Editor created for {} ({}x{}, {} frames)",
            project.name,
            project.width,
            project.height,
            project.frames.len()
        );
        Self {
            project,
            viewport,
            drawing: DrawingContext::from_config(&config),
            tool: ActiveTool::default(),
            tracker: ChangeTracker::new(history),
            gestures: GestureDispatcher::new(config.gestures.clone()),
            playback: Playback::default(),
            config,
            remote_peers: IndexMap::new(),
            needs_redraw: true,
        }
    }

    /// Blank single-frame project with default settings.
    pub fn blank(width: u32, height: u32, container: Rect, history: Box<dyn HistorySink>) -> Result<Self> {
        let config = EditorConfig::default();
        let project = Project::new(width, height, config.playback.default_frame_duration())?;
        Ok(Self::new(project, container, config, history))
    }

    pub fn set_collab(&mut self, collab: Option<Box<dyn CollabSink>>) {
        self.tracker.set_collab(collab);
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        self.needs_redraw = true;
        &mut self.viewport
    }

    pub fn drawing(&self) -> &DrawingContext {
        &self.drawing
    }

    pub fn drawing_mut(&mut self) -> &mut DrawingContext {
        &mut self.drawing
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tool(&self) -> Tool {
        self.tool.tool()
    }

    pub fn mode(&self) -> GestureMode {
        self.gestures.mode()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.gestures.next_deadline()
    }

    pub fn color_pick_line(&self) -> Option<(Pos2, Pos2)> {
        self.gestures.color_pick_line()
    }

    /// Pending shape rendered into a canvas-sized scratch buffer.
    pub fn shape_preview(&self) -> Option<RgbaImage> {
        self.tool
            .shape()
            .and_then(|shape| shape.preview(self.project.width, self.project.height, &self.drawing))
    }

    /// Whether anything visible changed since the last call.
    pub fn take_needs_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    // ========================================================================
    // INPUT
    // ========================================================================

    fn dispatch(&mut self, f: impl FnOnce(&mut GestureDispatcher, &mut Targets<'_>)) {
        let mut targets = Targets {
            project: &mut self.project,
            viewport: &mut self.viewport,
            drawing: &mut self.drawing,
            tool: &mut self.tool,
            tracker: &mut self.tracker,
        };
        f(&mut self.gestures, &mut targets);
        self.needs_redraw = true;
    }

    pub fn pointer_down(&mut self, ev: PointerEvent) {
        self.dispatch(|g, t| g.pointer_down(ev, t));
    }

    pub fn pointer_move(&mut self, ev: PointerEvent) {
        self.dispatch(|g, t| g.pointer_move(ev, t));
    }

    pub fn pointer_up(&mut self, ev: PointerEvent) {
        self.dispatch(|g, t| g.pointer_up(ev, t));
    }

    pub fn pointer_cancel(&mut self, ev: PointerEvent) {
        self.dispatch(|g, t| g.pointer_cancel(ev, t));
    }

    /// Fire gesture timers that are due. The host calls this at
    /// `next_deadline()` (or on its regular frame tick).
    pub fn tick(&mut self, now: Instant) {
        if self.gestures.next_deadline().is_some_and(|deadline| deadline <= now) {
            self.dispatch(|g, t| g.tick(now, t));
        }
    }

    /// Tear down any gesture in progress.
    pub fn cancel_gesture(&mut self) {
        self.dispatch(|g, t| g.cancel(t));
    }

    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool.tool() == tool {
            return;
        }
        self.cancel_gesture();
        // a gesture-less tool may still hold state (e.g. a shape started by the host)
        let mut ctx = ToolContext {
            project: &mut self.project,
            drawing: &mut self.drawing,
            tracker: &mut self.tracker,
            origin: EditOrigin::Local,
        };
        self.tool.cancel(&mut ctx);
        self.tool = ActiveTool::new(tool);
        log::debug!("Tool: {}", tool.label());
    }

    // ========================================================================
    // WHOLE-BUFFER COMMANDS
    // ========================================================================

    /// Apply a whole-layer transform to the active layer, recorded as one
    /// before/after snapshot.
    pub fn apply_layer_transform(&mut self, transform: LayerTransform) {
        self.cancel_gesture();
        let target = self.project.active_target();
        let before = self.project.active_layer().pixels.clone();
        transform.apply(self.project.active_layer_mut());
        let after = self.project.active_layer().pixels.clone();
        log::info!("{} applied to layer {:?}", transform.label(), target.address);
        self.tracker.record_layer_snapshot(&transform.label(), LayerSnapshot { target, before, after });
        self.needs_redraw = true;
    }

    /// Rotate the whole canvas by 90 degrees.
    pub fn rotate_canvas(&mut self, clockwise: bool) {
        self.cancel_gesture();
        let before = CanvasPixels::capture(&self.project);
        rotate_canvas_90(&mut self.project, clockwise);
        let after = CanvasPixels::capture(&self.project);
        let label = if clockwise { "Rotate 90° CW" } else { "Rotate 90° CCW" };
        log::info!("{} ({}x{})", label, self.project.width, self.project.height);
        self.tracker.record_canvas_snapshot(label, CanvasSnapshot { before, after });
        self.sync_canvas_size();
    }

    /// Structural project edits (layers, frames). The gesture in progress is
    /// cancelled first and the index invariants re-established afterwards.
    pub fn edit_project(&mut self, edit: impl FnOnce(&mut Project)) {
        self.cancel_gesture();
        edit(&mut self.project);
        self.project.clamp_indices();
        self.sync_canvas_size();
    }

    fn sync_canvas_size(&mut self) {
        if self.viewport.canvas_size() != (self.project.width, self.project.height) {
            self.viewport.set_canvas_size(self.project.width, self.project.height);
        }
        self.needs_redraw = true;
    }

    // ========================================================================
    // HISTORY CALLBACKS
    // ========================================================================

    /// Re-apply an edit list to one layer. Returns the edits that actually
    /// changed a pixel.
    pub fn apply_edits(&mut self, address: LayerAddress, edits: &[PixelEdit], direction: Direction) -> Vec<PixelEdit> {
        self.needs_redraw = true;
        match self.project.layer_mut(address) {
            Some(layer) => apply_edits(&mut layer.pixels, edits, direction),
            None => {
                log::warn!("apply_edits: layer {:?} does not exist", address);
                Vec::new()
            }
        }
    }

    /// Restore one side of a recorded batch (edits or snapshot).
    pub fn restore_snapshot(&mut self, batch: &ChangeBatch, direction: Direction) {
        self.cancel_gesture();
        batch.apply(&mut self.project, direction);
        self.sync_canvas_size();
    }

    /// Undo against a stack that may also be this editor's history sink. The
    /// gesture in progress is closed before the stack is borrowed.
    pub fn undo(&mut self, history: &RefCell<UndoStack>) -> Option<String> {
        self.cancel_gesture();
        let description = history.borrow_mut().undo(&mut self.project);
        self.sync_canvas_size();
        description
    }

    pub fn redo(&mut self, history: &RefCell<UndoStack>) -> Option<String> {
        self.cancel_gesture();
        let description = history.borrow_mut().redo(&mut self.project);
        self.sync_canvas_size();
        description
    }

    // ========================================================================
    // COLLABORATION
    // ========================================================================

    /// Apply a peer's finished batch. Goes through the normal bounds/diff
    /// path; nothing reaches local history or the collaboration sink.
    pub fn apply_remote_packet(&mut self, packet: &EditPacket) -> usize {
        let applied = self.apply_edits(packet.address, &packet.edits, Direction::Forward);
        log::debug!("Remote {}: {} of {} edits applied", packet.label, applied.len(), packet.edits.len());
        applied.len()
    }

    pub fn apply_remote_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        let packet = decode_packet(bytes)?;
        Ok(self.apply_remote_packet(&packet))
    }

    /// Tool state of a collaborator, created on first use.
    pub fn remote_peer(&mut self, peer: &str) -> &mut RemotePeer {
        let config = &self.config;
        self.remote_peers
            .entry(peer.to_string())
            .or_insert_with(|| RemotePeer::new(DrawingContext::from_config(config)))
    }

    pub fn set_remote_tool(&mut self, peer: &str, tool: Tool) {
        self.remote_peer(peer);
        if let Some(remote) = self.remote_peers.get_mut(peer) {
            remote.set_tool(tool, &mut self.project, &mut self.tracker);
        }
    }

    /// Replay one step of a collaborator's live gesture.
    pub fn replay_remote(&mut self, peer: &str, phase: ToolPhase, point: (i32, i32)) {
        self.remote_peer(peer);
        if let Some(remote) = self.remote_peers.get_mut(peer) {
            remote.replay(&mut self.project, &mut self.tracker, phase, point);
            self.needs_redraw = true;
        }
    }

    pub fn remove_remote_peer(&mut self, peer: &str) {
        if let Some(mut remote) = self.remote_peers.shift_remove(peer) {
            remote.replay(&mut self.project, &mut self.tracker, ToolPhase::Cancel, (0, 0));
        }
    }

    // ========================================================================
    // PLAYBACK
    // ========================================================================

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn toggle_playback(&mut self) {
        self.playback.toggle();
        log::debug!("Playback {}", if self.playback.is_playing() { "started" } else { "stopped" });
    }

    /// Advance playback by one host tick. Returns true when the frame changed.
    pub fn advance_playback(&mut self, dt: Duration) -> bool {
        if !self.playback.is_playing() {
            return false;
        }
        if self.gestures.mode() != GestureMode::Idle || self.tool.is_busy() {
            self.cancel_gesture();
        }
        let changed = self.playback.advance(&mut self.project, dt);
        if changed {
            self.needs_redraw = true;
        }
        changed
    }
}
