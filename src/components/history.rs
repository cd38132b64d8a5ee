use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use image::RgbaImage;
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};

use crate::canvas::{LayerId, LayerTarget, PixelEdit};
use crate::config::HistoryConfig;
use crate::ops::raster::{Direction, apply_edits};
use crate::project::Project;

// ============================================================================
// BATCHES
// ============================================================================

/// What produced a batch; lets the history UI pick icons and wording.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchKind {
    /// Pencil / eraser strokes.
    Draw,
    /// Line, rectangle and ellipse tools.
    Shape,
    /// Bucket fill.
    Fill,
    /// Whole-buffer transforms and adjustments.
    Transform,
}

/// Whether edits were made by the local user or replayed from a peer.
/// Remote edits mutate pixels through the same path but are never re-emitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditOrigin {
    #[default]
    Local,
    Remote,
}

/// Before/after copy of one layer for whole-buffer operations.
#[derive(Clone, Debug)]
pub struct LayerSnapshot {
    pub target: LayerTarget,
    pub before: RgbaImage,
    pub after: RgbaImage,
}

/// Pixels of every layer of every frame, plus canvas size and reference.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasPixels {
    pub width: u32,
    pub height: u32,
    /// Layer ids per frame, in the same order as `frames`.
    pub layers: Vec<Vec<LayerId>>,
    pub frames: Vec<Vec<RgbaImage>>,
    pub reference: Option<RgbaImage>,
}

impl CanvasPixels {
    pub fn capture(project: &Project) -> Self {
        Self {
            width: project.width,
            height: project.height,
            layers: project.frames.iter().map(|f| f.layers.iter().map(|l| l.id).collect()).collect(),
            frames: project
                .frames
                .iter()
                .map(|f| f.layers.iter().map(|l| l.pixels.clone()).collect())
                .collect(),
            reference: project.reference.clone(),
        }
    }

    /// Write the captured pixels back. Refuses (returns false) unless the
    /// project still holds exactly the captured layers in the captured order.
    pub fn restore_into(&self, project: &mut Project) -> bool {
        let layout_matches = project.frames.len() == self.layers.len()
            && project
                .frames
                .iter()
                .zip(&self.layers)
                .all(|(frame, ids)| frame.layers.iter().map(|l| l.id).eq(ids.iter().copied()));
        if !layout_matches {
            log::warn!("Canvas snapshot no longer matches the project layout; restore skipped");
            return false;
        }
        for (frame, layers) in project.frames.iter_mut().zip(&self.frames) {
            for (layer, pixels) in frame.layers.iter_mut().zip(layers) {
                layer.pixels = pixels.clone();
            }
        }
        project.width = self.width;
        project.height = self.height;
        project.reference = self.reference.clone();
        project.clamp_indices();
        true
    }

    fn memory_bytes(&self) -> usize {
        let layers: usize = self.frames.iter().flatten().map(|p| p.as_raw().len()).sum();
        layers + self.reference.as_ref().map_or(0, |r| r.as_raw().len())
    }
}

/// Before/after copy of the whole canvas (canvas rotation).
#[derive(Clone, Debug)]
pub struct CanvasSnapshot {
    pub before: CanvasPixels,
    pub after: CanvasPixels,
}

#[derive(Clone, Debug)]
pub enum BatchPayload {
    /// Minimal per-pixel diff for drawing tools.
    Edits {
        target: LayerTarget,
        edits: Vec<PixelEdit>,
    },
    /// Full before/after buffer of one layer.
    Layer(LayerSnapshot),
    /// Full before/after of every layer.
    Canvas(CanvasSnapshot),
}

/// One undoable unit handed to the history collaborator.
#[derive(Clone, Debug)]
pub struct ChangeBatch {
    pub kind: BatchKind,
    pub label: String,
    pub payload: BatchPayload,
}

impl ChangeBatch {
    pub fn description(&self) -> &str {
        &self.label
    }

    pub fn edit_count(&self) -> usize {
        match &self.payload {
            BatchPayload::Edits { edits, .. } => edits.len(),
            _ => 0,
        }
    }

    pub fn memory_size(&self) -> usize {
        match &self.payload {
            BatchPayload::Edits { edits, .. } => edits.len() * std::mem::size_of::<PixelEdit>(),
            BatchPayload::Layer(snap) => snap.before.as_raw().len() + snap.after.as_raw().len(),
            BatchPayload::Canvas(snap) => snap.before.memory_bytes() + snap.after.memory_bytes(),
        }
    }

    /// Re-apply this batch to the project in `direction`. This is the callback
    /// path history uses for undo (`Backward`) and redo (`Forward`).
    pub fn apply(&self, project: &mut Project, direction: Direction) {
        match &self.payload {
            BatchPayload::Edits { target, edits } => {
                match project.resolve(*target).and_then(|addr| project.layer_mut(addr)) {
                    Some(layer) => {
                        apply_edits(&mut layer.pixels, edits, direction);
                    }
                    None => log::warn!("History edits target deleted layer {:?}", target.address),
                }
            }
            BatchPayload::Layer(snap) => restore_layer_snapshot(project, snap, direction),
            BatchPayload::Canvas(snap) => {
                let pixels = match direction {
                    Direction::Forward => &snap.after,
                    Direction::Backward => &snap.before,
                };
                pixels.restore_into(project);
            }
        }
    }
}

/// Put one side of a layer snapshot back into the project.
pub fn restore_layer_snapshot(project: &mut Project, snap: &LayerSnapshot, direction: Direction) {
    let pixels = match direction {
        Direction::Forward => &snap.after,
        Direction::Backward => &snap.before,
    };
    let (w, h) = (project.width, project.height);
    match project.resolve(snap.target).and_then(|addr| project.layer_mut(addr)) {
        Some(layer) if pixels.dimensions() == (w, h) => layer.pixels = pixels.clone(),
        Some(_) => log::warn!("Layer snapshot size no longer matches the canvas; restore skipped"),
        None => log::warn!("Layer snapshot targets deleted layer {:?}", snap.target.address),
    }
}

// ============================================================================
// SINKS
// ============================================================================

/// External history collaborator: receives every completed local batch.
pub trait HistorySink {
    fn on_batch_complete(&mut self, batch: ChangeBatch);
}

/// External collaboration collaborator: receives local per-pixel batches to
/// forward to peers.
pub trait CollabSink {
    fn broadcast(&mut self, batch: &ChangeBatch);
}

impl<T: HistorySink> HistorySink for Rc<RefCell<T>> {
    fn on_batch_complete(&mut self, batch: ChangeBatch) {
        self.borrow_mut().on_batch_complete(batch);
    }
}

impl<T: CollabSink> CollabSink for Rc<RefCell<T>> {
    fn broadcast(&mut self, batch: &ChangeBatch) {
        self.borrow_mut().broadcast(batch);
    }
}

/// History sink that discards everything.
#[derive(Default)]
pub struct NullHistory;

impl HistorySink for NullHistory {
    fn on_batch_complete(&mut self, _batch: ChangeBatch) {}
}

// ============================================================================
// CHANGE TRACKER
// ============================================================================

struct OpenBatch {
    kind: BatchKind,
    label: String,
    target: LayerTarget,
    /// Coalesced per pixel: first old color, latest new color.
    edits: IndexMap<(u32, u32), PixelEdit>,
}

impl OpenBatch {
    fn new(kind: BatchKind, label: String, target: LayerTarget) -> Self {
        Self {
            kind,
            label,
            target,
            edits: IndexMap::new(),
        }
    }

    fn extend(&mut self, edits: Vec<PixelEdit>) {
        for edit in edits.into_iter().filter(|e| e.old_color != e.new_color) {
            match self.edits.entry((edit.x, edit.y)) {
                Entry::Occupied(mut slot) => slot.get_mut().new_color = edit.new_color,
                Entry::Vacant(slot) => {
                    slot.insert(edit);
                }
            }
        }
    }

    fn into_batch(self) -> Option<ChangeBatch> {
        let edits: Vec<PixelEdit> = self
            .edits
            .into_values()
            .filter(|e| e.old_color != e.new_color)
            .collect();
        if edits.is_empty() {
            return None;
        }
        Some(ChangeBatch {
            kind: self.kind,
            label: self.label,
            payload: BatchPayload::Edits {
                target: self.target,
                edits,
            },
        })
    }
}

/// Groups the edits of one gesture into one undoable batch and hands it to
/// the history (and collaboration) sinks. Never performs undo itself.
pub struct ChangeTracker {
    open: Option<OpenBatch>,
    history: Box<dyn HistorySink>,
    collab: Option<Box<dyn CollabSink>>,
    completed: usize,
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new(Box::new(NullHistory))
    }
}

impl ChangeTracker {
    pub fn new(history: Box<dyn HistorySink>) -> Self {
        Self {
            open: None,
            history,
            collab: None,
            completed: 0,
        }
    }

    pub fn set_collab(&mut self, collab: Option<Box<dyn CollabSink>>) {
        self.collab = collab;
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Number of batches handed to history so far.
    pub fn completed_batches(&self) -> usize {
        self.completed
    }

    /// Open a batch for one gesture. An already open batch is closed first.
    pub fn start_batch(&mut self, kind: BatchKind, label: &str, target: LayerTarget, origin: EditOrigin) {
        if origin == EditOrigin::Remote {
            return;
        }
        self.end_batch(origin);
        self.open = Some(OpenBatch::new(kind, label.to_string(), target));
    }

    /// Append edits to the open batch. Without an open batch (or for a
    /// different layer) the edits form their own single-operation batch.
    pub fn record_edits(&mut self, kind: BatchKind, label: &str, target: LayerTarget, edits: Vec<PixelEdit>, origin: EditOrigin) {
        if origin == EditOrigin::Remote || edits.is_empty() {
            return;
        }
        match self.open.as_mut() {
            Some(open) if open.target == target => open.extend(edits),
            _ => {
                let mut single = OpenBatch::new(kind, label.to_string(), target);
                single.extend(edits);
                if let Some(batch) = single.into_batch() {
                    self.emit(batch);
                }
            }
        }
    }

    /// Close the open batch; an empty batch produces no history entry.
    pub fn end_batch(&mut self, origin: EditOrigin) {
        if origin == EditOrigin::Remote {
            return;
        }
        if let Some(batch) = self.open.take().and_then(OpenBatch::into_batch) {
            self.emit(batch);
        }
    }

    /// Record a whole-layer operation as a before/after snapshot pair.
    pub fn record_layer_snapshot(&mut self, label: &str, snapshot: LayerSnapshot) {
        if snapshot.before == snapshot.after {
            log::debug!("{}: layer unchanged, no history entry", label);
            return;
        }
        self.end_batch(EditOrigin::Local);
        self.emit(ChangeBatch {
            kind: BatchKind::Transform,
            label: label.to_string(),
            payload: BatchPayload::Layer(snapshot),
        });
    }

    /// Record a whole-canvas operation (every layer) as a snapshot pair.
    pub fn record_canvas_snapshot(&mut self, label: &str, snapshot: CanvasSnapshot) {
        if snapshot.before == snapshot.after {
            log::debug!("{}: canvas unchanged, no history entry", label);
            return;
        }
        self.end_batch(EditOrigin::Local);
        self.emit(ChangeBatch {
            kind: BatchKind::Transform,
            label: label.to_string(),
            payload: BatchPayload::Canvas(snapshot),
        });
    }

    fn emit(&mut self, batch: ChangeBatch) {
        log::info!("History: {} ({} edits, {} bytes)", batch.label, batch.edit_count(), batch.memory_size());
        if let (Some(collab), BatchPayload::Edits { .. }) = (self.collab.as_mut(), &batch.payload) {
            collab.broadcast(&batch);
        }
        self.completed += 1;
        self.history.on_batch_complete(batch);
    }
}

// ============================================================================
// UNDO STACK - reference history collaborator with count and memory limits
// ============================================================================

/// Bounded undo/redo history. Oldest entries are evicted first; the newest
/// entry always survives, even when it alone exceeds the memory budget.
pub struct UndoStack {
    undo_stack: VecDeque<ChangeBatch>,
    redo_stack: VecDeque<ChangeBatch>,
    limits: HistoryConfig,
    /// Running memory total across both stacks.
    total_memory: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::from_config(&HistoryConfig::default())
    }
}

impl HistorySink for UndoStack {
    fn on_batch_complete(&mut self, batch: ChangeBatch) {
        self.push(batch);
    }
}

impl UndoStack {
    /// `max_memory_bytes == 0` disables the memory budget.
    pub fn from_config(config: &HistoryConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            limits: HistoryConfig {
                max_entries: config.max_entries.max(1),
                max_memory_bytes: config.max_memory_bytes,
            },
            total_memory: 0,
        }
    }

    pub fn limits(&self) -> &HistoryConfig {
        &self.limits
    }

    /// Record a finished batch. Anything that could be redone is dropped.
    pub fn push(&mut self, batch: ChangeBatch) {
        let dropped: usize = self.redo_stack.drain(..).map(|old| old.memory_size()).sum();
        self.total_memory = self.total_memory.saturating_sub(dropped);
        self.total_memory += batch.memory_size();
        self.undo_stack.push_back(batch);
        let evicted = self.enforce_limits();
        if evicted > 0 {
            log::debug!(
                "History: evicted {} oldest entries ({} entries, {} bytes left)",
                evicted,
                self.undo_stack.len(),
                self.total_memory
            );
        }
    }

    pub fn undo(&mut self, project: &mut Project) -> Option<String> {
        let batch = self.undo_stack.pop_back()?;
        batch.apply(project, Direction::Backward);
        let description = batch.label.clone();
        self.redo_stack.push_back(batch);
        Some(description)
    }

    pub fn redo(&mut self, project: &mut Project) -> Option<String> {
        let batch = self.redo_stack.pop_back()?;
        batch.apply(project, Direction::Forward);
        let description = batch.label.clone();
        self.undo_stack.push_back(batch);
        Some(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// All undo descriptions, most recent first.
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack.iter().rev().map(|b| b.label.clone()).collect()
    }

    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_memory = 0;
    }

    fn over_budget(&self) -> bool {
        let HistoryConfig {
            max_entries,
            max_memory_bytes,
        } = self.limits;
        self.undo_stack.len() > max_entries || (max_memory_bytes > 0 && self.total_memory > max_memory_bytes)
    }

    /// Evict from the old end until both limits hold. Returns how many
    /// entries went.
    fn enforce_limits(&mut self) -> usize {
        let mut evicted = 0;
        while self.undo_stack.len() > 1 && self.over_budget() {
            let Some(oldest) = self.undo_stack.pop_front() else { break };
            self.total_memory = self.total_memory.saturating_sub(oldest.memory_size());
            evicted += 1;
        }
        evicted
    }
}
