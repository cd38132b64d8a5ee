use std::time::Instant;

use egui::Pos2;
use smallvec::SmallVec;

use crate::components::history::{ChangeTracker, EditOrigin};
use crate::components::tools::{ActiveTool, DrawingContext, GestureHandler, ToolContext};
use crate::config::GestureConfig;
use crate::project::Project;
use crate::viewport::Viewport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerDevice {
    Mouse,
    Touch,
    Pen,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// What the pointer went down on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerTarget {
    Canvas,
    /// The primary-color swatch; press-and-hold or drag from it samples a color.
    ColorIndicator,
}

#[derive(Clone, Copy, Debug)]
pub struct PointerEvent {
    pub id: u64,
    pub device: PointerDevice,
    pub button: PointerButton,
    /// Screen position
    pub pos: Pos2,
    pub target: PointerTarget,
    pub at: Instant,
}

/// The single active interpretation of the pointer stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureMode {
    Idle,
    Drawing,
    Panning,
    PinchZooming,
    BrushResizing,
    ColorPicking,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerPurpose {
    /// A touch has been held long enough to start drawing.
    CommitDraw,
    /// The color indicator has been held long enough to start picking.
    EngageColorPick,
}

/// A pending deadline owned by the dispatcher. Only the timer whose token the
/// current state still holds may fire; every transition away drops it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GestureTimer {
    pub token: u64,
    pub deadline: Instant,
    pub purpose: TimerPurpose,
}

/// Borrowed editor parts the dispatcher drives for one event.
pub struct Targets<'a> {
    pub project: &'a mut Project,
    pub viewport: &'a mut Viewport,
    pub drawing: &'a mut DrawingContext,
    pub tool: &'a mut ActiveTool,
    pub tracker: &'a mut ChangeTracker,
}

impl Targets<'_> {
    fn with_tool(&mut self, f: impl FnOnce(&mut ActiveTool, &mut ToolContext<'_>)) {
        let mut ctx = ToolContext {
            project: &mut *self.project,
            drawing: &mut *self.drawing,
            tracker: &mut *self.tracker,
            origin: EditOrigin::Local,
        };
        f(&mut *self.tool, &mut ctx);
    }
}

#[derive(Clone, Copy, Debug)]
struct PinchState {
    pointers: [u64; 2],
    initial_distance: f32,
    initial_scale: f32,
    /// Canvas point that was under the initial midpoint
    anchor: Pos2,
    last_mid: Pos2,
    /// Finger distance at the last applied zoom
    applied_distance: f32,
}

#[derive(Clone, Copy, Debug)]
struct BrushResizeState {
    pointers: [u64; 3],
    initial_spread: f32,
    initial_size: u32,
    applied_spread: f32,
}

#[derive(Clone, Copy, Debug)]
enum State {
    Idle,
    /// Touch down, waiting for the draw timer
    Armed { pointer: u64, down_pos: Pos2, token: u64 },
    Drawing { pointer: u64 },
    Panning { pointer: u64, last: Pos2 },
    Pinch(PinchState),
    BrushResize(BrushResizeState),
    /// Pressed on the color indicator, not yet engaged
    PickArmed { pointer: u64, start: Pos2, token: u64 },
    ColorPicking { pointer: u64, start: Pos2, current: Pos2 },
    /// A mode lost its pointers; nothing happens until every pointer lifts.
    Frozen(GestureMode),
}

impl State {
    fn mode(&self) -> GestureMode {
        match self {
            State::Idle | State::Armed { .. } | State::PickArmed { .. } => GestureMode::Idle,
            State::Drawing { .. } => GestureMode::Drawing,
            State::Panning { .. } => GestureMode::Panning,
            State::Pinch(_) => GestureMode::PinchZooming,
            State::BrushResize(_) => GestureMode::BrushResizing,
            State::ColorPicking { .. } => GestureMode::ColorPicking,
            State::Frozen(mode) => *mode,
        }
    }
}

/// Classifies pointer streams into exactly one mode and drives the viewport,
/// the active tool and the drawing context accordingly.
pub struct GestureDispatcher {
    state: State,
    pointers: SmallVec<[(u64, Pos2); 4]>,
    timer: Option<GestureTimer>,
    next_token: u64,
    config: GestureConfig,
}

impl GestureDispatcher {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            state: State::Idle,
            pointers: SmallVec::new(),
            timer: None,
            next_token: 1,
            config,
        }
    }

    pub fn mode(&self) -> GestureMode {
        self.state.mode()
    }

    /// When the host should call `tick` next.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.map(|t| t.deadline)
    }

    pub fn pending_timer(&self) -> Option<GestureTimer> {
        self.timer
    }

    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    /// Indicator-to-pointer segment while a color pick is engaged.
    pub fn color_pick_line(&self) -> Option<(Pos2, Pos2)> {
        match self.state {
            State::ColorPicking { start, current, .. } => Some((start, current)),
            _ => None,
        }
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    pub fn pointer_down(&mut self, ev: PointerEvent, t: &mut Targets<'_>) {
        if self.position(ev.id).is_some() {
            self.update_pointer(ev.id, ev.pos);
            return;
        }
        match self.state {
            State::Idle => {
                if !self.start_single(ev, t) {
                    return;
                }
            }
            State::Armed { .. } => {
                // second finger inside the draw window
                self.timer = None;
                self.track(ev);
                self.enter_pinch(t);
                return;
            }
            State::Drawing { .. } => {
                t.with_tool(|tool, ctx| tool.cancel(ctx));
                self.track(ev);
                self.enter_pinch(t);
                return;
            }
            State::Pinch(_) => {
                self.track(ev);
                self.enter_brush_resize(t);
                return;
            }
            _ => {}
        }
        self.track(ev);
    }

    pub fn pointer_move(&mut self, ev: PointerEvent, t: &mut Targets<'_>) {
        if self.position(ev.id).is_none() {
            return;
        }
        self.update_pointer(ev.id, ev.pos);
        match self.state {
            State::Drawing { pointer } if pointer == ev.id => {
                let point = t.viewport.screen_to_canvas_unbounded(ev.pos);
                t.with_tool(|tool, ctx| tool.on_move(ctx, point));
            }
            State::Panning { pointer, last } if pointer == ev.id => {
                t.viewport.pan(ev.pos - last);
                self.state = State::Panning { pointer, last: ev.pos };
            }
            State::Pinch(pinch) if pinch.pointers.contains(&ev.id) => self.update_pinch(pinch, t),
            State::BrushResize(resize) if resize.pointers.contains(&ev.id) => {
                self.update_brush_resize(resize, t)
            }
            State::PickArmed { pointer, start, .. } if pointer == ev.id => {
                if (ev.pos - start).length() > self.config.color_pick_drag_px {
                    self.timer = None;
                    self.set_state(State::ColorPicking {
                        pointer,
                        start,
                        current: ev.pos,
                    });
                }
            }
            State::ColorPicking { pointer, start, .. } if pointer == ev.id => {
                self.state = State::ColorPicking {
                    pointer,
                    start,
                    current: ev.pos,
                };
            }
            // armed touches never commit on movement
            _ => {}
        }
    }

    pub fn pointer_up(&mut self, ev: PointerEvent, t: &mut Targets<'_>) {
        self.release(ev, t, true);
    }

    /// Platform cancel (e.g. touch-cancel): like `pointer_up` but nothing is
    /// committed.
    pub fn pointer_cancel(&mut self, ev: PointerEvent, t: &mut Targets<'_>) {
        self.release(ev, t, false);
    }

    /// Abort whatever is in progress and forget all pointers. Idempotent.
    pub fn cancel(&mut self, t: &mut Targets<'_>) {
        if let State::Drawing { .. } = self.state {
            t.with_tool(|tool, ctx| tool.cancel(ctx));
        }
        self.timer = None;
        self.pointers.clear();
        self.set_state(State::Idle);
    }

    /// Fire the pending timer if its deadline has passed.
    pub fn tick(&mut self, now: Instant, t: &mut Targets<'_>) {
        let Some(timer) = self.timer else { return };
        if now < timer.deadline {
            return;
        }
        self.timer = None;
        log::debug!("Gesture timer {} fired ({:?})", timer.token, timer.purpose);
        match (timer.purpose, self.state) {
            (TimerPurpose::CommitDraw, State::Armed { pointer, down_pos, token }) if token == timer.token => {
                self.begin_drawing(pointer, down_pos, t);
                // wobble inside the move threshold is not part of the stroke
                let threshold = self.config.move_threshold_px;
                if let Some(current) = self.position(pointer).filter(|p| (*p - down_pos).length() > threshold) {
                    let point = t.viewport.screen_to_canvas_unbounded(current);
                    t.with_tool(|tool, ctx| tool.on_move(ctx, point));
                }
            }
            (TimerPurpose::EngageColorPick, State::PickArmed { pointer, start, token }) if token == timer.token => {
                let current = self.position(pointer).unwrap_or(start);
                self.set_state(State::ColorPicking { pointer, start, current });
            }
            _ => log::debug!("Stale gesture timer {} ignored", timer.token),
        }
    }

    // ========================================================================
    // TRANSITIONS
    // ========================================================================

    /// First pointer while idle. Returns false when the pointer is ignored.
    fn start_single(&mut self, ev: PointerEvent, t: &mut Targets<'_>) -> bool {
        if ev.target == PointerTarget::ColorIndicator {
            let token = self.arm_timer(ev.at + self.config.color_pick_hold(), TimerPurpose::EngageColorPick);
            self.set_state(State::PickArmed {
                pointer: ev.id,
                start: ev.pos,
                token,
            });
            return true;
        }
        match (ev.device, ev.button) {
            (PointerDevice::Touch, _) => {
                let token = self.arm_timer(ev.at + self.config.touch_draw_delay(), TimerPurpose::CommitDraw);
                self.set_state(State::Armed {
                    pointer: ev.id,
                    down_pos: ev.pos,
                    token,
                });
            }
            (_, PointerButton::Middle) => self.set_state(State::Panning {
                pointer: ev.id,
                last: ev.pos,
            }),
            (_, PointerButton::Primary) if t.drawing.pan_modifier => self.set_state(State::Panning {
                pointer: ev.id,
                last: ev.pos,
            }),
            (_, PointerButton::Primary) => self.begin_drawing(ev.id, ev.pos, t),
            (_, PointerButton::Secondary) => return false,
        }
        true
    }

    fn begin_drawing(&mut self, pointer: u64, pos: Pos2, t: &mut Targets<'_>) {
        let point = t.viewport.screen_to_canvas_unbounded(pos);
        t.with_tool(|tool, ctx| tool.on_down(ctx, point));
        self.set_state(State::Drawing { pointer });
    }

    fn enter_pinch(&mut self, t: &mut Targets<'_>) {
        let [(a, pa), (b, pb)] = match self.pointers.as_slice() {
            [first, second, ..] => [*first, *second],
            _ => return,
        };
        let mid = midpoint(pa, pb);
        let distance = pa.distance(pb);
        self.set_state(State::Pinch(PinchState {
            pointers: [a, b],
            initial_distance: distance,
            initial_scale: t.viewport.scale(),
            anchor: t.viewport.screen_to_canvas_f32(mid),
            last_mid: mid,
            applied_distance: distance,
        }));
    }

    fn update_pinch(&mut self, mut pinch: PinchState, t: &mut Targets<'_>) {
        let (Some(pa), Some(pb)) = (self.position(pinch.pointers[0]), self.position(pinch.pointers[1])) else {
            return;
        };
        let mid = midpoint(pa, pb);
        let distance = pa.distance(pb);
        // measured against the last applied zoom, so slow spreads accumulate
        let is_noise = (distance - pinch.applied_distance).abs() < self.config.pinch_noise_px;
        if is_noise || pinch.initial_distance < f32::EPSILON {
            t.viewport.pan(mid - pinch.last_mid);
        } else {
            let scale = pinch.initial_scale * distance / pinch.initial_distance;
            t.viewport.zoom_to_anchor(scale, pinch.anchor, mid);
            pinch.applied_distance = distance;
        }
        pinch.last_mid = mid;
        self.state = State::Pinch(pinch);
    }

    fn enter_brush_resize(&mut self, t: &mut Targets<'_>) {
        self.timer = None;
        let pointers = match self.pointers.as_slice() {
            [a, b, c, ..] => [a.0, b.0, c.0],
            _ => return,
        };
        let spread = self.spread(&pointers).unwrap_or(0.0);
        self.set_state(State::BrushResize(BrushResizeState {
            pointers,
            initial_spread: spread,
            initial_size: t.drawing.brush_size(),
            applied_spread: spread,
        }));
    }

    fn update_brush_resize(&mut self, mut resize: BrushResizeState, t: &mut Targets<'_>) {
        let Some(spread) = self.spread(&resize.pointers) else { return };
        if resize.initial_spread < f32::EPSILON {
            return;
        }
        let change = (spread - resize.applied_spread).abs() / resize.initial_spread;
        if change <= self.config.spread_epsilon {
            return;
        }
        let (min, max) = t.drawing.brush_limits();
        let size = (resize.initial_size as f32 * spread / resize.initial_spread)
            .round()
            .clamp(min as f32, max as f32) as u32;
        let applied = t.drawing.set_brush_size(size);
        log::debug!("Brush resize: spread {:.1} -> size {}", spread, applied);
        resize.applied_spread = spread;
        self.state = State::BrushResize(resize);
    }

    fn release(&mut self, ev: PointerEvent, t: &mut Targets<'_>, commit: bool) {
        if self.position(ev.id).is_none() {
            return;
        }
        self.update_pointer(ev.id, ev.pos);
        let point = t.viewport.screen_to_canvas_unbounded(ev.pos);
        self.pointers.retain(|(id, _)| *id != ev.id);

        let ended = match self.state {
            State::Armed { pointer, down_pos, .. } if pointer == ev.id => {
                self.timer = None;
                if commit {
                    // a tap shorter than the draw delay still draws
                    self.begin_drawing(pointer, down_pos, t);
                    t.with_tool(|tool, ctx| tool.on_up(ctx, point));
                }
                true
            }
            State::Drawing { pointer } if pointer == ev.id => {
                if commit {
                    t.with_tool(|tool, ctx| tool.on_up(ctx, point));
                } else {
                    t.with_tool(|tool, ctx| tool.cancel(ctx));
                }
                true
            }
            State::Panning { pointer, .. } => pointer == ev.id,
            State::Pinch(pinch) => pinch.pointers.contains(&ev.id),
            State::BrushResize(resize) => resize.pointers.contains(&ev.id),
            State::PickArmed { pointer, .. } => {
                if pointer == ev.id {
                    self.timer = None;
                }
                pointer == ev.id
            }
            State::ColorPicking { pointer, .. } if pointer == ev.id => {
                if commit {
                    self.finish_color_pick(ev.pos, t);
                }
                true
            }
            State::Frozen(_) => false,
            _ => false,
        };

        if self.pointers.is_empty() {
            self.set_state(State::Idle);
        } else if ended {
            let mode = match self.state {
                State::Pinch(_) | State::BrushResize(_) => self.state.mode(),
                _ => GestureMode::Idle,
            };
            self.set_state(State::Frozen(mode));
        }
    }

    fn finish_color_pick(&mut self, pos: Pos2, t: &mut Targets<'_>) {
        let Some((x, y)) = t.viewport.screen_to_canvas(pos) else {
            log::debug!("Color pick released outside the canvas");
            return;
        };
        match t.project.sample_color(x as u32, y as u32) {
            Some(color) => {
                log::debug!("Color pick at ({}, {}) -> {}", x, y, color);
                t.drawing.primary_color = color;
            }
            None => log::debug!("Color pick at ({}, {}) found only transparency", x, y),
        }
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn set_state(&mut self, next: State) {
        let (from, to) = (self.state.mode(), next.mode());
        if from != to {
            log::debug!("Gesture mode {:?} -> {:?}", from, to);
        }
        self.state = next;
    }

    fn arm_timer(&mut self, deadline: Instant, purpose: TimerPurpose) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        self.timer = Some(GestureTimer {
            token,
            deadline,
            purpose,
        });
        token
    }

    fn track(&mut self, ev: PointerEvent) {
        self.pointers.push((ev.id, ev.pos));
    }

    fn position(&self, id: u64) -> Option<Pos2> {
        self.pointers.iter().find(|(pid, _)| *pid == id).map(|(_, pos)| *pos)
    }

    fn update_pointer(&mut self, id: u64, pos: Pos2) {
        if let Some(entry) = self.pointers.iter_mut().find(|(pid, _)| *pid == id) {
            entry.1 = pos;
        }
    }

    /// Mean distance of the given pointers from their centroid.
    fn spread(&self, ids: &[u64]) -> Option<f32> {
        let points: SmallVec<[Pos2; 3]> = ids.iter().map(|id| self.position(*id)).collect::<Option<_>>()?;
        let n = points.len() as f32;
        let centroid = points.iter().fold(Pos2::ZERO, |acc, p| acc + p.to_vec2() / n);
        Some(points.iter().map(|p| p.distance(centroid)).sum::<f32>() / n)
    }
}

fn midpoint(a: Pos2, b: Pos2) -> Pos2 {
    a + (b - a) * 0.5
}
