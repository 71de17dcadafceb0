//! In-memory implementations of every platform seam.
//!
//! The scheduler runs on a virtual clock: nothing fires until the caller
//! advances it with [`HeadlessScheduler::run_frame`] or
//! [`HeadlessScheduler::advance`]. Containers, surfaces and viewports are
//! cheap `Clone` handles onto shared state so a caller can keep inspecting
//! them after handing a copy to the engine.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use glam::{Vec2, Vec4};
use tracing::trace;

use crate::{
    ColumnContainer, ColumnNode, DrawSurface, FrameCallback, GlowStroke, Handle, HandleKind,
    PathCommand, Result, Scheduler, Subscription, TimerCallback, Viewport, ViewportSize,
};

pub const DEFAULT_FRAME_INTERVAL_MS: f64 = 1000.0 / 60.0;

struct PendingTimer {
    due_ms: f64,
    callback: TimerCallback,
}

#[derive(Default)]
struct SchedulerState {
    now_ms: f64,
    next_id: u64,
    frames: BTreeMap<u64, FrameCallback>,
    timers: BTreeMap<u64, PendingTimer>,
    requested: usize,
    cancelled: usize,
}

pub struct HeadlessScheduler {
    frame_interval_ms: f64,
    state: RefCell<SchedulerState>,
}

impl Default for HeadlessScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessScheduler {
    pub fn new() -> Self {
        Self::with_frame_interval(DEFAULT_FRAME_INTERVAL_MS)
    }

    pub fn with_frame_interval(frame_interval_ms: f64) -> Self {
        Self {
            frame_interval_ms,
            state: RefCell::new(SchedulerState::default()),
        }
    }

    /// Advances the clock by one frame interval, firing due timers on the way,
    /// then runs every frame callback that was pending when the frame began.
    /// A callback cancelled by an earlier one in the same batch is skipped.
    /// Returns the number of frame callbacks run.
    pub fn run_frame(&self) -> usize {
        self.advance(self.frame_interval_ms);
        let (now, batch) = {
            let state = self.state.borrow();
            (state.now_ms, state.frames.keys().copied().collect::<Vec<_>>())
        };
        let mut count = 0;
        for id in batch {
            let callback = self.state.borrow_mut().frames.remove(&id);
            if let Some(callback) = callback {
                callback(now);
                count += 1;
            }
        }
        count
    }

    pub fn run_frames(&self, frames: usize) -> usize {
        (0..frames).map(|_| self.run_frame()).sum()
    }

    /// Moves the clock forward, firing timers in due order. Frame callbacks do
    /// not run.
    pub fn advance(&self, ms: f64) {
        let target = self.state.borrow().now_ms + ms;
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let due = state
                    .timers
                    .iter()
                    .filter(|(_, timer)| timer.due_ms <= target)
                    .min_by(|a, b| a.1.due_ms.total_cmp(&b.1.due_ms).then(a.0.cmp(b.0)))
                    .map(|(id, _)| *id);
                match due.and_then(|id| state.timers.remove(&id)) {
                    Some(timer) => {
                        state.now_ms = state.now_ms.max(timer.due_ms);
                        Some(timer.callback)
                    }
                    None => None,
                }
            };
            match next {
                Some(callback) => callback(),
                None => break,
            }
        }
        self.state.borrow_mut().now_ms = target;
    }

    pub fn pending_frames(&self) -> usize {
        self.state.borrow().frames.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn live_handles(&self) -> usize {
        let state = self.state.borrow();
        state.frames.len() + state.timers.len()
    }

    /// Number of cancellations that removed a pending callback.
    pub fn cancel_count(&self) -> usize {
        self.state.borrow().cancelled
    }

    pub fn request_count(&self) -> usize {
        self.state.borrow().requested
    }

    fn next_handle(state: &mut SchedulerState, kind: HandleKind) -> Handle {
        state.next_id += 1;
        state.requested += 1;
        Handle {
            kind,
            id: state.next_id,
        }
    }
}

impl Scheduler for HeadlessScheduler {
    fn request_frame(&self, callback: FrameCallback) -> Result<Handle> {
        let mut state = self.state.borrow_mut();
        let handle = Self::next_handle(&mut state, HandleKind::Frame);
        state.frames.insert(handle.id, callback);
        Ok(handle)
    }

    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> Result<Handle> {
        let mut state = self.state.borrow_mut();
        let handle = Self::next_handle(&mut state, HandleKind::Timer);
        let due_ms = state.now_ms + delay.as_secs_f64() * 1000.0;
        state.timers.insert(handle.id, PendingTimer { due_ms, callback });
        Ok(handle)
    }

    fn cancel(&self, handle: Handle) {
        let mut state = self.state.borrow_mut();
        let removed = match handle.kind {
            HandleKind::Frame => state.frames.remove(&handle.id).is_some(),
            HandleKind::Timer => state.timers.remove(&handle.id).is_some(),
        };
        if removed {
            state.cancelled += 1;
        } else {
            trace!(%handle, "cancel of settled handle ignored");
        }
    }

    fn now_ms(&self) -> f64 {
        self.state.borrow().now_ms
    }
}

#[derive(Debug, Default)]
struct ContainerState {
    width: f32,
    columns: Vec<ColumnNode>,
    opacity: f32,
    appended_total: usize,
}

/// Column container that keeps appended columns in a vector.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    state: Rc<RefCell<ContainerState>>,
}

impl MemoryContainer {
    pub fn new(width: f32) -> Self {
        let container = Self::default();
        container.state.borrow_mut().width = width;
        container.state.borrow_mut().opacity = 1.0;
        container
    }

    pub fn set_width(&self, width: f32) {
        self.state.borrow_mut().width = width;
    }

    pub fn columns(&self) -> Vec<ColumnNode> {
        self.state.borrow().columns.clone()
    }

    pub fn opacity(&self) -> f32 {
        self.state.borrow().opacity
    }

    /// Columns appended over the container's whole life.
    pub fn appended_total(&self) -> usize {
        self.state.borrow().appended_total
    }
}

impl ColumnContainer for MemoryContainer {
    fn width(&self) -> f32 {
        self.state.borrow().width
    }

    fn append_column(&mut self, column: &ColumnNode) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.columns.push(column.clone());
        state.appended_total += 1;
        Ok(())
    }

    fn clear(&mut self) {
        self.state.borrow_mut().columns.clear();
    }

    fn child_count(&self) -> usize {
        self.state.borrow().columns.len()
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.state.borrow_mut().opacity = opacity;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Circle {
        center: Vec2,
        radius: f32,
        color: Vec4,
    },
    Text {
        text: String,
        center: Vec2,
        font_px: f32,
    },
    Path {
        commands: Vec<PathCommand>,
    },
}

#[derive(Debug, Default)]
struct SurfaceState {
    client_size: Vec2,
    backing_size: Vec2,
    commands: Vec<DrawCommand>,
    clears: usize,
}

/// Draw surface that records the commands issued since the last clear.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    state: Rc<RefCell<SurfaceState>>,
}

impl RecordingSurface {
    pub fn new(client_size: Vec2) -> Self {
        let surface = Self::default();
        surface.state.borrow_mut().client_size = client_size;
        surface
    }

    pub fn set_client_size(&self, size: Vec2) {
        self.state.borrow_mut().client_size = size;
    }

    pub fn commands(&self) -> Vec<DrawCommand> {
        self.state.borrow().commands.clone()
    }

    pub fn circle_count(&self) -> usize {
        self.state
            .borrow()
            .commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Circle { .. }))
            .count()
    }

    /// Number of clears, one per rendered frame.
    pub fn frames_drawn(&self) -> usize {
        self.state.borrow().clears
    }
}

impl DrawSurface for RecordingSurface {
    fn client_size(&self) -> Vec2 {
        self.state.borrow().client_size
    }

    fn backing_size(&self) -> Vec2 {
        self.state.borrow().backing_size
    }

    fn set_backing_size(&mut self, size: Vec2) {
        self.state.borrow_mut().backing_size = size;
    }

    fn clear(&mut self) {
        let mut state = self.state.borrow_mut();
        state.commands.clear();
        state.clears += 1;
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Vec4) {
        self.state.borrow_mut().commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
    }

    fn fill_text(&mut self, text: &str, center: Vec2, font_px: f32, _fill: Vec4, _glow: &GlowStroke) {
        self.state.borrow_mut().commands.push(DrawCommand::Text {
            text: text.to_owned(),
            center,
            font_px,
        });
    }

    fn stroke_path(&mut self, path: &[PathCommand], _glow: &GlowStroke) {
        self.state.borrow_mut().commands.push(DrawCommand::Path {
            commands: path.to_vec(),
        });
    }
}

#[derive(Default)]
struct ViewportState {
    size: ViewportSize,
    user_agent: Option<String>,
    next_id: u64,
    listeners: BTreeMap<u64, Box<dyn FnMut()>>,
    unsubscribed_during_dispatch: Vec<u64>,
}

/// Viewport whose size is set by the caller; [`HeadlessViewport::resize`]
/// notifies every subscribed listener synchronously.
#[derive(Clone, Default)]
pub struct HeadlessViewport {
    state: Rc<RefCell<ViewportState>>,
}

impl HeadlessViewport {
    pub fn new(size: ViewportSize, user_agent: Option<&str>) -> Self {
        let viewport = Self::default();
        {
            let mut state = viewport.state.borrow_mut();
            state.size = size;
            state.user_agent = user_agent.map(str::to_owned);
        }
        viewport
    }

    pub fn resize(&self, size: ViewportSize) {
        let mut listeners = {
            let mut state = self.state.borrow_mut();
            state.size = size;
            state.unsubscribed_during_dispatch.clear();
            std::mem::take(&mut state.listeners)
        };
        for listener in listeners.values_mut() {
            listener();
        }
        let mut state = self.state.borrow_mut();
        for id in std::mem::take(&mut state.unsubscribed_during_dispatch) {
            listeners.remove(&id);
        }
        let added = std::mem::take(&mut state.listeners);
        state.listeners = listeners;
        state.listeners.extend(added);
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

impl Viewport for HeadlessViewport {
    fn size(&self) -> ViewportSize {
        self.state.borrow().size
    }

    fn user_agent(&self) -> Option<String> {
        self.state.borrow().user_agent.clone()
    }

    fn subscribe_resize(&self, listener: Box<dyn FnMut()>) -> Result<Subscription> {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        state.listeners.insert(id, listener);
        Ok(Subscription(id))
    }

    fn unsubscribe(&self, subscription: Subscription) {
        let mut state = self.state.borrow_mut();
        if state.listeners.remove(&subscription.0).is_none() {
            state.unsubscribed_during_dispatch.push(subscription.0);
        }
    }
}
