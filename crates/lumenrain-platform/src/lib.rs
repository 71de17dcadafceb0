//! Platform abstraction traits so `lumenrain-core` stays environment-agnostic.
//!
//! Everything here is single-threaded: callbacks are `FnOnce`/`FnMut` boxes
//! without `Send`, matching the cooperative frame scheduling of a browser tab.

use std::fmt;
use std::time::Duration;

use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

pub mod headless;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// What kind of primitive a [`Handle`] was obtained from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Frame,
    Timer,
}

/// Opaque token for a scheduled callback. Only the scheduler that issued it
/// can interpret `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub kind: HandleKind,
    pub id: u64,
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            HandleKind::Frame => write!(f, "frame#{}", self.id),
            HandleKind::Timer => write!(f, "timer#{}", self.id),
        }
    }
}

/// Receives the frame timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64)>;
pub type TimerCallback = Box<dyn FnOnce()>;

/// Per-frame and timer scheduling primitives of the host environment.
pub trait Scheduler {
    fn request_frame(&self, callback: FrameCallback) -> Result<Handle>;
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> Result<Handle>;
    /// Cancels a pending callback. Unknown or already-fired handles are ignored.
    fn cancel(&self, handle: Handle);
    fn now_ms(&self) -> f64;
}

/// Glow applied to overlay strokes and text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlowStroke {
    pub color: Vec4,
    pub blur: f32,
    pub line_width: f32,
}

impl Default for GlowStroke {
    fn default() -> Self {
        Self {
            color: Vec4::new(1.0, 0.85, 0.4, 1.0),
            blur: 18.0,
            line_width: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCommand {
    MoveTo(Vec2),
    LineTo(Vec2),
    QuadTo { ctrl: Vec2, to: Vec2 },
    Close,
}

impl PathCommand {
    /// Maps every point of the command through `f`.
    pub fn map(self, f: impl Fn(Vec2) -> Vec2) -> Self {
        match self {
            PathCommand::MoveTo(p) => PathCommand::MoveTo(f(p)),
            PathCommand::LineTo(p) => PathCommand::LineTo(f(p)),
            PathCommand::QuadTo { ctrl, to } => PathCommand::QuadTo {
                ctrl: f(ctrl),
                to: f(to),
            },
            PathCommand::Close => PathCommand::Close,
        }
    }
}

/// 2D drawing target backed by a canvas element.
pub trait DrawSurface {
    /// Laid-out size of the element in CSS pixels.
    fn client_size(&self) -> Vec2;
    fn backing_size(&self) -> Vec2;
    fn set_backing_size(&mut self, size: Vec2);
    fn clear(&mut self);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Vec4);
    fn fill_text(&mut self, text: &str, center: Vec2, font_px: f32, fill: Vec4, glow: &GlowStroke);
    fn stroke_path(&mut self, path: &[PathCommand], glow: &GlowStroke);
}

/// One rain column as handed to a [`ColumnContainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnNode {
    pub offset_px: f32,
    /// Newline-joined glyphs.
    pub text: String,
    pub start_delay: Duration,
    pub scroll_duration: Duration,
}

/// Element that receives rain columns. Motion is owned by the environment's
/// animation timeline once a column is appended.
pub trait ColumnContainer {
    fn width(&self) -> f32;
    fn append_column(&mut self, column: &ColumnNode) -> Result<()>;
    fn clear(&mut self);
    fn child_count(&self) -> usize;
    fn set_opacity(&mut self, opacity: f32);
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f32,
    pub height: f32,
}

impl ViewportSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Token returned by [`Viewport::subscribe_resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(pub u64);

pub trait Viewport {
    fn size(&self) -> ViewportSize;
    fn user_agent(&self) -> Option<String>;
    fn subscribe_resize(&self, listener: Box<dyn FnMut()>) -> Result<Subscription>;
    fn unsubscribe(&self, subscription: Subscription);
}
