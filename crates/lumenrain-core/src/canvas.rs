//! Canvas particle glow: per-frame simulation plus a static glowing overlay.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use glam::{Vec2, Vec4};
use lumenrain_platform::{DrawSurface, Handle, PathCommand};
use rand::rngs::SmallRng;
use tracing::{debug, trace, warn};

use crate::config::{MotionMode, Overlay, ParticlePreset, TickTiming};
use crate::error::Result;
use crate::lifecycle::{LifecycleManager, LoopId};
use crate::particles::ParticleSet;

/// Elapsed-time steps are capped so a throttled tab resumes smoothly.
const MAX_ELAPSED_STEPS: f32 = 4.0;

/// Five-pointed star in unit coordinates, y pointing down.
pub const LOGO_PATH: &[PathCommand] = &[
    PathCommand::MoveTo(Vec2::new(0.0, -1.0)),
    PathCommand::LineTo(Vec2::new(0.2351, -0.3236)),
    PathCommand::LineTo(Vec2::new(0.9511, -0.3090)),
    PathCommand::LineTo(Vec2::new(0.3804, 0.1236)),
    PathCommand::LineTo(Vec2::new(0.5878, 0.8090)),
    PathCommand::LineTo(Vec2::new(0.0, 0.4)),
    PathCommand::LineTo(Vec2::new(-0.5878, 0.8090)),
    PathCommand::LineTo(Vec2::new(-0.3804, 0.1236)),
    PathCommand::LineTo(Vec2::new(-0.9511, -0.3090)),
    PathCommand::LineTo(Vec2::new(-0.2351, -0.3236)),
    PathCommand::Close,
];

/// Values derived from the canvas size; rebuilt on every resize.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub size: Vec2,
    pub center: Vec2,
    pub orbit_radius: f32,
    pub font_px: f32,
    pub overlay_path: Vec<PathCommand>,
}

impl Geometry {
    fn derive(size: Vec2, preset: &ParticlePreset) -> Self {
        let min_side = size.x.min(size.y).max(0.0);
        let center = size * 0.5;
        let orbit_radius = match preset.motion {
            MotionMode::Orbiting {
                radius_fraction, ..
            } => radius_fraction * min_side,
            MotionMode::Falling => 0.0,
        };
        let (font_px, overlay_path) = match &preset.overlay {
            Overlay::Glyph { font_fraction, .. } => (font_fraction * min_side, Vec::new()),
            Overlay::LogoPath { scale_fraction } => {
                let scale = scale_fraction * min_side * 0.5;
                let path = LOGO_PATH
                    .iter()
                    .map(|cmd| cmd.map(|p| center + p * scale))
                    .collect();
                (0.0, path)
            }
        };
        Self {
            size,
            center,
            orbit_radius,
            font_px,
            overlay_path,
        }
    }
}

pub struct ParticleCanvasEngine {
    preset: ParticlePreset,
    timing: TickTiming,
    surface: Option<Box<dyn DrawSurface>>,
    particles: ParticleSet,
    geometry: Geometry,
    rng: SmallRng,
    last_frame_ms: Option<f64>,
    ticks: u64,
}

impl ParticleCanvasEngine {
    /// `surface` is `None` when the environment could not provide a 2D
    /// context; every operation is then a no-op.
    pub fn new(
        surface: Option<Box<dyn DrawSurface>>,
        preset: ParticlePreset,
        timing: TickTiming,
        rng: SmallRng,
    ) -> Self {
        if surface.is_none() {
            warn!(preset = %preset.name, "no 2D context; particle glow disabled");
        }
        Self {
            preset,
            timing,
            surface,
            particles: ParticleSet::default(),
            geometry: Geometry::default(),
            rng,
            last_frame_ms: None,
            ticks: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.preset.name
    }

    pub fn is_renderable(&self) -> bool {
        self.surface.is_some()
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Allocates the preset's particles inside the current geometry. Returns
    /// the number allocated.
    pub fn init(&mut self) -> usize {
        if self.surface.is_none() {
            return 0;
        }
        self.particles = ParticleSet::init(
            self.geometry.size,
            self.preset.particle_count,
            &mut self.rng,
        );
        self.last_frame_ms = None;
        self.particles.len()
    }

    /// Matches the backing store to the element's laid-out size.
    pub fn fit_to_client(&mut self) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        let size = surface.client_size();
        self.resize(size);
    }

    pub fn resize(&mut self, new_size: Vec2) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let size = new_size.max(Vec2::ZERO).floor();
        surface.set_backing_size(size);
        self.geometry = Geometry::derive(size, &self.preset);
        let reseeded = self.particles.reseed_outside(size, &mut self.rng);
        debug!(
            preset = %self.preset.name,
            width = size.x,
            height = size.y,
            reseeded,
            "canvas resized"
        );
    }

    /// One frame: advance every particle, then clear, draw particles and the
    /// overlay.
    pub fn render_tick(&mut self, now_ms: f64) {
        let steps = self.steps_for(now_ms);
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let geometry = &self.geometry;
        match self.preset.motion {
            MotionMode::Falling => {
                self.particles
                    .advance_falling(geometry.size, steps, &mut self.rng)
            }
            MotionMode::Orbiting { angular_step, .. } => self.particles.advance_orbit(
                geometry.center,
                geometry.orbit_radius,
                angular_step,
                steps,
            ),
        }

        surface.clear();
        let base = self.preset.particle_color;
        for particle in &self.particles.particles {
            let color = Vec4::new(base.x, base.y, base.z, base.w * particle.brightness);
            surface.fill_circle(particle.pos, particle.radius, color);
        }
        match &self.preset.overlay {
            Overlay::Glyph { text, .. } => surface.fill_text(
                text,
                geometry.center,
                geometry.font_px,
                self.preset.overlay_fill,
                &self.preset.glow,
            ),
            Overlay::LogoPath { .. } => surface.stroke_path(&geometry.overlay_path, &self.preset.glow),
        }
        self.ticks += 1;
        trace!(preset = %self.preset.name, tick = self.ticks, steps, "frame rendered");
    }

    fn steps_for(&mut self, now_ms: f64) -> f32 {
        let previous = self.last_frame_ms.replace(now_ms);
        match self.timing {
            TickTiming::PerFrame => 1.0,
            TickTiming::Elapsed { reference_fps } => match previous {
                Some(previous) => {
                    let frame_ms = 1000.0 / reference_fps as f64;
                    (((now_ms - previous) / frame_ms) as f32).clamp(0.0, MAX_ELAPSED_STEPS)
                }
                None => 1.0,
            },
        }
    }
}

/// Schedules the next frame of `engine` under `loop_id`. Each frame renders
/// and then schedules its successor, so ticks never overlap. The callback
/// holds only weak references: once the host drops the engine or the
/// lifecycle manager, a pending frame does nothing.
pub fn schedule_frame(
    engine: &Rc<RefCell<ParticleCanvasEngine>>,
    lifecycle: &Rc<LifecycleManager>,
    loop_id: LoopId,
) -> Result<Handle> {
    let engine_weak: Weak<RefCell<ParticleCanvasEngine>> = Rc::downgrade(engine);
    let lifecycle_weak = Rc::downgrade(lifecycle);
    lifecycle.start(loop_id, move |scheduler| {
        scheduler.request_frame(Box::new(move |now_ms| {
            let Some(lifecycle) = lifecycle_weak.upgrade() else {
                return;
            };
            lifecycle.release(loop_id);
            let Some(engine) = engine_weak.upgrade() else {
                return;
            };
            engine.borrow_mut().render_tick(now_ms);
            if let Err(err) = schedule_frame(&engine, &lifecycle, loop_id) {
                warn!("particle loop halted: {err}");
            }
        }))
    })
}
