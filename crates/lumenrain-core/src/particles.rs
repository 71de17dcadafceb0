//! Particle model and the two motion rules.

use std::f32::consts::TAU;
use std::ops::Range;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const SPEED_RANGE: Range<f32> = 0.5..2.0;
pub const SIZE_RANGE: Range<f32> = 1.0..3.0;
pub const BRIGHTNESS_RANGE: Range<f32> = 0.3..1.0;

/// Radians per tick.
pub const ORBIT_ANGULAR_STEP: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    /// Pixels per tick.
    pub speed: f32,
    pub radius: f32,
    /// Alpha in `0..=1`.
    pub brightness: f32,
}

impl Particle {
    pub fn random(bounds: Vec2, rng: &mut impl Rng) -> Self {
        Self {
            pos: Vec2::new(sample(rng, bounds.x), sample(rng, bounds.y)),
            speed: rng.gen_range(SPEED_RANGE),
            radius: rng.gen_range(SIZE_RANGE),
            brightness: rng.gen_range(BRIGHTNESS_RANGE),
        }
    }
}

/// Uniform in `0..upper`, or 0 when the range is empty.
fn sample(rng: &mut impl Rng, upper: f32) -> f32 {
    if upper > 0.0 {
        rng.gen_range(0.0..upper)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleSet {
    pub particles: Vec<Particle>,
    /// Shared orbit angle, kept in `0..TAU`.
    pub phase: f32,
}

impl ParticleSet {
    pub fn init(bounds: Vec2, count: usize, rng: &mut impl Rng) -> Self {
        Self {
            particles: (0..count).map(|_| Particle::random(bounds, rng)).collect(),
            phase: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Moves every particle down by `speed * steps`. A particle past the
    /// bottom edge restarts at the top with a fresh x.
    pub fn advance_falling(&mut self, bounds: Vec2, steps: f32, rng: &mut impl Rng) {
        for particle in &mut self.particles {
            particle.pos.y += particle.speed * steps;
            if particle.pos.y > bounds.y {
                particle.pos.y = 0.0;
                particle.pos.x = sample(rng, bounds.x);
            }
        }
    }

    pub fn advance_orbit(&mut self, center: Vec2, radius: f32, angular_step: f32, steps: f32) {
        self.phase = (self.phase + angular_step * steps).rem_euclid(TAU);
        let count = self.particles.len();
        for index in 0..count {
            let angle = self.orbit_angle(index);
            self.particles[index].pos = center + radius * Vec2::new(angle.cos(), angle.sin());
        }
    }

    /// Angle of orbit particle `index`: the shared phase plus an even share of
    /// the circle.
    pub fn orbit_angle(&self, index: usize) -> f32 {
        let count = self.particles.len().max(1) as f32;
        (self.phase + TAU * index as f32 / count).rem_euclid(TAU)
    }

    /// Re-seeds particles that fall outside `bounds`, e.g. after a shrink.
    pub fn reseed_outside(&mut self, bounds: Vec2, rng: &mut impl Rng) -> usize {
        let mut reseeded = 0;
        for particle in &mut self.particles {
            let inside = particle.pos.x >= 0.0
                && particle.pos.x < bounds.x
                && particle.pos.y >= 0.0
                && particle.pos.y <= bounds.y;
            if !inside {
                particle.pos = Vec2::new(sample(rng, bounds.x), sample(rng, bounds.y));
                reseeded += 1;
            }
        }
        reseeded
    }
}
