//! Lumenrain core engine: platform-agnostic logic for rain columns, particle
//! glows, capability gating, and the lifecycle of every scheduled callback.

pub mod canvas;
pub mod capability;
pub mod config;
pub mod effect;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod particles;
pub mod rain;

pub use canvas::{schedule_frame, Geometry, ParticleCanvasEngine, LOGO_PATH};
pub use capability::{evaluate, CapabilityProbe, CapabilityState, QualityTier};
pub use config::{
    CapabilityConfig, EffectsConfig, MotionMode, Overlay, ParticlePreset, RainConfig, TickTiming,
};
pub use effect::{Effect, EffectEnv, ParticleGlowEffect, RainEffect};
pub use error::{EngineError, Result};
pub use host::EffectHost;
pub use lifecycle::{Debounced, LifecycleManager, LoopId, LoopState};
pub use particles::{Particle, ParticleSet};
pub use rain::{Column, ColumnRainGenerator, RAIN_GLYPHS};
