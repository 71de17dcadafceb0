//! The common start/stop contract shared by the rain and the particle glows.
//!
//! The two effects animate in different ways. Rain hands its columns to the
//! environment's animation timeline and owns no handle. A particle glow
//! redraws every frame through a handle tracked by the [`LifecycleManager`].

use std::cell::RefCell;
use std::rc::Rc;

use lumenrain_platform::ColumnContainer;
use tracing::{debug, info};

use crate::canvas::{schedule_frame, ParticleCanvasEngine};
use crate::capability::{CapabilityState, QualityTier};
use crate::error::Result;
use crate::lifecycle::{LifecycleManager, LoopId};
use crate::rain::ColumnRainGenerator;

pub struct EffectEnv<'a> {
    pub lifecycle: &'a Rc<LifecycleManager>,
    pub capability: CapabilityState,
}

pub trait Effect {
    fn name(&self) -> &str;
    fn is_active(&self) -> bool;
    fn start(&mut self, env: &EffectEnv<'_>) -> Result<()>;
    /// Rebuilds size-dependent state after a (debounced) resize. May start or
    /// stop the effect when the quality tier changed.
    fn regenerate(&mut self, env: &EffectEnv<'_>) -> Result<()>;
    fn stop(&mut self, lifecycle: &LifecycleManager);
}

pub struct RainEffect {
    generator: ColumnRainGenerator,
    container: Box<dyn ColumnContainer>,
    active: bool,
}

impl RainEffect {
    pub fn new(generator: ColumnRainGenerator, container: Box<dyn ColumnContainer>) -> Self {
        Self {
            generator,
            container,
            active: false,
        }
    }

    fn fill(&mut self, capability: CapabilityState) -> Result<()> {
        let config = self.generator.config();
        let opacity = match capability.tier() {
            QualityTier::Full => config.opacity,
            QualityTier::Reduced => config.reduced_opacity,
        };
        self.container.set_opacity(opacity);
        let width = self.container.width();
        self.generator.regenerate(self.container.as_mut(), width)?;
        Ok(())
    }
}

impl Effect for RainEffect {
    fn name(&self) -> &str {
        "rain"
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn start(&mut self, env: &EffectEnv<'_>) -> Result<()> {
        self.active = true;
        self.fill(env.capability)?;
        info!(columns = self.container.child_count(), "rain started");
        Ok(())
    }

    fn regenerate(&mut self, env: &EffectEnv<'_>) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.fill(env.capability)
    }

    fn stop(&mut self, _lifecycle: &LifecycleManager) {
        if self.active {
            ColumnRainGenerator::clear(self.container.as_mut());
            self.active = false;
        }
    }
}

pub struct ParticleGlowEffect {
    name: String,
    engine: Rc<RefCell<ParticleCanvasEngine>>,
    loop_id: LoopId,
    active: bool,
}

impl ParticleGlowEffect {
    pub fn new(engine: ParticleCanvasEngine, loop_id: LoopId) -> Self {
        Self {
            name: engine.name().to_owned(),
            engine: Rc::new(RefCell::new(engine)),
            loop_id,
            active: false,
        }
    }

    pub fn loop_id(&self) -> LoopId {
        self.loop_id
    }

    pub fn engine(&self) -> &Rc<RefCell<ParticleCanvasEngine>> {
        &self.engine
    }
}

impl Effect for ParticleGlowEffect {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn start(&mut self, env: &EffectEnv<'_>) -> Result<()> {
        if env.capability.is_constrained_device {
            debug!(loop_id = %self.loop_id, "constrained device; particle glow not started");
            return Ok(());
        }
        {
            let mut engine = self.engine.borrow_mut();
            if !engine.is_renderable() {
                return Ok(());
            }
            engine.fit_to_client();
            engine.init();
        }
        schedule_frame(&self.engine, env.lifecycle, self.loop_id)?;
        self.active = true;
        info!(loop_id = %self.loop_id, preset = %self.name, "particle glow started");
        Ok(())
    }

    fn regenerate(&mut self, env: &EffectEnv<'_>) -> Result<()> {
        match (env.capability.is_constrained_device, self.active) {
            (true, true) => {
                self.stop(env.lifecycle);
                Ok(())
            }
            (true, false) => Ok(()),
            (false, true) => {
                self.engine.borrow_mut().fit_to_client();
                Ok(())
            }
            (false, false) => self.start(env),
        }
    }

    fn stop(&mut self, lifecycle: &LifecycleManager) {
        lifecycle.stop(self.loop_id);
        if self.active {
            debug!(loop_id = %self.loop_id, "particle glow stopped");
        }
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ParticlePreset, RainConfig, TickTiming};
    use glam::Vec2;
    use lumenrain_platform::headless::{HeadlessScheduler, MemoryContainer, RecordingSurface};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn env(lifecycle: &Rc<LifecycleManager>, constrained: bool) -> EffectEnv<'_> {
        EffectEnv {
            lifecycle,
            capability: CapabilityState {
                is_constrained_device: constrained,
            },
        }
    }

    fn glow(surface: Option<RecordingSurface>) -> ParticleGlowEffect {
        let engine = ParticleCanvasEngine::new(
            surface.map(|s| Box::new(s) as Box<dyn lumenrain_platform::DrawSurface>),
            ParticlePreset::orbit_logo(),
            TickTiming::PerFrame,
            SmallRng::seed_from_u64(3),
        );
        ParticleGlowEffect::new(engine, LoopId::new("glow", 1))
    }

    #[test]
    fn rain_uses_reduced_opacity_on_constrained_devices() {
        let scheduler = Rc::new(HeadlessScheduler::new());
        let lifecycle = LifecycleManager::new(scheduler);
        let container = MemoryContainer::new(400.0);
        let config = RainConfig::default();
        let mut rain = RainEffect::new(
            ColumnRainGenerator::new(config.clone(), SmallRng::seed_from_u64(1)),
            Box::new(container.clone()),
        );
        rain.start(&env(&lifecycle, true)).unwrap();
        assert_eq!(container.opacity(), config.reduced_opacity);
        assert_eq!(container.child_count(), 20);

        container.set_width(800.0);
        rain.regenerate(&env(&lifecycle, false)).unwrap();
        assert_eq!(container.opacity(), config.opacity);
        assert_eq!(container.child_count(), 40);

        rain.stop(&lifecycle);
        assert_eq!(container.child_count(), 0);
        assert_eq!(lifecycle.live_handles(), 0);
    }

    #[test]
    fn glow_is_not_started_on_constrained_devices() {
        let scheduler = Rc::new(HeadlessScheduler::new());
        let lifecycle = LifecycleManager::new(scheduler.clone());
        let mut effect = glow(Some(RecordingSurface::new(Vec2::new(200.0, 200.0))));
        effect.start(&env(&lifecycle, true)).unwrap();
        assert!(!effect.is_active());
        assert_eq!(scheduler.request_count(), 0);
        assert_eq!(effect.engine().borrow().particles().len(), 0);
    }

    #[test]
    fn glow_follows_tier_changes_on_regenerate() {
        let scheduler = Rc::new(HeadlessScheduler::new());
        let lifecycle = LifecycleManager::new(scheduler.clone());
        let mut effect = glow(Some(RecordingSurface::new(Vec2::new(200.0, 200.0))));
        effect.start(&env(&lifecycle, false)).unwrap();
        assert!(effect.is_active());
        assert_eq!(scheduler.pending_frames(), 1);

        effect.regenerate(&env(&lifecycle, true)).unwrap();
        assert!(!effect.is_active());
        assert_eq!(scheduler.pending_frames(), 0);

        effect.regenerate(&env(&lifecycle, false)).unwrap();
        assert!(effect.is_active());
        assert_eq!(lifecycle.live_handles(), 1);
    }

    #[test]
    fn glow_without_context_stays_idle() {
        let scheduler = Rc::new(HeadlessScheduler::new());
        let lifecycle = LifecycleManager::new(scheduler.clone());
        let mut effect = glow(None);
        effect.start(&env(&lifecycle, false)).unwrap();
        assert!(!effect.is_active());
        assert_eq!(scheduler.live_handles(), 0);
    }
}
