//! The mounted component that owns a set of effects.
//!
//! One host owns one [`LifecycleManager`], one [`CapabilityProbe`] and one
//! resize subscription. Mounting starts whatever the current quality tier
//! allows; unmounting releases every handle and the listener exactly once.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use lumenrain_platform::{ColumnContainer, DrawSurface, Scheduler, Subscription, Viewport};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::canvas::ParticleCanvasEngine;
use crate::capability::{CapabilityProbe, CapabilityState};
use crate::config::{EffectsConfig, ParticlePreset};
use crate::effect::{Effect, EffectEnv, ParticleGlowEffect, RainEffect};
use crate::error::{EngineError, Result};
use crate::lifecycle::{Debounced, LifecycleManager, LoopId};
use crate::rain::ColumnRainGenerator;

struct HostState {
    probe: CapabilityProbe,
    effects: Vec<Box<dyn Effect>>,
}

impl HostState {
    fn for_each_effect(
        &mut self,
        lifecycle: &Rc<LifecycleManager>,
        action: impl Fn(&mut dyn Effect, &EffectEnv<'_>) -> Result<()>,
    ) {
        let env = EffectEnv {
            lifecycle,
            capability: self.probe.state(),
        };
        for effect in &mut self.effects {
            if let Err(err) = action(effect.as_mut(), &env) {
                warn!(effect = effect.name(), "effect degraded: {err}");
            }
        }
    }
}

pub struct EffectHost {
    config: EffectsConfig,
    viewport: Rc<dyn Viewport>,
    lifecycle: Rc<LifecycleManager>,
    state: Rc<RefCell<HostState>>,
    resize: Option<Rc<Debounced>>,
    subscription: Option<Subscription>,
    seed: Option<u64>,
    next_slot: u32,
    mounted: bool,
}

impl EffectHost {
    pub fn new(
        config: EffectsConfig,
        scheduler: Rc<dyn Scheduler>,
        viewport: Rc<dyn Viewport>,
    ) -> Self {
        let probe = CapabilityProbe::new(config.capability.clone());
        Self {
            config,
            viewport,
            lifecycle: LifecycleManager::new(scheduler),
            state: Rc::new(RefCell::new(HostState {
                probe,
                effects: Vec::new(),
            })),
            resize: None,
            subscription: None,
            seed: None,
            next_slot: 0,
            mounted: false,
        }
    }

    /// Makes every effect added afterwards draw from a deterministic RNG.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &EffectsConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> &Rc<LifecycleManager> {
        &self.lifecycle
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn capability(&self) -> CapabilityState {
        self.state.borrow().probe.state()
    }

    pub fn active_effects(&self) -> Vec<String> {
        self.state
            .borrow()
            .effects
            .iter()
            .filter(|effect| effect.is_active())
            .map(|effect| effect.name().to_owned())
            .collect()
    }

    pub fn add_rain(&mut self, container: Box<dyn ColumnContainer>) {
        let generator = ColumnRainGenerator::new(self.config.rain.clone(), self.next_rng());
        self.add_effect(Box::new(RainEffect::new(generator, container)));
    }

    pub fn add_falling_logo(&mut self, surface: Option<Box<dyn DrawSurface>>) {
        let preset = self.config.falling_logo.clone();
        self.add_particle_glow(surface, preset);
    }

    pub fn add_orbit_logo(&mut self, surface: Option<Box<dyn DrawSurface>>) {
        let preset = self.config.orbit_logo.clone();
        self.add_particle_glow(surface, preset);
    }

    pub fn add_particle_glow(
        &mut self,
        surface: Option<Box<dyn DrawSurface>>,
        preset: ParticlePreset,
    ) {
        let engine = ParticleCanvasEngine::new(surface, preset, self.config.timing, self.next_rng());
        let loop_id = LoopId::new("particle-glow", self.next_slot);
        self.add_effect(Box::new(ParticleGlowEffect::new(engine, loop_id)));
    }

    /// Registers an effect; it starts right away when the host is mounted.
    pub fn add_effect(&mut self, mut effect: Box<dyn Effect>) {
        self.next_slot += 1;
        if self.mounted {
            let capability = self.capability();
            let env = EffectEnv {
                lifecycle: &self.lifecycle,
                capability,
            };
            if let Err(err) = effect.start(&env) {
                warn!(effect = effect.name(), "effect degraded: {err}");
            }
        }
        self.state.borrow_mut().effects.push(effect);
    }

    pub fn mount(&mut self) -> Result<()> {
        if self.mounted {
            return Ok(());
        }
        let capability = self.state.borrow_mut().probe.evaluate(self.viewport.as_ref());

        let resize = Rc::new(self.resize_debouncer());
        let listener = {
            let state = Rc::downgrade(&self.state);
            let viewport = Rc::downgrade(&self.viewport);
            let resize = Rc::downgrade(&resize);
            move || {
                let (Some(state), Some(viewport), Some(resize)) =
                    (state.upgrade(), viewport.upgrade(), resize.upgrade())
                else {
                    return;
                };
                state.borrow_mut().probe.evaluate(viewport.as_ref());
                resize.trigger();
            }
        };
        let subscription = self
            .viewport
            .subscribe_resize(Box::new(listener))
            .map_err(|err| EngineError::Viewport(err.to_string()))?;
        self.subscription = Some(subscription);
        self.resize = Some(resize);

        self.state
            .borrow_mut()
            .for_each_effect(&self.lifecycle, |effect, env| effect.start(env));
        self.mounted = true;
        info!(
            tier = ?capability.tier(),
            effects = ?self.active_effects(),
            "effects mounted"
        );
        Ok(())
    }

    /// Removes the resize listener and releases every handle. Safe to call
    /// more than once.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        if let Some(subscription) = self.subscription.take() {
            self.viewport.unsubscribe(subscription);
        }
        self.resize = None;
        let released = self.lifecycle.stop_all();
        let mut state = self.state.borrow_mut();
        for effect in &mut state.effects {
            effect.stop(&self.lifecycle);
        }
        self.mounted = false;
        info!(released, "effects unmounted");
    }

    fn resize_debouncer(&self) -> Debounced {
        let state = Rc::downgrade(&self.state);
        let lifecycle: Weak<LifecycleManager> = Rc::downgrade(&self.lifecycle);
        self.lifecycle.debounce(
            LoopId::RESIZE_DEBOUNCE,
            self.config.resize_debounce(),
            move || {
                let (Some(state), Some(lifecycle)) = (state.upgrade(), lifecycle.upgrade()) else {
                    return;
                };
                debug!("regenerating effects after resize");
                state
                    .borrow_mut()
                    .for_each_effect(&lifecycle, |effect, env| effect.regenerate(env));
            },
        )
    }

    fn next_rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(u64::from(self.next_slot))),
            None => SmallRng::from_entropy(),
        }
    }
}

impl Drop for EffectHost {
    fn drop(&mut self) {
        self.unmount();
    }
}
