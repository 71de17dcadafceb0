//! Handle bookkeeping for every scheduled callback of a mounted host.
//!
//! Each logical loop owns at most one live [`Handle`]. Starting a loop that is
//! already running cancels the old handle before the new one is stored, so a
//! loop is always either `Idle` or `Running` with exactly one handle.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use lumenrain_platform::{Handle, Scheduler};
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};

/// Names one logical loop. `slot` separates several instances of the same
/// kind of effect inside one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopId {
    pub label: &'static str,
    pub slot: u32,
}

impl LoopId {
    pub const RESIZE_DEBOUNCE: LoopId = LoopId::new("resize-debounce", 0);

    pub const fn new(label: &'static str, slot: u32) -> Self {
        Self { label, slot }
    }
}

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.label, self.slot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running(Handle),
}

pub struct LifecycleManager {
    scheduler: Rc<dyn Scheduler>,
    handles: RefCell<BTreeMap<LoopId, Handle>>,
}

impl LifecycleManager {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Rc<Self> {
        Rc::new(Self {
            scheduler,
            handles: RefCell::new(BTreeMap::new()),
        })
    }

    pub fn scheduler(&self) -> &Rc<dyn Scheduler> {
        &self.scheduler
    }

    /// Stops `loop_id` if it is running, then stores the handle produced by
    /// `schedule`.
    pub fn start<F>(&self, loop_id: LoopId, schedule: F) -> Result<Handle>
    where
        F: FnOnce(&dyn Scheduler) -> lumenrain_platform::Result<Handle>,
    {
        self.stop(loop_id);
        let handle = schedule(self.scheduler.as_ref()).map_err(|err| EngineError::Schedule {
            loop_id,
            reason: err.to_string(),
        })?;
        let previous = self.handles.borrow_mut().insert(loop_id, handle);
        if let Some(previous) = previous {
            self.scheduler.cancel(previous);
        }
        Ok(handle)
    }

    /// Cancels the handle of `loop_id`. Returns false when the loop was idle.
    pub fn stop(&self, loop_id: LoopId) -> bool {
        let handle = self.handles.borrow_mut().remove(&loop_id);
        match handle {
            Some(handle) => {
                self.scheduler.cancel(handle);
                debug!(%loop_id, %handle, "loop stopped");
                true
            }
            None => false,
        }
    }

    /// Cancels every tracked handle and returns how many there were.
    pub fn stop_all(&self) -> usize {
        let handles = std::mem::take(&mut *self.handles.borrow_mut());
        let count = handles.len();
        for handle in handles.into_values() {
            self.scheduler.cancel(handle);
        }
        if count > 0 {
            info!(count, "stopped all loops");
        }
        count
    }

    /// Forgets the handle of a callback that is firing right now. Nothing is
    /// cancelled.
    pub fn release(&self, loop_id: LoopId) {
        self.handles.borrow_mut().remove(&loop_id);
    }

    pub fn state(&self, loop_id: LoopId) -> LoopState {
        match self.handles.borrow().get(&loop_id) {
            Some(handle) => LoopState::Running(*handle),
            None => LoopState::Idle,
        }
    }

    pub fn is_running(&self, loop_id: LoopId) -> bool {
        matches!(self.state(loop_id), LoopState::Running(_))
    }

    pub fn live_handles(&self) -> usize {
        self.handles.borrow().len()
    }

    /// Wraps `action` so that bursts of [`Debounced::trigger`] calls closer
    /// together than `delay` run it once, `delay` after the last trigger.
    pub fn debounce(
        self: &Rc<Self>,
        loop_id: LoopId,
        delay: Duration,
        action: impl Fn() + 'static,
    ) -> Debounced {
        Debounced {
            lifecycle: Rc::downgrade(self),
            loop_id,
            delay,
            action: Rc::new(action),
        }
    }
}

impl Drop for LifecycleManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Trailing-edge debouncer whose pending timer is tracked like any other loop.
pub struct Debounced {
    lifecycle: Weak<LifecycleManager>,
    loop_id: LoopId,
    delay: Duration,
    action: Rc<dyn Fn()>,
}

impl Debounced {
    pub fn trigger(&self) {
        let Some(lifecycle) = self.lifecycle.upgrade() else {
            return;
        };
        let weak = self.lifecycle.clone();
        let action = self.action.clone();
        let loop_id = self.loop_id;
        let delay = self.delay;
        let result = lifecycle.start(loop_id, move |scheduler| {
            scheduler.set_timeout(
                delay,
                Box::new(move || {
                    if let Some(lifecycle) = weak.upgrade() {
                        lifecycle.release(loop_id);
                    }
                    action();
                }),
            )
        });
        if let Err(err) = result {
            warn!("debounce trigger dropped: {err}");
        }
    }

    pub fn cancel(&self) {
        if let Some(lifecycle) = self.lifecycle.upgrade() {
            lifecycle.stop(self.loop_id);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.lifecycle
            .upgrade()
            .map(|lifecycle| lifecycle.is_running(self.loop_id))
            .unwrap_or(false)
    }
}
