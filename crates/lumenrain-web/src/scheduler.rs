use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use lumenrain_platform::{FrameCallback, Handle, HandleKind, Result, Scheduler, TimerCallback};
use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::Window;

use crate::js_error;

enum JsCallback {
    Frame(Closure<dyn FnMut(f64)>),
    Timer(Closure<dyn FnMut()>),
}

struct Pending {
    js_id: i32,
    callback: JsCallback,
}

#[derive(Default)]
struct SchedulerState {
    next_id: u64,
    pending: HashMap<u64, Pending>,
    /// Closures whose callback already ran. A closure cannot be dropped while
    /// it is executing, so each one is kept until the next callback fires.
    retired: Vec<JsCallback>,
}

/// `requestAnimationFrame` / `setTimeout` scheduler. Every JS closure is owned
/// here until it fires or is cancelled, so nothing is leaked with `forget`.
pub struct WebScheduler {
    window: Window,
    state: Rc<RefCell<SchedulerState>>,
}

impl WebScheduler {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            state: Rc::new(RefCell::new(SchedulerState::default())),
        }
    }

    fn allocate_id(&self) -> u64 {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        state.next_id
    }

    fn retire(state: &Weak<RefCell<SchedulerState>>, id: u64) {
        let Some(state) = state.upgrade() else {
            return;
        };
        let mut state = state.borrow_mut();
        state.retired.clear();
        if let Some(pending) = state.pending.remove(&id) {
            state.retired.push(pending.callback);
        }
    }

    fn cancel_js(&self, js_id: i32, kind: HandleKind) {
        match kind {
            HandleKind::Frame => {
                if let Err(err) = self.window.cancel_animation_frame(js_id) {
                    warn!("cancelAnimationFrame failed: {}", js_error(err));
                }
            }
            HandleKind::Timer => self.window.clear_timeout_with_handle(js_id),
        }
    }
}

impl Scheduler for WebScheduler {
    fn request_frame(&self, callback: FrameCallback) -> Result<Handle> {
        let id = self.allocate_id();
        let state = Rc::downgrade(&self.state);
        let mut callback = Some(callback);
        let closure = Closure::wrap(Box::new(move |timestamp: f64| {
            Self::retire(&state, id);
            if let Some(callback) = callback.take() {
                callback(timestamp);
            }
        }) as Box<dyn FnMut(f64)>);
        let js_id = self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .map_err(js_error)?;
        self.state.borrow_mut().pending.insert(
            id,
            Pending {
                js_id,
                callback: JsCallback::Frame(closure),
            },
        );
        Ok(Handle {
            kind: HandleKind::Frame,
            id,
        })
    }

    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> Result<Handle> {
        let id = self.allocate_id();
        let state = Rc::downgrade(&self.state);
        let mut callback = Some(callback);
        let closure = Closure::wrap(Box::new(move || {
            Self::retire(&state, id);
            if let Some(callback) = callback.take() {
                callback();
            }
        }) as Box<dyn FnMut()>);
        let delay_ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        let js_id = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                delay_ms,
            )
            .map_err(js_error)?;
        self.state.borrow_mut().pending.insert(
            id,
            Pending {
                js_id,
                callback: JsCallback::Timer(closure),
            },
        );
        Ok(Handle {
            kind: HandleKind::Timer,
            id,
        })
    }

    fn cancel(&self, handle: Handle) {
        let pending = self.state.borrow_mut().pending.remove(&handle.id);
        if let Some(pending) = pending {
            self.cancel_js(pending.js_id, handle.kind);
        }
    }

    fn now_ms(&self) -> f64 {
        self.window
            .performance()
            .map(|performance| performance.now())
            .unwrap_or(0.0)
    }
}

impl Drop for WebScheduler {
    fn drop(&mut self) {
        let pending: Vec<(u64, Pending)> = self.state.borrow_mut().pending.drain().collect();
        for (_, pending) in pending {
            let kind = match pending.callback {
                JsCallback::Frame(_) => HandleKind::Frame,
                JsCallback::Timer(_) => HandleKind::Timer,
            };
            self.cancel_js(pending.js_id, kind);
        }
    }
}
