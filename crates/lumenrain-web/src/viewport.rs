use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use lumenrain_platform::{Result, Subscription, Viewport, ViewportSize};
use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::Window;

use crate::js_error;

/// `window` as a viewport. Listeners registered here are removed on
/// `unsubscribe` or when the viewport is dropped.
pub struct WindowViewport {
    window: Window,
    next_id: Cell<u64>,
    listeners: RefCell<HashMap<u64, Closure<dyn FnMut()>>>,
}

impl WindowViewport {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            next_id: Cell::new(0),
            listeners: RefCell::new(HashMap::new()),
        }
    }

    fn detach(&self, closure: &Closure<dyn FnMut()>) {
        if let Err(err) = self
            .window
            .remove_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
        {
            warn!("failed to remove resize listener: {}", js_error(err));
        }
    }
}

impl Viewport for WindowViewport {
    fn size(&self) -> ViewportSize {
        let read = |value: std::result::Result<wasm_bindgen::JsValue, wasm_bindgen::JsValue>| {
            value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0) as f32
        };
        ViewportSize::new(
            read(self.window.inner_width()),
            read(self.window.inner_height()),
        )
    }

    fn user_agent(&self) -> Option<String> {
        self.window.navigator().user_agent().ok()
    }

    fn subscribe_resize(&self, listener: Box<dyn FnMut()>) -> Result<Subscription> {
        let closure = Closure::wrap(listener);
        self.window
            .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
            .map_err(js_error)?;
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.listeners.borrow_mut().insert(id, closure);
        Ok(Subscription(id))
    }

    fn unsubscribe(&self, subscription: Subscription) {
        let closure = self.listeners.borrow_mut().remove(&subscription.0);
        if let Some(closure) = closure {
            self.detach(&closure);
        }
    }
}

impl Drop for WindowViewport {
    fn drop(&mut self) {
        let listeners: Vec<_> = self.listeners.borrow_mut().drain().collect();
        for (_, closure) in listeners {
            self.detach(&closure);
        }
    }
}
