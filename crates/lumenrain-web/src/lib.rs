//! Browser implementations of the Lumenrain platform seams, plus the
//! `AmbientEffects` component exported to JavaScript.
//!
//! Everything here needs `web-sys`; on other targets the crate is empty and
//! the headless backend in `lumenrain-platform` stands in.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        mod columns;
        mod component;
        mod logging;
        mod scheduler;
        mod surface;
        mod viewport;

        pub use columns::DomColumnContainer;
        pub use component::AmbientEffects;
        pub use scheduler::WebScheduler;
        pub use surface::CanvasSurface;
        pub use viewport::WindowViewport;

        use wasm_bindgen::{JsCast, JsValue};

        /// Flattens a JS exception into the platform error type.
        pub(crate) fn js_error(value: JsValue) -> Box<dyn std::error::Error + Send + Sync> {
            if let Some(error) = value.dyn_ref::<js_sys::Error>() {
                return String::from(error.message()).into();
            }
            match value.as_string() {
                Some(message) => message.into(),
                None => format!("{value:?}").into(),
            }
        }
    }
}
