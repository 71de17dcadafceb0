use std::rc::Rc;

use lumenrain_core::{EffectHost, EffectsConfig};
use lumenrain_platform::DrawSurface;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlCanvasElement, HtmlElement};

use crate::columns::DomColumnContainer;
use crate::logging;
use crate::scheduler::WebScheduler;
use crate::surface::CanvasSurface;
use crate::viewport::WindowViewport;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    logging::init();
}

/// Ambient background effects for one page region.
///
/// Attach the rain container and logo canvases, then `mount()`. Call
/// `unmount()` (or `free()`) when the region goes away.
#[wasm_bindgen]
pub struct AmbientEffects {
    document: Document,
    host: EffectHost,
}

#[wasm_bindgen]
impl AmbientEffects {
    /// `config_json` overrides the defaults; see `EffectsConfig` for fields.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<AmbientEffects, JsError> {
        let window = web_sys::window().ok_or_else(|| JsError::new("no global window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsError::new("window has no document"))?;
        let config = match config_json {
            Some(source) => EffectsConfig::from_json_str(&source)
                .map_err(|err| JsError::new(&err.to_string()))?,
            None => EffectsConfig::default(),
        };
        let scheduler = Rc::new(WebScheduler::new(window.clone()));
        let viewport = Rc::new(WindowViewport::new(window));
        Ok(Self {
            document,
            host: EffectHost::new(config, scheduler, viewport),
        })
    }

    #[wasm_bindgen(js_name = attachRain)]
    pub fn attach_rain(&mut self, container: HtmlElement) {
        let columns = DomColumnContainer::new(self.document.clone(), container);
        self.host.add_rain(Box::new(columns));
    }

    #[wasm_bindgen(js_name = attachFallingLogo)]
    pub fn attach_falling_logo(&mut self, canvas: HtmlCanvasElement) {
        let surface = acquire_surface(canvas, "falling logo");
        self.host.add_falling_logo(surface);
    }

    #[wasm_bindgen(js_name = attachOrbitLogo)]
    pub fn attach_orbit_logo(&mut self, canvas: HtmlCanvasElement) {
        let surface = acquire_surface(canvas, "orbit logo");
        self.host.add_orbit_logo(surface);
    }

    pub fn mount(&mut self) -> Result<(), JsError> {
        self.host
            .mount()
            .map_err(|err| JsError::new(&err.to_string()))
    }

    pub fn unmount(&mut self) {
        self.host.unmount();
    }

    #[wasm_bindgen(js_name = isConstrained)]
    pub fn is_constrained(&self) -> bool {
        self.host.capability().is_constrained_device
    }

    #[wasm_bindgen(js_name = activeEffects)]
    pub fn active_effects(&self) -> Vec<String> {
        self.host.active_effects()
    }
}

fn acquire_surface(canvas: HtmlCanvasElement, label: &str) -> Option<Box<dyn DrawSurface>> {
    match CanvasSurface::acquire(canvas) {
        Some(surface) => {
            info!("{label}: 2d context acquired");
            Some(Box::new(surface))
        }
        None => {
            warn!("{label}: no 2d context, effect stays idle");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn element(tag: &str) -> web_sys::Element {
        let document = web_sys::window().unwrap().document().unwrap();
        let element = document.create_element(tag).unwrap();
        document.body().unwrap().append_child(&element).unwrap();
        element
    }

    #[wasm_bindgen_test]
    fn mount_and_unmount_in_a_browser() {
        let rain = element("div").dyn_into::<HtmlElement>().unwrap();
        rain.style().set_property("width", "400px").unwrap();
        let canvas = element("canvas").dyn_into::<HtmlCanvasElement>().unwrap();

        let mut effects = AmbientEffects::new(None).unwrap();
        effects.attach_rain(rain.clone());
        effects.attach_orbit_logo(canvas);
        effects.mount().unwrap();
        assert_eq!(rain.child_element_count(), 20);

        effects.unmount();
        effects.unmount();
        assert!(effects.active_effects().is_empty());
    }

    #[wasm_bindgen_test]
    fn console_logging_installs_once_and_tolerates_reinit() {
        logging::init();
        logging::init();
        tracing::info!("console logging ready");
        tracing::warn!(effect = "rain", "warn reaches console.warn");
    }

    #[wasm_bindgen_test]
    fn invalid_config_is_rejected() {
        assert!(AmbientEffects::new(Some("{ not json".into())).is_err());
        let overflowing = r#"{"rain":{"scroll_duration_s":1e300}}"#;
        assert!(AmbientEffects::new(Some(overflowing.into())).is_err());
    }
}
