use lumenrain_platform::{ColumnContainer, ColumnNode, Result};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement};

use crate::js_error;

const KEYFRAMES_ID: &str = "lumenrain-keyframes";
const KEYFRAMES_NAME: &str = "lumenrain-fall";
const KEYFRAMES_CSS: &str = "@keyframes lumenrain-fall { \
    from { transform: translateY(-100%); } \
    to { transform: translateY(100vh); } }";

/// Rain columns as absolutely positioned `<div>`s, scrolled by a CSS
/// animation. The container element itself is owned by the page.
pub struct DomColumnContainer {
    document: Document,
    element: HtmlElement,
}

impl DomColumnContainer {
    pub fn new(document: Document, element: HtmlElement) -> Self {
        ensure_keyframes(&document);
        Self { document, element }
    }
}

/// Installs the shared scroll keyframes once per document.
fn ensure_keyframes(document: &Document) {
    if document.get_element_by_id(KEYFRAMES_ID).is_some() {
        return;
    }
    let Some(head) = document.head() else {
        warn!("document has no <head>; rain keyframes not installed");
        return;
    };
    let style = match document.create_element("style") {
        Ok(style) => style,
        Err(err) => {
            warn!("failed to create keyframes style: {}", js_error(err));
            return;
        }
    };
    style.set_id(KEYFRAMES_ID);
    style.set_text_content(Some(KEYFRAMES_CSS));
    if let Err(err) = head.append_child(&style) {
        warn!("failed to install keyframes: {}", js_error(err));
    } else {
        debug!("rain keyframes installed");
    }
}

impl ColumnContainer for DomColumnContainer {
    fn width(&self) -> f32 {
        self.element.client_width() as f32
    }

    fn append_column(&mut self, column: &ColumnNode) -> Result<()> {
        let node = self
            .document
            .create_element("div")
            .map_err(js_error)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| "created element is not an HtmlElement")?;
        node.set_text_content(Some(&column.text));
        let style = node.style();
        let animation = format!(
            "{KEYFRAMES_NAME} {:.3}s linear {:.3}s infinite",
            column.scroll_duration.as_secs_f32(),
            column.start_delay.as_secs_f32()
        );
        for (property, value) in [
            ("position", "absolute".to_owned()),
            ("top", "0".to_owned()),
            ("left", format!("{}px", column.offset_px)),
            ("white-space", "pre".to_owned()),
            ("will-change", "transform".to_owned()),
            ("animation", animation),
        ] {
            style.set_property(property, &value).map_err(js_error)?;
        }
        self.element.append_child(&node).map_err(js_error)?;
        Ok(())
    }

    fn clear(&mut self) {
        while let Some(child) = self.element.first_child() {
            if self.element.remove_child(&child).is_err() {
                break;
            }
        }
    }

    fn child_count(&self) -> usize {
        self.element.child_element_count() as usize
    }

    fn set_opacity(&mut self, opacity: f32) {
        if let Err(err) = self
            .element
            .style()
            .set_property("opacity", &format!("{opacity:.2}"))
        {
            warn!("failed to set rain opacity: {}", js_error(err));
        }
    }
}
