use glam::{Vec2, Vec4};
use lumenrain_platform::{DrawSurface, GlowStroke, PathCommand};
use tracing::warn;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::js_error;

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// `None` when the canvas has no 2D context to give, e.g. because it
    /// already holds a WebGL one.
    pub fn acquire(canvas: HtmlCanvasElement) -> Option<Self> {
        let context = match canvas.get_context("2d") {
            Ok(Some(context)) => context,
            Ok(None) => return None,
            Err(err) => {
                warn!("getContext(\"2d\") threw: {}", js_error(err));
                return None;
            }
        };
        let context = context.dyn_into::<CanvasRenderingContext2d>().ok()?;
        Some(Self { canvas, context })
    }
}

fn css_rgba(color: Vec4) -> String {
    let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "rgba({}, {}, {}, {:.3})",
        to_byte(color.x),
        to_byte(color.y),
        to_byte(color.z),
        color.w.clamp(0.0, 1.0)
    )
}

impl DrawSurface for CanvasSurface {
    fn client_size(&self) -> Vec2 {
        Vec2::new(
            self.canvas.client_width() as f32,
            self.canvas.client_height() as f32,
        )
    }

    fn backing_size(&self) -> Vec2 {
        Vec2::new(self.canvas.width() as f32, self.canvas.height() as f32)
    }

    fn set_backing_size(&mut self, size: Vec2) {
        self.canvas.set_width(size.x as u32);
        self.canvas.set_height(size.y as u32);
    }

    fn clear(&mut self) {
        let size = self.backing_size();
        self.context.clear_rect(0.0, 0.0, size.x as f64, size.y as f64);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Vec4) {
        let ctx = &self.context;
        ctx.begin_path();
        if ctx
            .arc(
                center.x as f64,
                center.y as f64,
                radius as f64,
                0.0,
                std::f64::consts::TAU,
            )
            .is_err()
        {
            return;
        }
        ctx.set_fill_style_str(&css_rgba(color));
        ctx.fill();
    }

    fn fill_text(&mut self, text: &str, center: Vec2, font_px: f32, fill: Vec4, glow: &GlowStroke) {
        let ctx = &self.context;
        ctx.save();
        ctx.set_font(&format!("{font_px:.0}px sans-serif"));
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        ctx.set_shadow_color(&css_rgba(glow.color));
        ctx.set_shadow_blur(glow.blur as f64);
        ctx.set_fill_style_str(&css_rgba(fill));
        let _ = ctx.fill_text(text, center.x as f64, center.y as f64);
        ctx.set_line_width(glow.line_width as f64);
        ctx.set_stroke_style_str(&css_rgba(glow.color));
        let _ = ctx.stroke_text(text, center.x as f64, center.y as f64);
        ctx.restore();
    }

    fn stroke_path(&mut self, path: &[PathCommand], glow: &GlowStroke) {
        let ctx = &self.context;
        ctx.save();
        ctx.begin_path();
        for command in path {
            match *command {
                PathCommand::MoveTo(p) => ctx.move_to(p.x as f64, p.y as f64),
                PathCommand::LineTo(p) => ctx.line_to(p.x as f64, p.y as f64),
                PathCommand::QuadTo { ctrl, to } => {
                    ctx.quadratic_curve_to(ctrl.x as f64, ctrl.y as f64, to.x as f64, to.y as f64)
                }
                PathCommand::Close => ctx.close_path(),
            }
        }
        ctx.set_shadow_color(&css_rgba(glow.color));
        ctx.set_shadow_blur(glow.blur as f64);
        ctx.set_line_width(glow.line_width as f64);
        ctx.set_stroke_style_str(&css_rgba(glow.color));
        ctx.stroke();
        ctx.restore();
    }
}
