// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! 2D canvas rasterizer.
//!
//! Plays a [`Frame`] display list onto a `<canvas>` 2D context.

use core::f64::consts::TAU;

use nowpip_core::render::{DrawOp, Font, Frame, Presenter, placeholder_ops};
use wasm_bindgen::{JsCast as _, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

/// Draws frames onto a canvas.
pub struct CanvasPresenter {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    /// Font most recently set on the context.
    font: Option<Font>,
}

impl core::fmt::Debug for CanvasPresenter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CanvasPresenter")
            .field("width", &self.canvas.width())
            .field("height", &self.canvas.height())
            .finish_non_exhaustive()
    }
}

impl CanvasPresenter {
    /// Wraps `canvas`, fetching its 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self {
            canvas,
            ctx,
            font: None,
        })
    }

    fn use_font(&mut self, font: Font) {
        if self.font != Some(font) {
            self.ctx.set_font(&font.to_css());
            self.font = Some(font);
        }
    }

    fn draw(&mut self, op: &DrawOp<'_, HtmlImageElement>) {
        match op {
            DrawOp::FillRect { rect, color } => {
                self.ctx.set_fill_style_str(&color.to_css());
                self.ctx
                    .fill_rect(rect.x0, rect.y0, rect.width(), rect.height());
            }
            DrawOp::Image { image, rect } => {
                // A broken or tainted image throws; fall back to the placeholder.
                if self
                    .ctx
                    .draw_image_with_html_image_element_and_dw_and_dh(
                        image,
                        rect.x0,
                        rect.y0,
                        rect.width(),
                        rect.height(),
                    )
                    .is_err()
                {
                    for op in placeholder_ops::<HtmlImageElement>(*rect) {
                        self.draw(&op);
                    }
                }
            }
            DrawOp::Text {
                text,
                origin,
                font,
                color,
            } => {
                self.use_font(*font);
                self.ctx.set_fill_style_str(&color.to_css());
                // Throws only for a non-finite max width, which is never passed.
                let _ = self.ctx.fill_text(text, origin.x, origin.y);
            }
            DrawOp::FillCircle { circle, color } => {
                self.ctx.set_fill_style_str(&color.to_css());
                self.ctx.begin_path();
                // Throws only for a negative radius; layout radii are positive.
                let _ = self
                    .ctx
                    .arc(circle.center.x, circle.center.y, circle.radius, 0.0, TAU);
                self.ctx.fill();
            }
            DrawOp::FillTriangle { points, color } => {
                self.ctx.set_fill_style_str(&color.to_css());
                self.ctx.begin_path();
                self.ctx.move_to(points[0].x, points[0].y);
                self.ctx.line_to(points[1].x, points[1].y);
                self.ctx.line_to(points[2].x, points[2].y);
                self.ctx.close_path();
                self.ctx.fill();
            }
        }
    }
}

impl Presenter<HtmlImageElement> for CanvasPresenter {
    fn text_width(&mut self, text: &str, font: Font) -> f64 {
        self.use_font(font);
        self.ctx.measure_text(text).map_or(0.0, |m| m.width())
    }

    fn present(&mut self, frame: &Frame<'_, HtmlImageElement>) {
        self.ctx.clear_rect(
            0.0,
            0.0,
            f64::from(self.canvas.width()),
            f64::from(self.canvas.height()),
        );
        for op in &frame.ops {
            self.draw(op);
        }
    }
}
