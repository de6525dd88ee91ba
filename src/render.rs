//! 2D drawing seam for overlay effects
//!
//! Effects describe what to draw as [`Shape`]s; the browser shell maps them
//! onto a `CanvasRenderingContext2d`, tests record them.

use glam::Vec2;

/// Straight-alpha 8-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Opaque color from `0xRRGGBB`
    pub const fn hex(rgb: u32) -> Self {
        Self::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Same color with alpha scaled by `opacity`
    pub fn with_opacity(self, opacity: f32) -> Self {
        let a = (self.a as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    pub fn lerp(self, other: Rgba, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }

    /// CSS `rgba()` string
    pub fn to_css(self) -> String {
        format!(
            "rgba({},{},{},{:.3})",
            self.r,
            self.g,
            self.b,
            self.a as f32 / 255.0
        )
    }
}

/// Primitive an effect can ask for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Rectangle centered on `center`, rotated by `rotation` radians
    Rect {
        center: Vec2,
        size: Vec2,
        rotation: f32,
    },
    Disc {
        center: Vec2,
        radius: f32,
    },
    /// Teardrop with its point up; `size` is the half-height
    Drop {
        center: Vec2,
        size: f32,
    },
    /// Full-surface vertical gradient
    Backdrop {
        top: Rgba,
        bottom: Rgba,
    },
}

/// Drawing target for overlay effects
pub trait Canvas2d {
    /// Pixel size of the drawing buffer
    fn size(&self) -> Vec2;

    /// Make every pixel transparent
    fn clear(&mut self);

    /// Fill `shape` with `color` (alpha already applied)
    fn fill(&mut self, shape: &Shape, color: Rgba);
}

/// Canvas that remembers what was drawn
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    pub size: Vec2,
    /// Shapes drawn since the last clear
    pub shapes: Vec<(Shape, Rgba)>,
    pub clears: u32,
}

impl RecordingCanvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
            ..Default::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.shapes.is_empty()
    }
}

impl Canvas2d for RecordingCanvas {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn clear(&mut self) {
        self.shapes.clear();
        self.clears += 1;
    }

    fn fill(&mut self, shape: &Shape, color: Rgba) {
        self.shapes.push((*shape, color));
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebCanvas;

#[cfg(target_arch = "wasm32")]
mod web {
    use super::{Canvas2d, Rgba, Shape};
    use glam::Vec2;
    use std::f64::consts::TAU;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

    /// `Canvas2d` over a browser 2D context
    pub struct WebCanvas {
        canvas: HtmlCanvasElement,
        ctx: CanvasRenderingContext2d,
    }

    impl WebCanvas {
        pub fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d) -> Self {
            Self { canvas, ctx }
        }

        fn fill_drop(&self, center: Vec2, size: f32, color: Rgba) {
            let (x, y, s) = (center.x as f64, center.y as f64, size as f64);
            let ctx = &self.ctx;

            ctx.begin_path();
            ctx.move_to(x, y - s);
            ctx.bezier_curve_to(x + s * 0.6, y - s * 0.3, x + s * 0.8, y + s * 0.4, x, y + s);
            ctx.bezier_curve_to(x - s * 0.8, y + s * 0.4, x - s * 0.6, y - s * 0.3, x, y - s);
            ctx.close_path();
            ctx.set_fill_style_str(&color.to_css());
            ctx.fill();

            // Highlight
            let alpha = color.a as f32 / 255.0;
            ctx.begin_path();
            ctx.ellipse(x - s * 0.25, y - s * 0.3, s * 0.15, s * 0.25, -0.5, 0.0, TAU)
                .ok();
            ctx.set_fill_style_str(&Rgba::WHITE.with_opacity(0.6 * alpha).to_css());
            ctx.fill();
        }
    }

    impl Canvas2d for WebCanvas {
        fn size(&self) -> Vec2 {
            Vec2::new(self.canvas.width() as f32, self.canvas.height() as f32)
        }

        fn clear(&mut self) {
            let size = self.size();
            self.ctx.clear_rect(0.0, 0.0, size.x as f64, size.y as f64);
        }

        fn fill(&mut self, shape: &Shape, color: Rgba) {
            let ctx = &self.ctx;
            match *shape {
                Shape::Rect {
                    center,
                    size,
                    rotation,
                } => {
                    ctx.save();
                    ctx.translate(center.x as f64, center.y as f64).ok();
                    ctx.rotate(rotation as f64).ok();
                    ctx.set_fill_style_str(&color.to_css());
                    ctx.fill_rect(
                        -size.x as f64 / 2.0,
                        -size.y as f64 / 2.0,
                        size.x as f64,
                        size.y as f64,
                    );
                    ctx.restore();
                }
                Shape::Disc { center, radius } => {
                    ctx.begin_path();
                    ctx.arc(center.x as f64, center.y as f64, radius as f64, 0.0, TAU)
                        .ok();
                    ctx.set_fill_style_str(&color.to_css());
                    ctx.fill();
                }
                Shape::Drop { center, size } => self.fill_drop(center, size, color),
                Shape::Backdrop { top, bottom } => {
                    let size = self.size();
                    let alpha = color.a as f32 / 255.0;
                    let gradient = ctx.create_linear_gradient(0.0, 0.0, 0.0, size.y as f64);
                    gradient
                        .add_color_stop(0.0, &top.with_opacity(alpha).to_css())
                        .ok();
                    gradient
                        .add_color_stop(1.0, &bottom.with_opacity(alpha).to_css())
                        .ok();
                    ctx.set_fill_style_canvas_gradient(&gradient);
                    ctx.fill_rect(0.0, 0.0, size.x as f64, size.y as f64);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_and_css() {
        let c = Rgba::hex(0x1d4ed8);
        assert_eq!(c, Rgba::rgb(0x1d, 0x4e, 0xd8));
        assert_eq!(c.with_opacity(0.5).to_css(), "rgba(29,78,216,0.502)");
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = Rgba::hex(0xb0bec5);
        let b = Rgba::hex(0x90a4ae);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 7.0), b);
    }

    #[test]
    fn test_recording_canvas_clear() {
        let mut canvas = RecordingCanvas::new(10.0, 10.0);
        canvas.fill(
            &Shape::Disc {
                center: Vec2::ZERO,
                radius: 1.0,
            },
            Rgba::WHITE,
        );
        assert!(!canvas.is_blank());
        canvas.clear();
        assert!(canvas.is_blank());
        assert_eq!(canvas.clears, 1);
    }
}
