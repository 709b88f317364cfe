use rich_markup::{Color, FontHandle};

use crate::render_ir::{
    BulletCommand, BulletShape, CommandList, DrawCommand, MeterCommand, Point, Rect, TextCommand,
};

/// Drawing primitives a target must provide.
///
/// Coordinates are render-target pixels with the origin at the top left.
/// Only [`DrawBackend::fill_rect`], [`DrawBackend::draw_line`],
/// [`DrawBackend::fill_triangle`], [`DrawBackend::fill_circle`] and
/// [`DrawBackend::draw_text`] are required.
pub trait DrawBackend {
    fn draw_line(&mut self, from: Point, to: Point, thickness: f32, color: Color);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Vertical gradient from `top` to `bottom`.
    fn fill_gradient_rect(&mut self, rect: Rect, top: Color, _bottom: Color) {
        self.fill_rect(rect, top);
    }

    fn fill_triangle(&mut self, a: Point, b: Point, c: Point, color: Color);

    fn fill_circle(&mut self, center: Point, radius: f32, color: Color);

    fn stroke_circle(&mut self, center: Point, radius: f32, thickness: f32, color: Color) {
        let _ = thickness;
        self.fill_circle(center, radius, color);
    }

    /// Convex polygon, fanned into triangles by default.
    fn fill_polygon(&mut self, points: &[Point], color: Color) {
        let Some((&first, rest)) = points.split_first() else {
            return;
        };
        for pair in rest.windows(2) {
            self.fill_triangle(first, pair[0], pair[1], color);
        }
    }

    /// Draw a run of text with its top-left corner at `origin`.
    fn draw_text(&mut self, origin: Point, text: &str, font: FontHandle, color: Color);

    fn push_clip(&mut self, _rect: Rect) {}

    fn pop_clip(&mut self) {}

    /// Draw a custom list bullet. Returns `false` to fall back to a disc.
    fn draw_custom_bullet(&mut self, _rect: Rect, _depth: u8, _color: Color) -> bool {
        false
    }
}

/// Time source for blink and marquee animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameClock {
    /// Milliseconds since the animation epoch chosen by the host.
    pub elapsed_ms: u64,
    /// Full blink cycle; content is visible during the first half.
    pub blink_period_ms: u32,
    /// Marquee scroll speed.
    pub marquee_px_per_second: f32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self {
            elapsed_ms: 0,
            blink_period_ms: 1000,
            marquee_px_per_second: 60.0,
        }
    }
}

impl FrameClock {
    pub fn at(elapsed_ms: u64) -> Self {
        Self {
            elapsed_ms,
            ..Self::default()
        }
    }

    /// Blinking content is drawn in this frame.
    pub fn blink_visible(&self) -> bool {
        let period = u64::from(self.blink_period_ms.max(2));
        self.elapsed_ms % period < period / 2
    }

    /// Horizontal shift of marquee content inside a `window`-wide clip.
    ///
    /// Content enters at the right edge and leaves at the left edge, then
    /// starts over.
    pub fn marquee_shift(&self, window: f32, content_width: f32) -> f32 {
        let cycle = window + content_width;
        if cycle <= 0.0 || self.marquee_px_per_second <= 0.0 {
            return 0.0;
        }
        let travelled = self.elapsed_ms as f32 / 1000.0 * self.marquee_px_per_second;
        window - travelled % cycle
    }
}

/// Play `list` on `backend` for the frame described by `clock`.
///
/// Unbalanced clip commands are closed at the end.
pub fn execute_commands<B: DrawBackend + ?Sized>(
    list: &CommandList,
    backend: &mut B,
    clock: &FrameClock,
) {
    let blink_on = clock.blink_visible();
    let mut shift = 0.0f32;
    let mut open_clips = 0usize;
    for command in &list.commands {
        match command {
            DrawCommand::Text(text) => {
                if !text.blink || blink_on {
                    draw_text_run(backend, text, shift);
                }
            }
            DrawCommand::Rect(rect) => {
                backend.fill_rect(rect.rect.shifted(shift), Color::from_rgba_u32(rect.fill))
            }
            DrawCommand::Rule(rule) => backend.draw_line(
                Point::new(rule.from.x + shift, rule.from.y),
                Point::new(rule.to.x + shift, rule.to.y),
                rule.thickness,
                Color::from_rgba_u32(rule.color),
            ),
            DrawCommand::Bullet(bullet) => {
                if !bullet.blink || blink_on {
                    draw_bullet(backend, bullet, shift);
                }
            }
            DrawCommand::Meter(meter) => draw_meter(backend, meter, shift),
            DrawCommand::PushClip(rect) => {
                backend.push_clip(*rect);
                open_clips += 1;
            }
            DrawCommand::PopClip => {
                if open_clips > 0 {
                    backend.pop_clip();
                    open_clips -= 1;
                }
            }
            DrawCommand::MarqueeBegin(marquee) => {
                backend.push_clip(marquee.clip);
                open_clips += 1;
                shift = clock.marquee_shift(marquee.clip.width, marquee.content_width);
            }
            DrawCommand::MarqueeEnd => {
                shift = 0.0;
                if open_clips > 0 {
                    backend.pop_clip();
                    open_clips -= 1;
                }
            }
        }
    }
    for _ in 0..open_clips {
        backend.pop_clip();
    }
}

fn draw_text_run<B: DrawBackend + ?Sized>(backend: &mut B, text: &TextCommand, shift: f32) {
    let color = Color::from_rgba_u32(text.color);
    let x = text.x + shift;
    backend.draw_text(Point::new(x, text.y), &text.text, FontHandle(text.font), color);
    let thickness = (text.size / 14.0).max(1.0);
    if text.underline {
        let y = text.y + text.height - thickness;
        backend.draw_line(Point::new(x, y), Point::new(x + text.width, y), thickness, color);
    }
    if text.strikethrough {
        let y = text.y + text.height / 2.0;
        backend.draw_line(Point::new(x, y), Point::new(x + text.width, y), thickness, color);
    }
}

fn draw_bullet<B: DrawBackend + ?Sized>(backend: &mut B, bullet: &BulletCommand, shift: f32) {
    let rect = bullet.rect.shifted(shift);
    let color = Color::from_rgba_u32(bullet.color);
    let center = rect.center();
    let radius = rect.width.min(rect.height) / 2.0;
    match bullet.shape {
        BulletShape::Disc => backend.fill_circle(center, radius, color),
        BulletShape::Circle => backend.stroke_circle(center, radius, 1.0, color),
        BulletShape::Square => backend.fill_rect(rect, color),
        BulletShape::Triangle => backend.fill_polygon(
            &[
                Point::new(rect.x, rect.y),
                Point::new(rect.right(), center.y),
                Point::new(rect.x, rect.bottom()),
            ],
            color,
        ),
        BulletShape::Custom => {
            if !backend.draw_custom_bullet(rect, bullet.depth, color) {
                backend.fill_circle(center, radius, color);
            }
        }
    }
}

fn draw_meter<B: DrawBackend + ?Sized>(backend: &mut B, meter: &MeterCommand, shift: f32) {
    let rect = meter.rect.shifted(shift);
    backend.fill_rect(rect, Color::from_rgba_u32(meter.background));
    let filled = rect.width * meter.fraction.clamp(0.0, 1.0);
    if filled <= 0.0 {
        return;
    }
    let top = Color::from_rgba_u32(meter.foreground);
    backend.fill_gradient_rect(Rect::new(rect.x, rect.y, filled, rect.height), top, shade(top));
}

/// Three-quarter brightness of `color`, alpha kept.
fn shade(color: Color) -> Color {
    let dim = |c: u8| (u16::from(c) * 3 / 4) as u8;
    Color::rgba(dim(color.r), dim(color.g), dim(color.b), color.a)
}
