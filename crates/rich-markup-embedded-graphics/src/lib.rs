//! embedded-graphics backend for `rich-markup-render` command lists.

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

use embedded_graphics::{
    mono_font::{
        ascii::{
            FONT_10X20, FONT_6X13_BOLD, FONT_6X13_ITALIC, FONT_6X9, FONT_7X13_BOLD,
            FONT_7X13_ITALIC, FONT_7X14, FONT_7X14_BOLD, FONT_8X13, FONT_8X13_BOLD,
            FONT_8X13_ITALIC, FONT_9X18, FONT_9X18_BOLD,
        },
        MonoFont, MonoTextStyle,
    },
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle, Rectangle, Triangle},
    text::{Baseline, Text},
};
use rich_markup::{
    Color, FontHandle, FontRequest, FontResolver, RenderConfig, Size as LayoutSize, TextMeasurer,
};
use rich_markup_render::{DrawBackend, Point as RenderPoint, Rect};
use std::borrow::Cow;
use std::sync::Arc;

/// Why a font handle had to fall back to a default face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontFallbackReason {
    UnknownFontId,
    UnsupportedWeightItalic,
}

/// Font resolver mapping requests onto the built-in mono fonts.
///
/// Handles encode a size bucket and a bold/italic variant; family and the
/// light flag are ignored. The matching measurer is [`EgTextMeasurer`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MonoFontResolver;

impl MonoFontResolver {
    const SIZE_SMALL: u32 = 0;
    const SIZE_MEDIUM: u32 = 1;
    const SIZE_LARGE: u32 = 2;
    const SIZE_XL: u32 = 3;

    const VARIANT_REGULAR: u32 = 0;
    const VARIANT_ITALIC: u32 = 1;
    const VARIANT_BOLD: u32 = 2;
    const VARIANT_BOLD_ITALIC: u32 = 3;

    fn encode(size_bucket: u32, variant: u32) -> FontHandle {
        FontHandle((size_bucket << 2) | (variant & 0x03))
    }

    fn decode(handle: FontHandle) -> Option<(u32, u32)> {
        (handle.0 <= 0x0F).then_some(((handle.0 >> 2) & 0x03, handle.0 & 0x03))
    }

    fn size_bucket_for(size_px: f32) -> u32 {
        if size_px >= 24.0 {
            Self::SIZE_XL
        } else if size_px >= 20.0 {
            Self::SIZE_LARGE
        } else if size_px >= 16.0 {
            Self::SIZE_MEDIUM
        } else {
            Self::SIZE_SMALL
        }
    }

    fn variant_for(bold: bool, italic: bool) -> u32 {
        match (bold, italic) {
            (true, true) => Self::VARIANT_BOLD_ITALIC,
            (true, false) => Self::VARIANT_BOLD,
            (false, true) => Self::VARIANT_ITALIC,
            (false, false) => Self::VARIANT_REGULAR,
        }
    }

    /// Mono font for a handle produced by this resolver.
    pub fn font_for(handle: FontHandle) -> (&'static MonoFont<'static>, Option<FontFallbackReason>) {
        let Some(decoded) = Self::decode(handle) else {
            return (&FONT_8X13, Some(FontFallbackReason::UnknownFontId));
        };
        match decoded {
            (Self::SIZE_SMALL, Self::VARIANT_REGULAR) => (&FONT_6X9, None),
            (Self::SIZE_SMALL, Self::VARIANT_ITALIC) => (&FONT_6X13_ITALIC, None),
            (Self::SIZE_SMALL, Self::VARIANT_BOLD) => (&FONT_6X13_BOLD, None),
            (Self::SIZE_SMALL, _) => (
                &FONT_6X13_BOLD,
                Some(FontFallbackReason::UnsupportedWeightItalic),
            ),
            (Self::SIZE_MEDIUM, Self::VARIANT_REGULAR) => (&FONT_7X14, None),
            (Self::SIZE_MEDIUM, Self::VARIANT_ITALIC) => (&FONT_7X13_ITALIC, None),
            (Self::SIZE_MEDIUM, Self::VARIANT_BOLD) => (&FONT_7X14_BOLD, None),
            (Self::SIZE_MEDIUM, _) => (
                &FONT_7X13_BOLD,
                Some(FontFallbackReason::UnsupportedWeightItalic),
            ),
            (Self::SIZE_LARGE, Self::VARIANT_REGULAR) => (&FONT_8X13, None),
            (Self::SIZE_LARGE, Self::VARIANT_ITALIC) => (&FONT_8X13_ITALIC, None),
            (Self::SIZE_LARGE, Self::VARIANT_BOLD) => (&FONT_8X13_BOLD, None),
            (Self::SIZE_LARGE, _) => (
                &FONT_8X13_BOLD,
                Some(FontFallbackReason::UnsupportedWeightItalic),
            ),
            (Self::SIZE_XL, Self::VARIANT_REGULAR) => (&FONT_10X20, None),
            (Self::SIZE_XL, Self::VARIANT_ITALIC) => (
                &FONT_9X18,
                Some(FontFallbackReason::UnsupportedWeightItalic),
            ),
            (Self::SIZE_XL, Self::VARIANT_BOLD) => (&FONT_9X18_BOLD, None),
            _ => (
                &FONT_9X18_BOLD,
                Some(FontFallbackReason::UnsupportedWeightItalic),
            ),
        }
    }
}

impl FontResolver for MonoFontResolver {
    fn resolve_font(&self, request: &FontRequest<'_>) -> FontHandle {
        let handle = Self::encode(
            Self::size_bucket_for(request.size_px),
            Self::variant_for(request.bold, request.italic),
        );
        if let (_, Some(reason)) = Self::font_for(handle) {
            log::trace!("mono font fallback for {:?}: {:?}", request, reason);
        }
        handle
    }
}

/// `TextMeasurer` backed by the mono font metrics of [`MonoFontResolver`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EgTextMeasurer;

impl EgTextMeasurer {
    /// Shared measurer trait object for render-config wiring.
    pub fn shared() -> Arc<dyn TextMeasurer> {
        Arc::new(Self)
    }
}

impl TextMeasurer for EgTextMeasurer {
    fn measure_text(&self, text: &str, font: FontHandle) -> LayoutSize {
        let (font, _) = MonoFontResolver::font_for(font);
        let advance = font.character_size.width + font.character_spacing;
        let chars = normalize_text_for_mono(text).chars().count() as u32;
        let width = (chars * advance).saturating_sub(font.character_spacing.min(chars * advance));
        LayoutSize::new(width as f32, font.character_size.height as f32)
    }
}

/// Attach mono font resolution and matching measurement to a config.
///
/// Layout wrapping then uses the same width model the backend draws with.
pub fn with_embedded_fonts(config: RenderConfig) -> RenderConfig {
    config
        .with_font_resolver(Arc::new(MonoFontResolver))
        .with_text_measurer(EgTextMeasurer::shared())
}

fn normalize_text_for_mono(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|ch| {
        matches!(
            ch,
            '\u{00A0}' // nbsp
                | '\u{00A9}' // copyright
                | '\u{00AE}' // registered
                | '\u{2013}' // en dash
                | '\u{2014}' // em dash
                | '\u{2018}' // left single quote
                | '\u{2019}' // right single quote
                | '\u{201C}' // left double quote
                | '\u{201D}' // right double quote
                | '\u{2026}' // ellipsis
                | '\u{2122}' // trade mark
        )
    }) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{00A0}' => out.push(' '),
            '\u{00A9}' => out.push_str("(c)"),
            '\u{00AE}' => out.push_str("(R)"),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            '\u{2122}' => out.push_str("TM"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// [`DrawBackend`] drawing onto any RGB888 `DrawTarget`.
///
/// Alpha is treated as on/off: fully transparent colours are skipped and
/// everything else is drawn opaque. The first draw error is kept and
/// returned by [`EgBackend::finish`]; later primitives are still attempted.
pub struct EgBackend<'d, D>
where
    D: DrawTarget<Color = Rgb888>,
{
    display: &'d mut D,
    clips: Vec<Rectangle>,
    error: Option<D::Error>,
    failed_draws: usize,
}

impl<'d, D> EgBackend<'d, D>
where
    D: DrawTarget<Color = Rgb888>,
{
    pub fn new(display: &'d mut D) -> Self {
        Self {
            display,
            clips: Vec::with_capacity(0),
            error: None,
            failed_draws: 0,
        }
    }

    /// Number of primitives that failed to draw.
    pub fn failed_draws(&self) -> usize {
        self.failed_draws
    }

    /// Release the display, returning the first draw error if any.
    pub fn finish(self) -> Result<(), D::Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn clip_area(&self) -> Rectangle {
        self.clips
            .last()
            .copied()
            .unwrap_or_else(|| self.display.bounding_box())
    }

    fn draw<T>(&mut self, drawable: &T)
    where
        T: Drawable<Color = Rgb888>,
    {
        let area = self.clip_area();
        let mut target = self.display.clipped(&area);
        if let Err(err) = drawable.draw(&mut target) {
            self.failed_draws += 1;
            if self.error.is_none() {
                self.error = Some(err);
            }
        }
    }
}

fn rgb(color: Color) -> Option<Rgb888> {
    (!color.is_transparent()).then(|| Rgb888::new(color.r, color.g, color.b))
}

fn to_point(p: RenderPoint) -> Point {
    Point::new(p.x.round() as i32, p.y.round() as i32)
}

fn to_rectangle(rect: Rect) -> Rectangle {
    Rectangle::new(
        Point::new(rect.x.round() as i32, rect.y.round() as i32),
        Size::new(
            rect.width.max(0.0).round() as u32,
            rect.height.max(0.0).round() as u32,
        ),
    )
}

fn stroke_width(thickness: f32) -> u32 {
    (thickness.round() as u32).max(1)
}

fn lerp_channel(from: u8, to: u8, t: f32) -> u8 {
    (f32::from(from) + (f32::from(to) - f32::from(from)) * t).round() as u8
}

impl<D> DrawBackend for EgBackend<'_, D>
where
    D: DrawTarget<Color = Rgb888>,
{
    fn draw_line(&mut self, from: RenderPoint, to: RenderPoint, thickness: f32, color: Color) {
        let Some(color) = rgb(color) else {
            return;
        };
        let line = Line::new(to_point(from), to_point(to))
            .into_styled(PrimitiveStyle::with_stroke(color, stroke_width(thickness)));
        self.draw(&line);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(color) = rgb(color) else {
            return;
        };
        let shape = to_rectangle(rect).into_styled(PrimitiveStyle::with_fill(color));
        self.draw(&shape);
    }

    fn fill_gradient_rect(&mut self, rect: Rect, top: Color, bottom: Color) {
        let area = to_rectangle(rect);
        let rows = area.size.height;
        for row in 0..rows {
            let t = if rows > 1 {
                row as f32 / (rows - 1) as f32
            } else {
                0.0
            };
            let color = Color::rgba(
                lerp_channel(top.r, bottom.r, t),
                lerp_channel(top.g, bottom.g, t),
                lerp_channel(top.b, bottom.b, t),
                lerp_channel(top.a, bottom.a, t),
            );
            let Some(color) = rgb(color) else {
                continue;
            };
            let band = Rectangle::new(
                Point::new(area.top_left.x, area.top_left.y + row as i32),
                Size::new(area.size.width, 1),
            )
            .into_styled(PrimitiveStyle::with_fill(color));
            self.draw(&band);
        }
    }

    fn fill_triangle(&mut self, a: RenderPoint, b: RenderPoint, c: RenderPoint, color: Color) {
        let Some(color) = rgb(color) else {
            return;
        };
        let shape = Triangle::new(to_point(a), to_point(b), to_point(c))
            .into_styled(PrimitiveStyle::with_fill(color));
        self.draw(&shape);
    }

    fn fill_circle(&mut self, center: RenderPoint, radius: f32, color: Color) {
        let Some(color) = rgb(color) else {
            return;
        };
        let diameter = (radius * 2.0).max(1.0).round() as u32;
        let shape = Circle::with_center(to_point(center), diameter)
            .into_styled(PrimitiveStyle::with_fill(color));
        self.draw(&shape);
    }

    fn stroke_circle(&mut self, center: RenderPoint, radius: f32, thickness: f32, color: Color) {
        let Some(color) = rgb(color) else {
            return;
        };
        let diameter = (radius * 2.0).max(1.0).round() as u32;
        let shape = Circle::with_center(to_point(center), diameter)
            .into_styled(PrimitiveStyle::with_stroke(color, stroke_width(thickness)));
        self.draw(&shape);
    }

    fn draw_text(&mut self, origin: RenderPoint, text: &str, font: FontHandle, color: Color) {
        let Some(color) = rgb(color) else {
            return;
        };
        let (font, _) = MonoFontResolver::font_for(font);
        let style = MonoTextStyle::new(font, color);
        let normalized = normalize_text_for_mono(text);
        let run = Text::with_baseline(normalized.as_ref(), to_point(origin), style, Baseline::Top);
        self.draw(&run);
    }

    fn push_clip(&mut self, rect: Rect) {
        let area = self.clip_area().intersection(&to_rectangle(rect));
        self.clips.push(area);
    }

    fn pop_clip(&mut self) {
        self.clips.pop();
    }

    /// Diamond bullets.
    fn draw_custom_bullet(&mut self, rect: Rect, _depth: u8, color: Color) -> bool {
        let center = rect.center();
        self.fill_polygon(
            &[
                RenderPoint::new(center.x, rect.y),
                RenderPoint::new(rect.right(), center.y),
                RenderPoint::new(center.x, rect.bottom()),
                RenderPoint::new(rect.x, center.y),
            ],
            color,
        );
        true
    }
}
