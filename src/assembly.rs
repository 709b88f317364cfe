//! Measurement and final placement of laid-out lines.

use crate::config::{FontHandle, RenderConfig};
use crate::drawables::{BackgroundKind, Drawables, Line, Size, TokenKind};
use crate::style::{HorizontalAlignment, VerticalAlignment};

/// Average glyph advance as a fraction of the font size, used when no
/// text measurer is installed.
const HEURISTIC_ADVANCE: f32 = 0.5;

fn measure_text(config: &RenderConfig, text: &str, handle: FontHandle, size_px: f32) -> Size {
    match config.text_measurer.as_deref() {
        Some(measurer) => measurer.measure_text(text, handle),
        None => Size::new(text.chars().count() as f32 * size_px * HEURISTIC_ADVANCE, size_px),
    }
}

/// Fill in token sizes and segment space widths for one line.
///
/// Rules take `available_width`; a zero width is widened during
/// [`assemble`]. Bullets are square at `font size * bullet_scale` wide and
/// one font size tall.
pub fn measure_line(line: &mut Line<'_>, config: &RenderConfig, available_width: f32) {
    for segment in &mut line.segments {
        let style = segment.style;
        let font = style.font;
        segment.space_width = measure_text(config, " ", font.handle, font.size).width;
        for token in &mut segment.tokens {
            let size = match token.kind {
                TokenKind::Text => measure_text(config, token.content, font.handle, font.size),
                TokenKind::HorizontalRule => Size::new(
                    available_width.max(0.0),
                    config.hr_thickness + 2.0 * config.hr_vertical_margin,
                ),
                TokenKind::ListItemBullet => Size::new(font.size * config.bullet_scale, font.size),
                TokenKind::ListItemNumbered => {
                    measure_text(config, token.display_text(), font.handle, font.size)
                }
                TokenKind::Meter => Size::new(
                    style.width.unwrap_or(config.meter_default_size.width),
                    style.height.unwrap_or(config.meter_default_size.height),
                ),
            };
            token.bounds.width = size.width;
            token.bounds.height = size.height;
        }
    }
}

/// Recompute segment sizes and the line content size from token sizes.
///
/// The space after the line's final token is not counted. Script offsets
/// reserved by [`crate::adjust_for_super_subscripts`] add to the height.
pub(crate) fn update_line_extent(line: &mut Line<'_>) {
    let last_segment = line.segments.len().saturating_sub(1);
    let mut width = 0.0f32;
    let mut height = 0.0f32;
    for (si, segment) in line.segments.iter_mut().enumerate() {
        let padding = segment.style.padding;
        let last_token = segment.tokens.len().saturating_sub(1);
        let mut seg_width = padding.horizontal();
        let mut seg_height = 0.0f32;
        for (ti, token) in segment.tokens.iter().enumerate() {
            seg_width += token.bounds.width;
            if token.has_space_after && !(si == last_segment && ti == last_token) {
                seg_width += segment.space_width;
            }
            seg_height = seg_height.max(token.bounds.height);
        }
        if segment.tokens.is_empty() {
            seg_height = segment.style.font.size;
        }
        segment.bounds.width = seg_width;
        segment.bounds.height = seg_height + padding.vertical();
        width += segment.bounds.width;
        height = height.max(segment.bounds.height);
    }
    line.content.width = width;
    line.content.height = height + line.top_script_offset + line.bottom_script_offset;
}

/// Position every line, segment, token and background shape.
///
/// Lines stack top to bottom separated by `line_gap`, each shifted by its
/// offsets and horizontal alignment. When `bounds.width` is not positive the
/// widest line defines the alignment width.
pub fn assemble(drawables: &mut Drawables<'_>, config: &RenderConfig, bounds: Size) {
    let total_width = if bounds.width > 0.0 {
        bounds.width
    } else {
        drawables
            .lines
            .iter()
            .map(|l| l.outer_bounds().width)
            .fold(0.0, f32::max)
    };

    let mut y = 0.0f32;
    let mut right = 0.0f32;
    let count = drawables.lines.len();
    for (idx, line) in drawables.lines.iter_mut().enumerate() {
        let available = (total_width - line.offset.left - line.offset.right).max(0.0);
        widen_rules(line, available);

        y += line.offset.top;
        let free = (available - line.content.width).max(0.0);
        let shift = if line.marquee {
            0.0
        } else {
            match line.alignment {
                HorizontalAlignment::Center => free / 2.0,
                HorizontalAlignment::Right => free,
                HorizontalAlignment::Left | HorizontalAlignment::Justify => 0.0,
            }
        };
        line.content.x = line.offset.left + shift;
        line.content.y = y;
        place_segments(line);

        y += line.content.height + line.offset.bottom;
        if idx + 1 < count {
            y += config.line_gap;
        }
        right = right.max(line.content.right() + line.offset.right);
    }

    for shape in &mut drawables.backgrounds {
        let (Some(first), Some(last)) = (
            drawables.lines.get(shape.first_line),
            drawables.lines.get(shape.last_line),
        ) else {
            continue;
        };
        let top = first.outer_bounds().y;
        let bottom = last.outer_bounds().bottom();
        let x = (first.offset.left - config.blockquote_indent).max(0.0);
        shape.bounds.x = x;
        shape.bounds.y = top;
        shape.bounds.height = (bottom - top).max(0.0);
        shape.bounds.width = match shape.kind {
            BackgroundKind::BlockquoteFill => (total_width - x).max(0.0),
            BackgroundKind::BlockquoteBar => config.blockquote_bar_width,
        };
    }

    drawables.size = Size::new(right, y);
}

fn widen_rules(line: &mut Line<'_>, available: f32) {
    let mut changed = false;
    for token in line
        .segments
        .iter_mut()
        .flat_map(|s| s.tokens.iter_mut())
        .filter(|t| t.kind == TokenKind::HorizontalRule && t.bounds.width <= 0.0)
    {
        token.bounds.width = available;
        changed = true;
    }
    if changed {
        update_line_extent(line);
    }
}

fn place_segments(line: &mut Line<'_>) {
    let band_top = line.content.y + line.top_script_offset;
    let band_height = line.content.height - line.top_script_offset - line.bottom_script_offset;
    let mut x = line.content.x;
    for segment in &mut line.segments {
        let style = segment.style;
        let height = segment.bounds.height;
        let aligned = match style.v_align {
            VerticalAlignment::Top => band_top,
            VerticalAlignment::Center => band_top + (band_height - height) / 2.0,
            VerticalAlignment::Bottom => band_top + band_height - height,
        };
        segment.bounds.x = x;
        segment.bounds.y = aligned - style.superscript_offset + style.subscript_offset;

        let inner_height = height - style.padding.vertical();
        let mut token_x = x + style.padding.left;
        for token in &mut segment.tokens {
            token.bounds.x = token_x;
            token.bounds.y =
                segment.bounds.y + style.padding.top + (inner_height - token.bounds.height) / 2.0;
            token_x += token.bounds.width;
            if token.has_space_after {
                token_x += segment.space_width;
            }
        }
        x += segment.bounds.width;
    }
}
