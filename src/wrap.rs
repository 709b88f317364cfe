//! Word wrap and super/subscript vertical offsets.

use smallvec::{smallvec, SmallVec};

use crate::config::RenderConfig;
use crate::drawables::{Line, Segment};

/// Re-flow `lines[index]` into rows no wider than `available_width`.
///
/// Wrapping happens between tokens only; a token wider than the row gets a
/// row of its own. Every row keeps the original indentation. The top margin
/// stays on the first row and the bottom margin moves to the last one.
/// Extra rows are inserted right after `index`.
///
/// Rule-only lines, marquee lines, disabled wrapping, a missing text measurer
/// and a non-positive width all leave the line untouched.
///
/// Returns the indices of the rows the line now occupies.
pub fn perform_word_wrap<'a>(
    lines: &mut Vec<Line<'a>>,
    index: usize,
    available_width: f32,
    config: &RenderConfig,
) -> SmallVec<[usize; 4]> {
    let Some(line) = lines.get_mut(index) else {
        return SmallVec::new();
    };
    if line.is_rule_only()
        || line.marquee
        || !config.word_wrap
        || config.text_measurer.is_none()
        || !(available_width > 0.0 && available_width.is_finite())
    {
        return smallvec![index];
    }

    let segments = core::mem::take(&mut line.segments);
    let template = Line {
        segments: Vec::new(),
        ..line.clone()
    };
    let mut rows: SmallVec<[Line<'a>; 2]> = SmallVec::new();
    let mut row = template.clone();
    let mut cursor = 0.0f32;
    let mut row_has_tokens = false;

    for segment in segments {
        let padding = segment.style.padding;
        let token_count = segment.tokens.len();
        let mut piece = empty_like(&segment);
        if token_count == 0 {
            row.segments.push(piece);
            continue;
        }
        for (i, token) in segment.tokens.into_iter().enumerate() {
            let lead = if piece.tokens.is_empty() {
                padding.left
            } else {
                0.0
            };
            let width = token.bounds.width;
            if row_has_tokens && cursor + lead + width + padding.right > available_width {
                if !piece.tokens.is_empty() {
                    let next = empty_like(&piece);
                    row.segments.push(core::mem::replace(&mut piece, next));
                }
                let next_row = template.clone();
                rows.push(core::mem::replace(&mut row, next_row));
                cursor = 0.0;
                row_has_tokens = false;
            }
            let lead = if piece.tokens.is_empty() {
                padding.left
            } else {
                0.0
            };
            let trail = if i + 1 == token_count {
                padding.right
            } else {
                0.0
            };
            let space = if token.has_space_after {
                segment.space_width
            } else {
                0.0
            };
            cursor += lead + token.bounds.width + trail + space;
            row_has_tokens = true;
            piece.tokens.push(token);
        }
        if !piece.tokens.is_empty() {
            row.segments.push(piece);
        }
    }
    rows.push(row);

    let count = rows.len();
    if count > 1 {
        log::trace!("wrapped line {} into {} rows", index, count);
    }
    for (i, row) in rows.iter_mut().enumerate() {
        if i > 0 {
            row.offset.top = 0.0;
        }
        if i + 1 < count {
            row.offset.bottom = 0.0;
        }
    }
    let mut rows = rows.into_iter();
    if let (Some(first), Some(slot)) = (rows.next(), lines.get_mut(index)) {
        *slot = first;
    }
    lines.splice(index + 1..index + 1, rows);
    (index..index + count).collect()
}

fn empty_like<'a>(segment: &Segment<'a>) -> Segment<'a> {
    let mut out = Segment::new(segment.style);
    out.space_width = segment.space_width;
    out.superscript_depth = segment.superscript_depth;
    out.subscript_depth = segment.subscript_depth;
    out
}

/// Vertical shift of a script nested `depth` levels deep:
/// `sum(scale^k * base / 2)` for `k` in `1..=depth`.
pub fn nested_script_offset(base_font_size: f32, scale: f32, depth: u8) -> f32 {
    let mut offset = 0.0;
    let mut factor = 1.0;
    for _ in 0..depth {
        factor *= scale;
        offset += factor * base_font_size / 2.0;
    }
    offset
}

/// Assign script offsets to every segment of the given lines and reserve
/// room for them on the line.
///
/// Offsets grow from the font size outside the outermost script tag, not
/// from the segment's own (already scaled or explicitly set) size.
pub fn adjust_for_super_subscripts(lines: &mut [Line<'_>], indices: &[usize], config: &RenderConfig) {
    let scale = config.script_scale;
    for &idx in indices {
        let Some(line) = lines.get_mut(idx) else {
            continue;
        };
        if !line.has_superscript && !line.has_subscript {
            continue;
        }
        let mut top = 0.0f32;
        let mut bottom = 0.0f32;
        for segment in &mut line.segments {
            let base = segment
                .style
                .script_base_size
                .unwrap_or(segment.style.font.size);
            segment.style.superscript_offset =
                nested_script_offset(base, scale, segment.superscript_depth);
            segment.style.subscript_offset =
                nested_script_offset(base, scale, segment.subscript_depth);
            top = top.max(segment.style.superscript_offset);
            bottom = bottom.max(segment.style.subscript_offset);
        }
        line.top_script_offset = top;
        line.bottom_script_offset = bottom;
    }
}
