//! Layout output: lines of styled segments of positioned tokens.

use heapless::String as HeaplessString;
use smallvec::SmallVec;

use crate::color::Color;
use crate::style::{HorizontalAlignment, StyleDescriptor};

/// Width/height pair in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True when both dimensions are non-positive.
    pub fn is_zero(self) -> bool {
        self.width <= 0.0 && self.height <= 0.0
    }
}

/// Axis-aligned box in pixels, origin top-left.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Half-open containment test.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// Extra space around a line's content (indentation and vertical margins).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Offsets {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// Renderable unit kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Text,
    HorizontalRule,
    ListItemBullet,
    ListItemNumbered,
    Meter,
}

/// Nested list number text such as `2.1.`.
pub type ListNumbering = HeaplessString<32>;

/// List position carried by bullet tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListMarker {
    /// 1-based nesting depth.
    pub depth: u8,
    /// 1-based item index at this depth.
    pub index: u16,
    /// Rendered number text; empty for symbolic bullets.
    pub numbering: ListNumbering,
}

/// One atomic renderable unit.
#[derive(Clone, Debug, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// View into the source text or the escape table; never copied.
    pub content: &'a str,
    /// Size after measurement; absolute position after assembly.
    pub bounds: BoundingBox,
    /// A collapsed whitespace run followed this token.
    pub has_space_after: bool,
    pub list: Option<ListMarker>,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, content: &'a str) -> Self {
        Self {
            kind,
            content,
            bounds: BoundingBox::default(),
            has_space_after: false,
            list: None,
        }
    }

    pub fn text(content: &'a str) -> Self {
        Self::new(TokenKind::Text, content)
    }

    /// Number text for numbered bullets, content otherwise.
    pub fn display_text(&self) -> &str {
        match (&self.kind, &self.list) {
            (TokenKind::ListItemNumbered, Some(marker)) => marker.numbering.as_str(),
            _ => self.content,
        }
    }
}

/// Maximal run of tokens sharing one style.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment<'a> {
    pub style: StyleDescriptor<'a>,
    pub tokens: SmallVec<[Token<'a>; 4]>,
    pub bounds: BoundingBox,
    /// Width of one collapsed space in this segment's font.
    pub space_width: f32,
    pub superscript_depth: u8,
    pub subscript_depth: u8,
}

impl<'a> Segment<'a> {
    pub fn new(style: StyleDescriptor<'a>) -> Self {
        Self {
            style,
            tokens: SmallVec::new(),
            bounds: BoundingBox::default(),
            space_width: 0.0,
            superscript_depth: 0,
            subscript_depth: 0,
        }
    }

    pub fn is_script(&self) -> bool {
        self.superscript_depth > 0 || self.subscript_depth > 0
    }
}

/// One visual row.
#[derive(Clone, Debug, PartialEq)]
pub struct Line<'a> {
    pub segments: Vec<Segment<'a>>,
    /// Content box; absolute after assembly.
    pub content: BoundingBox,
    /// Indentation and vertical margins around the content.
    pub offset: Offsets,
    pub alignment: HorizontalAlignment,
    pub has_text: bool,
    pub has_superscript: bool,
    pub has_subscript: bool,
    pub marquee: bool,
    pub blockquote_depth: u8,
    /// Height reserved above the baseline band for superscripts.
    pub top_script_offset: f32,
    /// Height reserved below the baseline band for subscripts.
    pub bottom_script_offset: f32,
}

impl<'a> Line<'a> {
    pub fn new(offset: Offsets, blockquote_depth: u8) -> Self {
        Self {
            segments: Vec::new(),
            content: BoundingBox::default(),
            offset,
            alignment: HorizontalAlignment::Left,
            has_text: false,
            has_superscript: false,
            has_subscript: false,
            marquee: false,
            blockquote_depth,
            top_script_offset: 0.0,
            bottom_script_offset: 0.0,
        }
    }

    pub fn token_count(&self) -> usize {
        self.segments.iter().map(|s| s.tokens.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.token_count() == 0
    }

    /// Single rule token and nothing else.
    pub fn is_rule_only(&self) -> bool {
        let mut tokens = self.segments.iter().flat_map(|s| s.tokens.iter());
        matches!(
            (tokens.next(), tokens.next()),
            (Some(t), None) if t.kind == TokenKind::HorizontalRule
        )
    }

    /// Full box including offsets.
    pub fn outer_bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.content.x - self.offset.left,
            self.content.y - self.offset.top,
            self.content.width + self.offset.left + self.offset.right,
            self.content.height + self.offset.top + self.offset.bottom,
        )
    }

    pub(crate) fn refresh_flags(&mut self) {
        self.has_text = self
            .segments
            .iter()
            .flat_map(|s| s.tokens.iter())
            .any(|t| t.kind == TokenKind::Text);
        self.has_superscript = self.segments.iter().any(|s| s.superscript_depth > 0);
        self.has_subscript = self.segments.iter().any(|s| s.subscript_depth > 0);
    }
}

/// Decoration drawn behind the lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackgroundKind {
    BlockquoteFill,
    BlockquoteBar,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundShape {
    pub kind: BackgroundKind,
    pub bounds: BoundingBox,
    pub color: Color,
    /// 1-based blockquote nesting level.
    pub depth: u8,
    /// Inclusive line range covered.
    pub first_line: usize,
    pub last_line: usize,
}

/// Tooltip and link under a point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HitTarget<'a> {
    pub line: usize,
    pub segment: usize,
    pub tooltip: Option<&'a str>,
    pub link: Option<&'a str>,
}

/// Laid-out document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Drawables<'a> {
    pub lines: Vec<Line<'a>>,
    pub backgrounds: Vec<BackgroundShape>,
    /// Extent of all lines.
    pub size: Size,
}

impl<'a> Drawables<'a> {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Visible text, one row per line that carries text.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for line in self.lines.iter().filter(|l| l.has_text) {
            if !out.is_empty() {
                out.push('\n');
            }
            let row_start = out.len();
            for token in line.segments.iter().flat_map(|s| s.tokens.iter()) {
                match token.kind {
                    TokenKind::Text | TokenKind::ListItemNumbered => {
                        out.push_str(token.display_text());
                        if token.has_space_after || token.kind == TokenKind::ListItemNumbered {
                            out.push(' ');
                        }
                    }
                    TokenKind::HorizontalRule | TokenKind::ListItemBullet | TokenKind::Meter => {}
                }
            }
            let trimmed = out[row_start..].trim_end().len();
            out.truncate(row_start + trimmed);
        }
        out
    }

    /// Innermost segment under `(x, y)` that carries a tooltip or link.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<HitTarget<'a>> {
        self.lines.iter().enumerate().find_map(|(line_idx, line)| {
            if !line.outer_bounds().contains(x, y) {
                return None;
            }
            line.segments
                .iter()
                .enumerate()
                .find(|(_, seg)| {
                    (seg.style.tooltip.is_some() || seg.style.link.is_some())
                        && seg.bounds.contains(x, y)
                })
                .map(|(seg_idx, seg)| HitTarget {
                    line: line_idx,
                    segment: seg_idx,
                    tooltip: seg.style.tooltip,
                    link: seg.style.link,
                })
        })
    }
}
