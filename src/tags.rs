//! Tag vocabulary and the bounded tag stack.

use heapless::Vec as HeaplessVec;

use crate::error::{MarkupError, MarkupErrorKind};
use crate::primitives::are_same;
use crate::style::StyleDescriptor;

/// Semantic role of a markup element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagKind {
    Bold,
    Italics,
    Underline,
    Strikethrough,
    Mark,
    Small,
    Span,
    List,
    ListItem,
    Paragraph,
    Header,
    RawText,
    Blockquote,
    Subscript,
    Superscript,
    Quotation,
    Abbr,
    HorizontalRule,
    LineBreak,
    CodeBlock,
    Hyperlink,
    Blink,
    Marquee,
    Meter,
    Unknown,
}

const TAG_NAMES: [(&str, TagKind); 30] = [
    ("b", TagKind::Bold),
    ("strong", TagKind::Bold),
    ("i", TagKind::Italics),
    ("em", TagKind::Italics),
    ("cite", TagKind::Italics),
    ("var", TagKind::Italics),
    ("u", TagKind::Underline),
    ("s", TagKind::Strikethrough),
    ("del", TagKind::Strikethrough),
    ("mark", TagKind::Mark),
    ("small", TagKind::Small),
    ("span", TagKind::Span),
    ("ul", TagKind::List),
    ("ol", TagKind::List),
    ("li", TagKind::ListItem),
    ("p", TagKind::Paragraph),
    ("q", TagKind::Quotation),
    ("pre", TagKind::RawText),
    ("samp", TagKind::RawText),
    ("blockquote", TagKind::Blockquote),
    ("code", TagKind::CodeBlock),
    ("a", TagKind::Hyperlink),
    ("sub", TagKind::Subscript),
    ("sup", TagKind::Superscript),
    ("hr", TagKind::HorizontalRule),
    ("br", TagKind::LineBreak),
    ("abbr", TagKind::Abbr),
    ("blink", TagKind::Blink),
    ("marquee", TagKind::Marquee),
    ("meter", TagKind::Meter),
];

/// Classify a tag name (ASCII case-insensitive). Total over all inputs.
pub fn classify_tag(name: &str) -> TagKind {
    if heading_level(name).is_some() {
        return TagKind::Header;
    }
    TAG_NAMES
        .iter()
        .find(|(known, _)| are_same(known, name))
        .map(|(_, kind)| *kind)
        .unwrap_or(TagKind::Unknown)
}

/// `1..=6` for `h1`..`h6`.
pub fn heading_level(name: &str) -> Option<u8> {
    match name.as_bytes() {
        [h, digit @ b'1'..=b'6'] if h.eq_ignore_ascii_case(&b'h') => Some(digit - b'0'),
        _ => None,
    }
}

impl TagKind {
    /// Opening or closing the tag breaks the current line.
    pub fn is_block(self) -> bool {
        matches!(
            self,
            Self::Paragraph
                | Self::Header
                | Self::RawText
                | Self::ListItem
                | Self::CodeBlock
                | Self::Marquee
                | Self::Blockquote
                | Self::HorizontalRule
                | Self::List
        )
    }

    /// Content is laid out verbatim with newlines kept.
    pub fn preserves_whitespace(self) -> bool {
        matches!(self, Self::RawText | Self::CodeBlock)
    }

    /// Opens a segment even when no style property changed.
    pub fn always_segments(self) -> bool {
        matches!(
            self,
            Self::Abbr | Self::Blink | Self::Hyperlink | Self::Meter | Self::Subscript | Self::Superscript
        )
    }

    /// Never has content or a closing tag.
    pub fn is_void(self) -> bool {
        matches!(self, Self::HorizontalRule | Self::LineBreak | Self::Meter)
    }
}

/// Maximum tag nesting depth.
pub const MAX_TAG_DEPTH: usize = 64;

/// Open tag and its resolved style.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TagStackEntry<'a> {
    pub name: &'a str,
    pub kind: TagKind,
    pub style: StyleDescriptor<'a>,
}

/// Bounded stack mirroring markup nesting.
#[derive(Clone, Debug)]
pub struct TagStack<'a> {
    base: StyleDescriptor<'a>,
    entries: HeaplessVec<TagStackEntry<'a>, MAX_TAG_DEPTH>,
    just_closed: Option<TagStackEntry<'a>>,
}

impl<'a> TagStack<'a> {
    /// Empty stack whose first push inherits from `base`.
    pub fn new(base: StyleDescriptor<'a>) -> Self {
        Self {
            base,
            entries: HeaplessVec::new(),
            just_closed: None,
        }
    }

    /// Push `name`, starting from the current top style.
    pub fn push(&mut self, name: &'a str, kind: TagKind) -> Result<&mut TagStackEntry<'a>, MarkupError> {
        let entry = TagStackEntry {
            name,
            kind,
            style: self.current_style(),
        };
        self.just_closed = None;
        if self.entries.push(entry).is_err() {
            return Err(MarkupError::new(
                MarkupErrorKind::NestingTooDeep,
                format!("tag nesting exceeds {}", MAX_TAG_DEPTH),
            )
            .with_tag(name));
        }
        let last = self.entries.len() - 1;
        Ok(&mut self.entries[last])
    }

    /// Pop the top entry.
    ///
    /// With `reset == false` the entry stays observable through
    /// [`TagStack::just_closed`] until the next push or pop.
    pub fn pop(&mut self, reset: bool) -> Option<TagStackEntry<'a>> {
        let entry = self.entries.pop();
        self.just_closed = if reset { None } else { entry };
        entry
    }

    pub fn top(&self) -> Option<&TagStackEntry<'a>> {
        self.entries.last()
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Style of the innermost open tag, or the base style.
    pub fn current_style(&self) -> StyleDescriptor<'a> {
        self.top().map(|e| e.style).unwrap_or(self.base)
    }

    pub fn just_closed(&self) -> Option<&TagStackEntry<'a>> {
        self.just_closed.as_ref()
    }

    /// Any open tag has `kind`.
    pub fn contains(&self, kind: TagKind) -> bool {
        self.entries.iter().any(|e| e.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagStackEntry<'a>> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::Color;

    #[test]
    fn classify_covers_vocabulary() {
        assert_eq!(classify_tag("STRONG"), TagKind::Bold);
        assert_eq!(classify_tag("var"), TagKind::Italics);
        assert_eq!(classify_tag("ol"), TagKind::List);
        assert_eq!(classify_tag("H6"), TagKind::Header);
        assert_eq!(classify_tag("samp"), TagKind::RawText);
        assert_eq!(classify_tag("meter"), TagKind::Meter);
        assert_eq!(classify_tag("h7"), TagKind::Unknown);
        assert_eq!(classify_tag(""), TagKind::Unknown);
        assert_eq!(classify_tag("div"), TagKind::Unknown);
    }

    #[test]
    fn heading_levels() {
        assert_eq!(heading_level("h1"), Some(1));
        assert_eq!(heading_level("H4"), Some(4));
        assert_eq!(heading_level("h0"), None);
        assert_eq!(heading_level("hr"), None);
    }

    #[test]
    fn push_inherits_top_style() {
        let config = RenderConfig::default();
        let mut stack = TagStack::new(StyleDescriptor::base(&config));
        stack.push("span", TagKind::Span).unwrap().style.fg = Color::rgb(1, 2, 3);
        let inner = stack.push("b", TagKind::Bold).unwrap();
        assert_eq!(inner.style.fg, Color::rgb(1, 2, 3));
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn pop_without_reset_keeps_just_closed() {
        let config = RenderConfig::default();
        let mut stack = TagStack::new(StyleDescriptor::base(&config));
        stack.push("h1", TagKind::Header).unwrap();
        stack.pop(false);
        assert_eq!(stack.just_closed().map(|e| e.name), Some("h1"));
        assert!(stack.is_empty());
        stack.push("p", TagKind::Paragraph).unwrap();
        assert!(stack.just_closed().is_none());
        stack.pop(true);
        assert!(stack.just_closed().is_none());
    }

    #[test]
    fn push_past_capacity_fails() {
        let config = RenderConfig::default();
        let mut stack = TagStack::new(StyleDescriptor::base(&config));
        for _ in 0..MAX_TAG_DEPTH {
            stack.push("span", TagKind::Span).unwrap();
        }
        let err = stack.push("span", TagKind::Span).unwrap_err();
        assert_eq!(err.kind, MarkupErrorKind::NestingTooDeep);
        assert_eq!(stack.depth(), MAX_TAG_DEPTH);
    }
}
