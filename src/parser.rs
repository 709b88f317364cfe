//! Markup tokenizer and layout driver.
//!
//! A single left-to-right pass over the source drives the tag stack and the
//! style resolver and emits lines of segments of tokens. Each line is
//! measured, wrapped and adjusted for scripts as soon as it is complete, and
//! the finished lines are positioned by [`crate::assemble`].
//!
//! All scratch state lives in a [`ParseContext`] that is created per call, so
//! layouts may nest (a tooltip laid out while another layout is running) or
//! run concurrently on different threads.

use core::fmt::Write as _;
use core::mem;

use log::{debug, error, trace, warn};
use quick_xml::escape::resolve_predefined_entity;
use smallvec::SmallVec;

use crate::assembly::{assemble, measure_line, update_line_extent};
use crate::config::{RenderConfig, NEW_LINE_ESCAPE};
use crate::drawables::{
    BackgroundKind, BackgroundShape, BoundingBox, Drawables, Line, ListMarker, ListNumbering,
    Offsets, Segment, Size, Token, TokenKind,
};
use crate::error::{MarkupDiagnostic, MarkupError, MarkupErrorKind, Severity};
use crate::primitives::{
    are_same, extract_number, get_quoted_string, skip_space, whole_word,
};
use crate::style::{
    populate_segment_style, BulletKind, FontFamily, StyleChanges, StyleDescriptor, StyleProperty,
};
use crate::tags::{classify_tag, heading_level, TagKind, TagStack};
use crate::wrap::{adjust_for_super_subscripts, perform_word_wrap};

/// Deepest list level with its own item counter.
const MAX_LIST_DEPTH: usize = 8;
/// Item counters saturate here so each numbering part stays three digits.
const MAX_LIST_INDEX: u16 = 999;
/// Longest escape name scanned before the escape is treated as literal text.
const MAX_ESCAPE_NAME: usize = 32;
const SMALL_FONT_SCALE: f32 = 0.83;

/// How the parse ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseStatus {
    /// Whole input consumed. Warnings may still have been reported.
    Complete,
    /// Parsing stopped at a fatal error; lines built before it are kept.
    Aborted(MarkupError),
}

/// Layout result with its diagnostics.
#[derive(Clone, Debug)]
pub struct LayoutOutcome<'a> {
    pub drawables: Drawables<'a>,
    pub status: ParseStatus,
    /// Every diagnostic reported during the parse, in order.
    pub diagnostics: Vec<MarkupDiagnostic>,
    /// Tags still open at end of input, innermost first. They were closed
    /// automatically.
    pub unclosed_tags: Vec<&'a str>,
}

impl LayoutOutcome<'_> {
    pub fn is_complete(&self) -> bool {
        self.status == ParseStatus::Complete
    }

    pub fn warnings(&self) -> impl Iterator<Item = &MarkupDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }
}

/// Lay out `text` within `bounds`.
///
/// `bounds.width <= 0` disables wrapping. Never panics on malformed markup:
/// problems are reported on the outcome and parsing continues where possible.
pub fn layout<'a>(text: &'a str, config: &'a RenderConfig, bounds: Size) -> LayoutOutcome<'a> {
    layout_with_sink(text, config, bounds, |_| {})
}

/// [`layout`] that also hands each diagnostic to `sink` as it is reported.
pub fn layout_with_sink<'a, F>(
    text: &'a str,
    config: &'a RenderConfig,
    bounds: Size,
    sink: F,
) -> LayoutOutcome<'a>
where
    F: FnMut(&MarkupDiagnostic),
{
    let mut ctx = ParseContext::new(text, config, bounds, sink);
    let status = match ctx.run() {
        Ok(()) => ParseStatus::Complete,
        Err(err) => {
            ctx.report(err.clone());
            ParseStatus::Aborted(err)
        }
    };
    ctx.finish(status)
}

/// Attribute as written in the tag.
type Attributes<'a> = SmallVec<[(&'a str, &'a str); 4]>;

struct BlockquoteScope {
    first_line: usize,
}

/// Per-call parse scratch state.
struct ParseContext<'a, F> {
    text: &'a str,
    config: &'a RenderConfig,
    bounds: Size,
    sink: F,
    stack: TagStack<'a>,
    /// Finished lines.
    lines: Vec<Line<'a>>,
    /// Line currently receiving tokens.
    line: Line<'a>,
    backgrounds: Vec<BackgroundShape>,
    diagnostics: Vec<MarkupDiagnostic>,
    unclosed: Vec<&'a str>,
    list_depth: usize,
    list_counters: [u16; MAX_LIST_DEPTH],
    /// Deepest-level counters saved by lists nested past `MAX_LIST_DEPTH`,
    /// which share the deepest level's indentation and counter slot.
    overflow_lists: SmallVec<[u16; 2]>,
    blockquotes: SmallVec<[BlockquoteScope; 4]>,
    superscript_depth: u8,
    subscript_depth: u8,
    raw_depth: u8,
    /// First content after a raw-text tag drops one leading newline.
    raw_fresh: bool,
    marquee_depth: u8,
    /// Next token opens a segment even if its style matches.
    force_segment: bool,
}

impl<'a, F> ParseContext<'a, F>
where
    F: FnMut(&MarkupDiagnostic),
{
    fn new(text: &'a str, config: &'a RenderConfig, bounds: Size, sink: F) -> Self {
        Self {
            text,
            config,
            bounds,
            sink,
            stack: TagStack::new(StyleDescriptor::base(config)),
            lines: Vec::new(),
            line: Line::new(Offsets::default(), 0),
            backgrounds: Vec::new(),
            diagnostics: Vec::new(),
            unclosed: Vec::new(),
            list_depth: 0,
            list_counters: [0; MAX_LIST_DEPTH],
            overflow_lists: SmallVec::new(),
            blockquotes: SmallVec::new(),
            superscript_depth: 0,
            subscript_depth: 0,
            raw_depth: 0,
            raw_fresh: false,
            marquee_depth: 0,
            force_segment: false,
        }
    }

    fn run(&mut self) -> Result<(), MarkupError> {
        let bytes = self.text.as_bytes();
        let tag_start = self.config.delimiters.tag_start();
        let mut pos = 0;
        while pos < bytes.len() {
            if bytes[pos] == tag_start {
                pos = self.parse_tag(pos)?;
            } else {
                let end = find_byte(bytes, pos, tag_start);
                self.content(pos, end);
                pos = end;
            }
        }
        self.close_remaining();
        Ok(())
    }

    fn finish(mut self, status: ParseStatus) -> LayoutOutcome<'a> {
        if !self.line.segments.is_empty() {
            let fresh = self.new_line();
            let last = mem::replace(&mut self.line, fresh);
            self.lines.push(last);
            self.finalize_line(self.lines.len() - 1);
        }
        apply_marquee_width(&mut self.lines);

        let mut drawables = Drawables {
            lines: self.lines,
            backgrounds: self.backgrounds,
            size: Size::ZERO,
        };
        assemble(&mut drawables, self.config, self.bounds);
        debug!(
            "laid out {} lines ({} bytes, status={:?})",
            drawables.lines.len(),
            self.text.len(),
            status
        );
        LayoutOutcome {
            drawables,
            status,
            diagnostics: self.diagnostics,
            unclosed_tags: self.unclosed,
        }
    }

    fn report(&mut self, err: MarkupError) {
        let diag = MarkupDiagnostic::from_error(err);
        match diag.severity {
            Severity::Warning => warn!("markup: {}", diag.error),
            Severity::Fatal => error!("markup parse aborted: {}", diag.error),
        }
        (self.sink)(&diag);
        self.diagnostics.push(diag);
    }

    /// Parse the tag starting at `start` and return the index after it.
    fn parse_tag(&mut self, start: usize) -> Result<usize, MarkupError> {
        let text = self.text;
        let bytes = text.as_bytes();
        let delims = self.config.delimiters;
        let mut pos = start + 1;
        let closing = bytes.get(pos) == Some(&b'/');
        if closing {
            pos += 1;
        }
        let name_end = whole_word(text, pos);
        let name = &text[pos..name_end];

        if name.is_empty() {
            let next = bytes.get(name_end).copied();
            if !closing && next != Some(delims.tag_end()) {
                // Not a tag: `a < b`.
                let end = find_byte(bytes, start + 1, delims.tag_start());
                self.content(start, end);
                return Ok(end);
            }
            let end = self.tag_end(start, name_end)?;
            self.report(
                MarkupError::new(MarkupErrorKind::EmptyTagName, "tag without a name")
                    .with_offset(start),
            );
            return Ok(end);
        }

        if closing {
            let end = self.tag_end(start, name_end)?;
            self.close_tag(name, start)?;
            return Ok(end);
        }

        let mut attrs = Attributes::new();
        let (end, self_closing) = match self.parse_attributes(start, name_end, &mut attrs)? {
            Some(found) => found,
            None => {
                // Unterminated quote: skip to the next tag end.
                let end = self.tag_end(start, name_end)?;
                self.report(
                    MarkupError::new(
                        MarkupErrorKind::UnterminatedQuote,
                        "attribute value without closing quote",
                    )
                    .with_tag(name)
                    .with_offset(start),
                );
                return Ok(end);
            }
        };

        let kind = classify_tag(name);
        if kind == TagKind::Unknown {
            self.report(
                MarkupError::new(MarkupErrorKind::UnknownTag, format!("unsupported tag `<{}>`", name))
                    .with_tag(name)
                    .with_offset(start),
            );
            return Ok(end);
        }
        self.open_tag(name, kind, &attrs, start)?;
        if self_closing || kind.is_void() {
            self.close_top(true);
        }
        Ok(end)
    }

    /// Index after the tag end delimiter at or after `from`.
    fn tag_end(&self, start: usize, from: usize) -> Result<usize, MarkupError> {
        let bytes = self.text.as_bytes();
        let end = find_byte(bytes, from, self.config.delimiters.tag_end());
        if end >= bytes.len() {
            return Err(MarkupError::new(
                MarkupErrorKind::UnterminatedTag,
                "tag start without tag end",
            )
            .with_offset(start));
        }
        Ok(end + 1)
    }

    /// Scan `name[=value]` pairs. Returns the index after the tag and whether
    /// it was self-closing, or `None` on an unterminated quoted value.
    fn parse_attributes(
        &self,
        start: usize,
        from: usize,
        attrs: &mut Attributes<'a>,
    ) -> Result<Option<(usize, bool)>, MarkupError> {
        let text = self.text;
        let bytes = text.as_bytes();
        let tag_end = self.config.delimiters.tag_end();
        let mut pos = from;
        loop {
            pos = skip_space(text, pos);
            match bytes.get(pos) {
                None => {
                    return Err(MarkupError::new(
                        MarkupErrorKind::UnterminatedTag,
                        "tag start without tag end",
                    )
                    .with_offset(start))
                }
                Some(&b) if b == tag_end => return Ok(Some((pos + 1, false))),
                Some(b'/') if bytes.get(pos + 1) == Some(&tag_end) => {
                    return Ok(Some((pos + 2, true)))
                }
                _ => {}
            }
            let name_end = whole_word(text, pos);
            if name_end == pos {
                pos += text[pos..].chars().next().map_or(1, char::len_utf8);
                continue;
            }
            let name = &text[pos..name_end];
            pos = skip_space(text, name_end);
            let mut value = "";
            if bytes.get(pos) == Some(&b'=') {
                pos = skip_space(text, pos + 1);
                if matches!(bytes.get(pos), Some(b'"') | Some(b'\'')) {
                    let Some(quoted) = get_quoted_string(text, pos) else {
                        return Ok(None);
                    };
                    value = quoted.value;
                    pos = quoted.end;
                } else {
                    let value_end = scan_unquoted(bytes, pos, tag_end);
                    value = &text[pos..value_end];
                    pos = value_end;
                }
            }
            attrs.push((name, value));
        }
    }

    fn open_tag(
        &mut self,
        name: &'a str,
        kind: TagKind,
        attrs: &Attributes<'a>,
        offset: usize,
    ) -> Result<(), MarkupError> {
        let config = self.config;
        if kind.is_block() {
            self.break_line(false);
        }

        let parent = self.stack.current_style();
        let mut style = parent;
        let mut errors = SmallVec::<[MarkupError; 2]>::new();
        let changes = apply_attributes(&mut style, &parent, kind, attrs, config, &mut errors);
        apply_tag_defaults(&mut style, name, kind, changes, config, self.list_depth);
        if matches!(kind, TagKind::Subscript | TagKind::Superscript) {
            style.script_base_size.get_or_insert(parent.font.size);
        }
        style.resolve_font(config);
        for err in errors {
            self.report(err.with_offset(offset));
        }
        self.stack.push(name, kind)?.style = style;
        trace!("open <{}> depth={}", name, self.stack.depth());

        if kind.always_segments() {
            self.force_segment = true;
        }
        match kind {
            TagKind::Superscript => self.superscript_depth = self.superscript_depth.saturating_add(1),
            TagKind::Subscript => self.subscript_depth = self.subscript_depth.saturating_add(1),
            TagKind::RawText | TagKind::CodeBlock => {
                self.raw_depth = self.raw_depth.saturating_add(1);
                self.raw_fresh = true;
            }
            TagKind::List => {
                if self.list_depth == MAX_LIST_DEPTH {
                    let deepest = &mut self.list_counters[MAX_LIST_DEPTH - 1];
                    self.overflow_lists.push(mem::take(deepest));
                } else {
                    self.list_depth += 1;
                    self.list_counters[self.list_depth - 1] = 0;
                }
                self.refresh_line_offsets();
            }
            TagKind::ListItem => self.emit_bullet(style),
            TagKind::Blockquote => {
                self.blockquotes.push(BlockquoteScope {
                    first_line: self.lines.len(),
                });
                self.refresh_line_offsets();
                self.line.offset.top += config.blockquote_margin;
            }
            TagKind::Marquee => {
                self.marquee_depth = self.marquee_depth.saturating_add(1);
                self.line.marquee = true;
            }
            TagKind::Quotation => self.push_token(Token::text("\"")),
            TagKind::HorizontalRule => self.push_token(Token::new(TokenKind::HorizontalRule, "")),
            TagKind::LineBreak => self.break_line(true),
            TagKind::Meter => self.push_token(Token::new(TokenKind::Meter, "")),
            _ => {}
        }
        Ok(())
    }

    fn close_tag(&mut self, name: &'a str, offset: usize) -> Result<(), MarkupError> {
        let kind = classify_tag(name);
        if kind == TagKind::Unknown {
            self.report(
                MarkupError::new(MarkupErrorKind::UnknownTag, format!("unsupported tag `</{}>`", name))
                    .with_tag(name)
                    .with_offset(offset),
            );
            return Ok(());
        }
        if kind.is_void() {
            trace!("ignoring closing tag for void <{}>", name);
            return Ok(());
        }
        match self.stack.top() {
            Some(top) if are_same(top.name, name) => {
                self.close_top(false);
                Ok(())
            }
            top => {
                let message = match top {
                    Some(top) => format!("`</{}>` does not close `<{}>`", name, top.name),
                    None => format!("`</{}>` without an open tag", name),
                };
                Err(MarkupError::new(MarkupErrorKind::MismatchedClosingTag, message)
                    .with_tag(name)
                    .with_offset(offset))
            }
        }
    }

    /// Pop the innermost tag and run its close behaviour.
    fn close_top(&mut self, reset: bool) {
        if self.stack.top().map(|e| e.kind) == Some(TagKind::Quotation) {
            self.push_token(Token::text("\""));
        }
        let Some(entry) = self.stack.pop(reset) else {
            return;
        };
        trace!("close <{}> depth={}", entry.name, self.stack.depth());
        if entry.kind.always_segments() {
            self.force_segment = true;
        }
        match entry.kind {
            TagKind::Superscript => self.superscript_depth = self.superscript_depth.saturating_sub(1),
            TagKind::Subscript => self.subscript_depth = self.subscript_depth.saturating_sub(1),
            TagKind::RawText | TagKind::CodeBlock => {
                self.raw_depth = self.raw_depth.saturating_sub(1);
                self.break_line(false);
            }
            TagKind::List => {
                if let Some(saved) = self.overflow_lists.pop() {
                    self.list_counters[MAX_LIST_DEPTH - 1] = saved;
                } else if self.list_depth > 0 {
                    self.list_counters[self.list_depth - 1] = 0;
                    self.list_depth -= 1;
                }
                self.break_line(false);
            }
            TagKind::Blockquote => self.close_blockquote(),
            TagKind::Marquee => {
                self.marquee_depth = self.marquee_depth.saturating_sub(1);
                self.break_line(false);
            }
            TagKind::Header => {
                self.break_line(false);
                let style = self.stack.just_closed().map_or(entry.style, |e| e.style);
                self.push_token_styled(Token::new(TokenKind::HorizontalRule, ""), style);
                self.break_line(false);
            }
            TagKind::Paragraph | TagKind::ListItem | TagKind::HorizontalRule => {
                self.break_line(false)
            }
            _ => {}
        }
    }

    fn close_blockquote(&mut self) {
        let depth = self.blockquotes.len();
        let scope = self.blockquotes.pop();
        self.break_line(false);
        let Some(scope) = scope else {
            return;
        };
        let Some(last_line) = self.lines.len().checked_sub(1) else {
            return;
        };
        if last_line < scope.first_line {
            return;
        }
        if let Some(line) = self.lines.get_mut(last_line) {
            line.offset.bottom += self.config.blockquote_margin;
        }
        let depth = u8::try_from(depth).unwrap_or(u8::MAX);
        for (kind, color) in [
            (BackgroundKind::BlockquoteFill, self.config.blockquote_bg_color),
            (BackgroundKind::BlockquoteBar, self.config.blockquote_bar_color),
        ] {
            self.backgrounds.push(BackgroundShape {
                kind,
                bounds: BoundingBox::default(),
                color,
                depth,
                first_line: scope.first_line,
                last_line,
            });
        }
        // The next line sits outside this quote.
        self.refresh_line_offsets();
    }

    fn close_remaining(&mut self) {
        while let Some(top) = self.stack.top().copied() {
            self.report(
                MarkupError::new(
                    MarkupErrorKind::UnclosedTag,
                    format!("`<{}>` closed at end of input", top.name),
                )
                .with_tag(top.name),
            );
            self.unclosed.push(top.name);
            self.close_top(false);
        }
    }

    fn emit_bullet(&mut self, style: StyleDescriptor<'a>) {
        let depth = self.list_depth.max(1);
        let counter = &mut self.list_counters[depth - 1];
        *counter = counter.saturating_add(1).min(MAX_LIST_INDEX);
        let index = *counter;
        let kind = match style.list_style {
            BulletKind::None => return,
            BulletKind::Decimal => TokenKind::ListItemNumbered,
            _ => TokenKind::ListItemBullet,
        };
        let mut numbering = ListNumbering::new();
        if kind == TokenKind::ListItemNumbered {
            for value in &self.list_counters[..depth] {
                if write!(numbering, "{}.", value).is_err() {
                    break;
                }
            }
        }
        let mut token = Token::new(kind, "");
        token.has_space_after = true;
        token.list = Some(ListMarker {
            depth: u8::try_from(depth).unwrap_or(u8::MAX),
            index,
            numbering,
        });
        self.push_token(token);
    }

    fn content(&mut self, start: usize, end: usize) {
        if self.raw_depth > 0 {
            self.raw_content(start, end);
            return;
        }
        self.raw_fresh = false;
        let text = self.text;
        let bytes = text.as_bytes();
        let escape_start = self.config.delimiters.escape_start();
        let mut word_start: Option<usize> = None;
        let mut pos = start;
        while pos < end {
            let b = bytes[pos];
            if b.is_ascii_whitespace() {
                self.flush_word(&mut word_start, pos);
                self.mark_space();
                pos += 1;
                continue;
            }
            if b == escape_start {
                if let Some((name, next)) = self.escape_at(pos, end) {
                    self.flush_word(&mut word_start, pos);
                    self.expand_escape(pos, name, next);
                    pos = next;
                    continue;
                }
            }
            word_start.get_or_insert(pos);
            pos += 1;
        }
        self.flush_word(&mut word_start, end);
    }

    fn flush_word(&mut self, word_start: &mut Option<usize>, end: usize) {
        if let Some(start) = word_start.take() {
            self.push_token(Token::text(&self.text[start..end]));
        }
    }

    /// Verbatim content: every source line becomes one token.
    fn raw_content(&mut self, start: usize, end: usize) {
        let text = self.text;
        let bytes = text.as_bytes();
        let escape_start = self.config.delimiters.escape_start();
        let mut pos = start;
        if mem::take(&mut self.raw_fresh) {
            if text[start..end].starts_with("\r\n") {
                pos += 2;
            } else if text[start..end].starts_with('\n') {
                pos += 1;
            }
        }
        let mut run_start = pos;
        while pos < end {
            let b = bytes[pos];
            if b == b'\n' {
                self.flush_run(run_start, pos);
                if self.superscript_depth == 0 && self.subscript_depth == 0 {
                    self.break_line(true);
                }
                pos += 1;
                run_start = pos;
                continue;
            }
            if b == escape_start {
                if let Some((name, next)) = self.escape_at(pos, end) {
                    self.flush_run(run_start, pos);
                    self.expand_escape(pos, name, next);
                    pos = next;
                    run_start = pos;
                    continue;
                }
            }
            pos += 1;
        }
        self.flush_run(run_start, end);
    }

    fn flush_run(&mut self, start: usize, end: usize) {
        let run = self.text[start..end].trim_end_matches('\r');
        if !run.is_empty() {
            self.push_token(Token::text(run));
        }
    }

    /// Escape name and the index after the escape end delimiter.
    fn escape_at(&self, pos: usize, end: usize) -> Option<(&'a str, usize)> {
        let bytes = self.text.as_bytes();
        let escape_end = self.config.delimiters.escape_end();
        let limit = end.min(pos + 1 + MAX_ESCAPE_NAME + 1);
        let mut idx = pos + 1;
        while idx < limit && (bytes[idx].is_ascii_alphanumeric() || bytes[idx] == b'#') {
            idx += 1;
        }
        if idx == pos + 1 || idx >= limit || bytes[idx] != escape_end {
            return None;
        }
        Some((&self.text[pos + 1..idx], idx + 1))
    }

    fn expand_escape(&mut self, pos: usize, name: &'a str, next: usize) {
        let config = self.config;
        if name == NEW_LINE_ESCAPE {
            self.break_line(true);
            return;
        }
        if let Some(replacement) = config.escape_sequences.get(name) {
            self.push_token(Token::text(replacement.as_str()));
        } else if let Some(replacement) = resolve_predefined_entity(name) {
            self.push_token(Token::text(replacement));
        } else {
            self.report(
                MarkupError::new(
                    MarkupErrorKind::UnknownEscape,
                    format!("unknown escape sequence `{}`", name),
                )
                .with_tag(name)
                .with_offset(pos),
            );
            self.push_token(Token::text(&self.text[pos..next]));
        }
    }

    fn mark_space(&mut self) {
        if let Some(token) = self
            .line
            .segments
            .last_mut()
            .and_then(|seg| seg.tokens.last_mut())
        {
            token.has_space_after = true;
        }
    }

    fn push_token(&mut self, token: Token<'a>) {
        let style = self.stack.current_style();
        self.push_token_styled(token, style);
    }

    fn push_token_styled(&mut self, token: Token<'a>, style: StyleDescriptor<'a>) {
        let superscript = self.superscript_depth;
        let subscript = self.subscript_depth;
        let force = mem::take(&mut self.force_segment);
        let line = &mut self.line;
        let reuse = !force
            && line.segments.last().is_some_and(|seg| {
                seg.style == style
                    && seg.superscript_depth == superscript
                    && seg.subscript_depth == subscript
            });
        if !reuse {
            if line.segments.is_empty() {
                line.alignment = style.h_align;
            }
            let mut segment = Segment::new(style);
            segment.superscript_depth = superscript;
            segment.subscript_depth = subscript;
            line.segments.push(segment);
        }
        if let Some(segment) = line.segments.last_mut() {
            segment.tokens.push(token);
        }
    }

    /// End the current line.
    ///
    /// A non-explicit break on an empty line only refreshes its indentation,
    /// so consecutive block tags do not stack blank lines. An explicit break
    /// on an empty line keeps it as a blank row of the current font height.
    fn break_line(&mut self, explicit: bool) {
        if self.line.segments.is_empty() {
            if !explicit {
                self.refresh_line_offsets();
                return;
            }
            let mut blank = Segment::new(self.stack.current_style());
            blank.superscript_depth = self.superscript_depth;
            blank.subscript_depth = self.subscript_depth;
            self.line.segments.push(blank);
        }
        let fresh = self.new_line();
        let done = mem::replace(&mut self.line, fresh);
        self.lines.push(done);
        self.finalize_line(self.lines.len() - 1);
    }

    fn new_line(&self) -> Line<'a> {
        let mut line = Line::new(self.indentation(), self.blockquote_depth());
        line.marquee = self.marquee_depth > 0;
        line
    }

    fn refresh_line_offsets(&mut self) {
        let indent = self.indentation();
        self.line.offset.left = indent.left;
        self.line.blockquote_depth = self.blockquote_depth();
        self.line.marquee = self.marquee_depth > 0;
    }

    fn indentation(&self) -> Offsets {
        let config = self.config;
        Offsets {
            left: self.list_depth as f32 * config.list_indent
                + self.blockquotes.len() as f32 * config.blockquote_indent,
            ..Offsets::default()
        }
    }

    fn blockquote_depth(&self) -> u8 {
        u8::try_from(self.blockquotes.len()).unwrap_or(u8::MAX)
    }

    fn available_width(&self, line: &Line<'_>) -> f32 {
        if self.bounds.width <= 0.0 {
            return 0.0;
        }
        (self.bounds.width - line.offset.left - line.offset.right).max(0.0)
    }

    /// Measure, wrap and script-adjust a finished line.
    fn finalize_line(&mut self, index: usize) {
        let config = self.config;
        let Some(line) = self.lines.get(index) else {
            return;
        };
        let available = self.available_width(line);
        if let Some(line) = self.lines.get_mut(index) {
            measure_line(line, config, available);
        }
        let touched = perform_word_wrap(&mut self.lines, index, available, config);
        for &idx in &touched {
            if let Some(line) = self.lines.get_mut(idx) {
                line.refresh_flags();
            }
        }
        adjust_for_super_subscripts(&mut self.lines, &touched, config);
        for &idx in &touched {
            if let Some(line) = self.lines.get_mut(idx) {
                update_line_extent(line);
            }
        }
        trace!("finalized line {} into {} rows", index, touched.len());
    }
}

/// Apply attributes onto `style` and collect non-fatal problems.
fn apply_attributes<'a>(
    style: &mut StyleDescriptor<'a>,
    parent: &StyleDescriptor<'a>,
    kind: TagKind,
    attrs: &Attributes<'a>,
    config: &RenderConfig,
    errors: &mut SmallVec<[MarkupError; 2]>,
) -> StyleChanges {
    let mut changes = StyleChanges::NONE;
    for &(name, value) in attrs {
        if are_same(name, "style") {
            for declaration in value.split(';') {
                if declaration.trim().is_empty() {
                    continue;
                }
                let Some((prop, prop_value)) = declaration.split_once(':') else {
                    errors.push(
                        MarkupError::new(
                            MarkupErrorKind::InvalidPropertyValue,
                            format!("style declaration `{}` has no value", declaration.trim()),
                        )
                        .with_tag(declaration.trim()),
                    );
                    continue;
                };
                match populate_segment_style(style, parent, prop, prop_value, config) {
                    Ok(changed) => changes = changes.union(changed),
                    Err(err) => errors.push(err),
                }
            }
        } else if are_same(name, "width") || are_same(name, "height") {
            match populate_segment_style(style, parent, name, value, config) {
                Ok(changed) => changes = changes.union(changed),
                Err(err) => errors.push(err),
            }
        } else if are_same(name, "title") {
            style.tooltip = Some(value);
        } else if are_same(name, "href") && kind == TagKind::Hyperlink {
            style.link = Some(value);
        } else if kind == TagKind::Meter && are_same(name, "value") {
            style.gauge.value = extract_number(value, style.gauge.value);
        } else if kind == TagKind::Meter && are_same(name, "min") {
            style.gauge.min = extract_number(value, style.gauge.min);
        } else if kind == TagKind::Meter && are_same(name, "max") {
            style.gauge.max = extract_number(value, style.gauge.max);
        } else {
            trace!("ignoring attribute `{}`", name);
        }
    }
    changes
}

/// Tag-kind style injection; explicit properties win.
fn apply_tag_defaults(
    style: &mut StyleDescriptor<'_>,
    name: &str,
    kind: TagKind,
    changes: StyleChanges,
    config: &RenderConfig,
    list_depth: usize,
) {
    let unset = |prop| !changes.contains(prop);
    match kind {
        TagKind::Bold if unset(StyleProperty::FontWeight) => {
            style.font.bold = true;
            style.font.light = false;
        }
        TagKind::Italics if unset(StyleProperty::FontStyle) => style.font.italic = true,
        TagKind::Underline if unset(StyleProperty::TextDecoration) => {
            style.decoration.underline = true
        }
        TagKind::Strikethrough if unset(StyleProperty::TextDecoration) => {
            style.decoration.strikethrough = true
        }
        TagKind::Mark if unset(StyleProperty::Background) => style.bg = config.mark_bg_color,
        TagKind::Small if unset(StyleProperty::FontSize) => style.font.size *= SMALL_FONT_SCALE,
        TagKind::Header => {
            if unset(StyleProperty::FontSize) {
                style.font.size = config.heading_font_size(heading_level(name).unwrap_or(1));
            }
            if unset(StyleProperty::FontWeight) {
                style.font.bold = true;
            }
        }
        TagKind::RawText if unset(StyleProperty::FontFamily) => {
            style.font.family = FontFamily::Monospace
        }
        TagKind::CodeBlock => {
            if unset(StyleProperty::FontFamily) {
                style.font.family = FontFamily::Monospace;
            }
            if unset(StyleProperty::Background) {
                style.bg = config.code_bg_color;
            }
        }
        TagKind::Hyperlink => {
            if unset(StyleProperty::Color) {
                style.fg = config.link_color;
            }
            if unset(StyleProperty::TextDecoration) {
                style.decoration.underline = true;
            }
        }
        TagKind::Subscript | TagKind::Superscript if unset(StyleProperty::FontSize) => {
            style.font.size *= config.script_scale
        }
        TagKind::Blink => style.blink = true,
        TagKind::HorizontalRule if unset(StyleProperty::Color) => style.fg = config.hr_color,
        TagKind::List if unset(StyleProperty::ListStyle) => {
            style.list_style = if are_same(name, "ol") {
                BulletKind::Decimal
            } else {
                match list_depth {
                    0 => BulletKind::Disc,
                    1 => BulletKind::Circle,
                    _ => BulletKind::Square,
                }
            }
        }
        _ => {}
    }
}

fn apply_marquee_width(lines: &mut [Line<'_>]) {
    let widest = lines
        .iter()
        .filter(|l| l.marquee)
        .map(|l| l.content.width)
        .fold(0.0f32, f32::max);
    for line in lines.iter_mut().filter(|l| l.marquee) {
        line.content.width = widest;
    }
}

/// First index at or after `from` holding `needle`, or `bytes.len()`.
fn find_byte(bytes: &[u8], from: usize, needle: u8) -> usize {
    bytes
        .get(from..)
        .and_then(|rest| rest.iter().position(|&b| b == needle))
        .map_or(bytes.len(), |idx| from + idx)
}

fn scan_unquoted(bytes: &[u8], from: usize, tag_end: u8) -> usize {
    let mut idx = from;
    while idx < bytes.len() {
        let b = bytes[idx];
        if b.is_ascii_whitespace()
            || b == tag_end
            || (b == b'/' && bytes.get(idx + 1) == Some(&tag_end))
        {
            break;
        }
        idx += 1;
    }
    idx
}
