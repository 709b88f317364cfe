//! Render configuration, capability seams, and the nested configuration stack.

use core::fmt;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::color::Color;
use crate::drawables::Size;

/// Opaque font identity returned by a [`FontResolver`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FontHandle(pub u32);

/// Font lookup request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontRequest<'a> {
    /// Concrete family name (config defaults already substituted).
    pub family: &'a str,
    /// Pixel size after scaling.
    pub size_px: f32,
    pub bold: bool,
    pub italic: bool,
    pub light: bool,
}

/// Font resolution hook. Nearest-size fallback belongs to the implementor.
pub trait FontResolver: Send + Sync {
    fn resolve_font(&self, request: &FontRequest<'_>) -> FontHandle;
}

/// Text measurement hook supplied by the embedding renderer.
pub trait TextMeasurer: Send + Sync {
    /// Measure the pixel size of `text` drawn with `font`.
    fn measure_text(&self, text: &str, font: FontHandle) -> Size;
}

/// Named colour resolution hook (case-insensitive names).
pub trait ColorResolver: Send + Sync {
    fn resolve_color(&self, name: &str) -> Option<Color>;
}

/// Resolver that packs size and style flags into the handle.
///
/// Layout: bits 0..=15 hold the pixel size times 4, bit 16 bold, bit 17
/// italic, bit 18 light. Family is ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultFontResolver;

impl DefaultFontResolver {
    const BOLD: u32 = 1 << 16;
    const ITALIC: u32 = 1 << 17;
    const LIGHT: u32 = 1 << 18;

    /// Pixel size encoded in a handle produced by this resolver.
    pub fn size_px(handle: FontHandle) -> f32 {
        (handle.0 & 0xFFFF) as f32 / 4.0
    }

    /// Bold flag encoded in a handle produced by this resolver.
    pub fn is_bold(handle: FontHandle) -> bool {
        handle.0 & Self::BOLD != 0
    }

    /// Italic flag encoded in a handle produced by this resolver.
    pub fn is_italic(handle: FontHandle) -> bool {
        handle.0 & Self::ITALIC != 0
    }
}

impl FontResolver for DefaultFontResolver {
    fn resolve_font(&self, request: &FontRequest<'_>) -> FontHandle {
        let quarter_px = (request.size_px.max(0.0) * 4.0).round().min(65535.0) as u32;
        let mut id = quarter_px;
        if request.bold {
            id |= Self::BOLD;
        }
        if request.italic {
            id |= Self::ITALIC;
        }
        if request.light {
            id |= Self::LIGHT;
        }
        FontHandle(id)
    }
}

/// The sixteen HTML 4 colour keywords.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicColorNames;

impl ColorResolver for BasicColorNames {
    fn resolve_color(&self, name: &str) -> Option<Color> {
        const TABLE: [(&str, Color); 16] = [
            ("black", Color::rgb(0, 0, 0)),
            ("silver", Color::rgb(192, 192, 192)),
            ("gray", Color::rgb(128, 128, 128)),
            ("white", Color::rgb(255, 255, 255)),
            ("maroon", Color::rgb(128, 0, 0)),
            ("red", Color::rgb(255, 0, 0)),
            ("purple", Color::rgb(128, 0, 128)),
            ("fuchsia", Color::rgb(255, 0, 255)),
            ("green", Color::rgb(0, 128, 0)),
            ("lime", Color::rgb(0, 255, 0)),
            ("olive", Color::rgb(128, 128, 0)),
            ("yellow", Color::rgb(255, 255, 0)),
            ("navy", Color::rgb(0, 0, 128)),
            ("blue", Color::rgb(0, 0, 255)),
            ("teal", Color::rgb(0, 128, 128)),
            ("aqua", Color::rgb(0, 255, 255)),
        ];
        let name = name.trim();
        TABLE
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, color)| *color)
    }
}

/// Tag and escape delimiters. Always ASCII, so the parser can split the
/// source at any delimiter byte without landing inside a character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delimiters {
    tag_start: u8,
    tag_end: u8,
    escape_start: u8,
    escape_end: u8,
}

impl Delimiters {
    /// `None` unless all four characters are ASCII.
    pub fn new(
        tag_start: char,
        tag_end: char,
        escape_start: char,
        escape_end: char,
    ) -> Option<Self> {
        let byte = |c: char| u8::try_from(c).ok().filter(u8::is_ascii);
        Some(Self {
            tag_start: byte(tag_start)?,
            tag_end: byte(tag_end)?,
            escape_start: byte(escape_start)?,
            escape_end: byte(escape_end)?,
        })
    }

    pub fn tag_start(&self) -> u8 {
        self.tag_start
    }

    pub fn tag_end(&self) -> u8 {
        self.tag_end
    }

    pub fn escape_start(&self) -> u8 {
        self.escape_start
    }

    pub fn escape_end(&self) -> u8 {
        self.escape_end
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            tag_start: b'<',
            tag_end: b'>',
            escape_start: b'&',
            escape_end: b';',
        }
    }
}

/// Escape name that forces a line break instead of substituting text.
pub(crate) const NEW_LINE_ESCAPE: &str = "NewLine";

/// Read-mostly layout configuration.
#[derive(Clone)]
pub struct RenderConfig {
    /// Markup delimiters.
    pub delimiters: Delimiters,
    /// Escape name to replacement text (`&name;`).
    pub escape_sequences: BTreeMap<String, String>,
    /// Global multiplier for configured and absolute font sizes.
    pub font_scale: f32,
    /// Base font size in pixels before `font_scale`.
    pub default_font_size: f32,
    /// Family used when no `font-family` applies.
    pub default_font_family: String,
    /// Family used for `<pre>`, `<samp>`, `<code>`.
    pub monospace_font_family: String,
    /// `<h1>`..`<h6>` sizes in pixels before `font_scale`.
    pub heading_font_sizes: [f32; 6],
    pub default_fg_color: Color,
    pub default_bg_color: Color,
    pub link_color: Color,
    pub mark_bg_color: Color,
    pub code_bg_color: Color,
    pub hr_color: Color,
    pub blockquote_bar_color: Color,
    pub blockquote_bg_color: Color,
    pub meter_bg_color: Color,
    pub meter_fg_color: Color,
    /// Vertical gap between consecutive lines.
    pub line_gap: f32,
    /// Horizontal indent per list nesting level.
    pub list_indent: f32,
    /// Bullet diameter as a fraction of the font size.
    pub bullet_scale: f32,
    /// Horizontal indent per blockquote nesting level.
    pub blockquote_indent: f32,
    /// Vertical margin added when entering or leaving a blockquote level.
    pub blockquote_margin: f32,
    /// Width of the blockquote bar.
    pub blockquote_bar_width: f32,
    /// Rule thickness for `<hr>` and heading underlines.
    pub hr_thickness: f32,
    /// Space above and below a rule.
    pub hr_vertical_margin: f32,
    /// Font scale applied per sub/superscript nesting level.
    pub script_scale: f32,
    /// Meter size when `width`/`height` are not given.
    pub meter_default_size: Size,
    /// Re-flow lines that exceed the available width.
    pub word_wrap: bool,
    pub text_measurer: Option<Arc<dyn TextMeasurer>>,
    pub font_resolver: Arc<dyn FontResolver>,
    pub color_resolver: Option<Arc<dyn ColorResolver>>,
}

impl fmt::Debug for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderConfig")
            .field("delimiters", &self.delimiters)
            .field("escape_sequences", &self.escape_sequences.len())
            .field("font_scale", &self.font_scale)
            .field("default_font_size", &self.default_font_size)
            .field("default_font_family", &self.default_font_family)
            .field("word_wrap", &self.word_wrap)
            .field("has_text_measurer", &self.text_measurer.is_some())
            .field("has_color_resolver", &self.color_resolver.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        let mut escape_sequences = BTreeMap::new();
        for (name, value) in [
            (NEW_LINE_ESCAPE, "\n"),
            ("Tab", "    "),
            ("nbsp", "\u{00A0}"),
            ("copy", "\u{00A9}"),
            ("reg", "\u{00AE}"),
            ("trade", "\u{2122}"),
            ("hellip", "\u{2026}"),
            ("mdash", "\u{2014}"),
            ("ndash", "\u{2013}"),
        ] {
            escape_sequences.insert(name.to_string(), value.to_string());
        }
        Self {
            delimiters: Delimiters::default(),
            escape_sequences,
            font_scale: 1.0,
            default_font_size: 16.0,
            default_font_family: "sans-serif".to_string(),
            monospace_font_family: "monospace".to_string(),
            heading_font_sizes: [32.0, 24.0, 20.0, 18.0, 16.0, 14.0],
            default_fg_color: Color::BLACK,
            default_bg_color: Color::TRANSPARENT,
            link_color: Color::rgb(0, 0, 238),
            mark_bg_color: Color::rgb(255, 255, 0),
            code_bg_color: Color::rgb(230, 230, 230),
            hr_color: Color::rgb(128, 128, 128),
            blockquote_bar_color: Color::rgb(160, 160, 160),
            blockquote_bg_color: Color::rgba(0, 0, 0, 16),
            meter_bg_color: Color::rgb(200, 200, 200),
            meter_fg_color: Color::rgb(0, 160, 0),
            line_gap: 4.0,
            list_indent: 24.0,
            bullet_scale: 0.4,
            blockquote_indent: 16.0,
            blockquote_margin: 6.0,
            blockquote_bar_width: 4.0,
            hr_thickness: 1.0,
            hr_vertical_margin: 4.0,
            script_scale: 0.62,
            meter_default_size: Size::new(80.0, 16.0),
            word_wrap: true,
            text_measurer: None,
            font_resolver: Arc::new(DefaultFontResolver),
            color_resolver: Some(Arc::new(BasicColorNames)),
        }
    }
}

impl RenderConfig {
    /// Install a text measurer for width-accurate wrapping.
    pub fn with_text_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.text_measurer = Some(measurer);
        self
    }

    /// Install a font resolver.
    pub fn with_font_resolver(mut self, resolver: Arc<dyn FontResolver>) -> Self {
        self.font_resolver = resolver;
        self
    }

    /// Install a named colour resolver.
    pub fn with_color_resolver(mut self, resolver: Arc<dyn ColorResolver>) -> Self {
        self.color_resolver = Some(resolver);
        self
    }

    /// Replace the markup delimiters.
    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    /// Toggle word wrapping.
    pub fn with_word_wrap(mut self, enabled: bool) -> Self {
        self.word_wrap = enabled;
        self
    }

    /// Register or replace an escape sequence.
    pub fn with_escape(mut self, name: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.escape_sequences.insert(name.into(), replacement.into());
        self
    }

    /// Default font size after scaling.
    pub fn scaled_default_font_size(&self) -> f32 {
        self.default_font_size * self.font_scale
    }

    /// Heading size for level 1..=6 after scaling.
    pub fn heading_font_size(&self, level: u8) -> f32 {
        let idx = usize::from(level.clamp(1, 6) - 1);
        self.heading_font_sizes[idx] * self.font_scale
    }

    pub(crate) fn color_resolver(&self) -> Option<&dyn ColorResolver> {
        self.color_resolver.as_deref()
    }
}

static NEXT_CONFIG_VERSION: AtomicU64 = AtomicU64::new(1);

fn next_config_version() -> u64 {
    NEXT_CONFIG_VERSION.fetch_add(1, Ordering::Relaxed)
}

/// Nested configuration scopes with a mutation counter.
///
/// [`ConfigStack::current`] returns the innermost pushed configuration or the
/// default one. Every push, pop and mutable access bumps the version used by
/// [`crate::CacheKey`]. Versions are drawn from one process-wide counter, so
/// two stacks only share a version when one is a clone of the other.
#[derive(Clone, Debug)]
pub struct ConfigStack {
    default: RenderConfig,
    scopes: Vec<RenderConfig>,
    version: u64,
}

impl ConfigStack {
    /// Stack with an explicit default configuration.
    pub fn new(default: RenderConfig) -> Self {
        Self {
            default,
            scopes: Vec::with_capacity(0),
            version: next_config_version(),
        }
    }

    /// Enter an override scope.
    pub fn push(&mut self, config: RenderConfig) {
        self.scopes.push(config);
        self.bump();
    }

    /// Leave the innermost override scope.
    pub fn pop(&mut self) -> Option<RenderConfig> {
        let popped = self.scopes.pop();
        if popped.is_some() {
            self.bump();
        }
        popped
    }

    /// Active configuration.
    pub fn current(&self) -> &RenderConfig {
        self.scopes.last().unwrap_or(&self.default)
    }

    /// Mutable access to the active configuration; bumps the version.
    pub fn current_mut(&mut self) -> &mut RenderConfig {
        self.bump();
        match self.scopes.last_mut() {
            Some(top) => top,
            None => &mut self.default,
        }
    }

    /// Number of pushed override scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Monotonic mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    fn bump(&mut self) {
        self.version = next_config_version();
    }
}

impl Default for ConfigStack {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_font_resolver_encodes_style() {
        let handle = DefaultFontResolver.resolve_font(&FontRequest {
            family: "serif",
            size_px: 18.5,
            bold: true,
            italic: false,
            light: false,
        });
        assert_eq!(DefaultFontResolver::size_px(handle), 18.5);
        assert!(DefaultFontResolver::is_bold(handle));
        assert!(!DefaultFontResolver::is_italic(handle));
    }

    #[test]
    fn basic_color_names_ignore_case() {
        assert_eq!(
            BasicColorNames.resolve_color("Red"),
            Some(Color::rgb(255, 0, 0))
        );
        assert_eq!(BasicColorNames.resolve_color(" NAVY "), Some(Color::rgb(0, 0, 128)));
        assert_eq!(BasicColorNames.resolve_color("cornflowerblue"), None);
    }

    #[test]
    fn config_stack_resolves_innermost_scope() {
        let mut stack = ConfigStack::default();
        assert_eq!(stack.current().default_font_size, 16.0);
        let mut large = RenderConfig::default();
        large.default_font_size = 30.0;
        stack.push(large);
        assert_eq!(stack.current().default_font_size, 30.0);
        assert_eq!(stack.depth(), 1);
        stack.pop();
        assert_eq!(stack.current().default_font_size, 16.0);
        assert!(stack.pop().is_none());
    }

    #[test]
    fn config_stack_version_tracks_mutation() {
        let mut stack = ConfigStack::default();
        let v0 = stack.version();
        stack.current_mut().font_scale = 2.0;
        let v1 = stack.version();
        assert!(v1 > v0);
        stack.push(RenderConfig::default());
        assert!(stack.version() > v1);
        let v2 = stack.version();
        let _ = stack.current();
        assert_eq!(stack.version(), v2);
    }

    #[test]
    fn separate_stacks_never_share_a_version() {
        let a = ConfigStack::default();
        let mut b = ConfigStack::default();
        assert_ne!(a.version(), b.version());
        b.push(RenderConfig::default());
        b.pop();
        assert_ne!(a.version(), b.version());
        assert_eq!(a.clone().version(), a.version());
    }

    #[test]
    fn delimiters_must_be_ascii() {
        assert!(Delimiters::new('«', '»', '&', ';').is_none());
        assert!(Delimiters::new('[', ']', '\u{e9}', ';').is_none());
        let square = Delimiters::new('[', ']', '&', ';').expect("ascii");
        assert_eq!((square.tag_start(), square.tag_end()), (b'[', b']'));
        assert_eq!(Delimiters::new('<', '>', '&', ';'), Some(Delimiters::default()));
    }

    #[test]
    fn heading_sizes_scale() {
        let mut cfg = RenderConfig::default();
        cfg.font_scale = 2.0;
        assert_eq!(cfg.heading_font_size(1), 64.0);
        assert_eq!(cfg.heading_font_size(9), 28.0);
        assert_eq!(cfg.scaled_default_font_size(), 32.0);
    }
}
