//! Style descriptors and inline `style=` property resolution.

use crate::color::Color;
use crate::config::{FontHandle, FontRequest, RenderConfig};
use crate::error::{MarkupError, MarkupErrorKind};
use crate::primitives::{
    are_same, extract_float_with_unit, extract_number, has_number, try_extract_color,
};

/// Font family selection; concrete names come from the config at resolve time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontFamily<'a> {
    #[default]
    Default,
    Monospace,
    Named(&'a str),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontSpec<'a> {
    pub family: FontFamily<'a>,
    /// Pixel size after scaling.
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub light: bool,
    /// Handle from the config's font resolver for the fields above.
    pub handle: FontHandle,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextDecoration {
    pub underline: bool,
    pub strikethrough: bool,
}

/// Box padding in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Padding {
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// Horizontal placement of a line within the available width.
///
/// `Justify` is accepted and laid out like `Left`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Vertical placement of a segment within its line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VerticalAlignment {
    Top,
    #[default]
    Center,
    Bottom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BulletKind {
    #[default]
    Disc,
    Circle,
    Square,
    Triangle,
    Decimal,
    None,
    /// Drawn by the backend's custom bullet hook.
    Custom,
}

/// Meter value and range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaugeRange {
    pub value: f32,
    pub min: f32,
    pub max: f32,
}

impl Default for GaugeRange {
    fn default() -> Self {
        Self {
            value: 0.0,
            min: 0.0,
            max: 1.0,
        }
    }
}

impl GaugeRange {
    /// Filled fraction in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.value - self.min) / span).clamp(0.0, 1.0)
    }
}

/// Resolved style for one segment. Copied from the parent on tag open.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StyleDescriptor<'a> {
    pub font: FontSpec<'a>,
    pub decoration: TextDecoration,
    pub fg: Color,
    pub bg: Color,
    pub padding: Padding,
    pub h_align: HorizontalAlignment,
    pub v_align: VerticalAlignment,
    pub list_style: BulletKind,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub tooltip: Option<&'a str>,
    pub link: Option<&'a str>,
    pub gauge: GaugeRange,
    pub superscript_offset: f32,
    pub subscript_offset: f32,
    /// Font size outside the outermost `<sup>`/`<sub>`; `None` outside scripts.
    pub script_base_size: Option<f32>,
    pub blink: bool,
}

impl<'a> StyleDescriptor<'a> {
    /// Document root style.
    pub fn base(config: &RenderConfig) -> Self {
        let mut style = Self {
            font: FontSpec {
                family: FontFamily::Default,
                size: config.scaled_default_font_size(),
                bold: false,
                italic: false,
                light: false,
                handle: FontHandle::default(),
            },
            decoration: TextDecoration::default(),
            fg: config.default_fg_color,
            bg: config.default_bg_color,
            padding: Padding::default(),
            h_align: HorizontalAlignment::Left,
            v_align: VerticalAlignment::Center,
            list_style: BulletKind::Disc,
            width: None,
            height: None,
            tooltip: None,
            link: None,
            gauge: GaugeRange::default(),
            superscript_offset: 0.0,
            subscript_offset: 0.0,
            script_base_size: None,
            blink: false,
        };
        style.resolve_font(config);
        style
    }

    /// Refresh `font.handle` through the config's font resolver.
    pub fn resolve_font(&mut self, config: &RenderConfig) {
        let family = match self.font.family {
            FontFamily::Default => config.default_font_family.as_str(),
            FontFamily::Monospace => config.monospace_font_family.as_str(),
            FontFamily::Named(name) => name,
        };
        self.font.handle = config.font_resolver.resolve_font(&FontRequest {
            family,
            size_px: self.font.size,
            bold: self.font.bold,
            italic: self.font.italic,
            light: self.font.light,
        });
    }
}

/// One resolvable style property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StyleProperty {
    FontSize,
    FontWeight,
    FontFamily,
    FontStyle,
    Color,
    Background,
    Width,
    Height,
    HorizontalAlignment,
    VerticalAlignment,
    Padding,
    ListStyle,
    TextDecoration,
}

impl StyleProperty {
    /// Property for a CSS-like name, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        const NAMES: [(&str, StyleProperty); 17] = [
            ("font-size", StyleProperty::FontSize),
            ("font-weight", StyleProperty::FontWeight),
            ("font-family", StyleProperty::FontFamily),
            ("font-style", StyleProperty::FontStyle),
            ("color", StyleProperty::Color),
            ("background", StyleProperty::Background),
            ("background-color", StyleProperty::Background),
            ("width", StyleProperty::Width),
            ("height", StyleProperty::Height),
            ("text-align", StyleProperty::HorizontalAlignment),
            ("alignment", StyleProperty::HorizontalAlignment),
            ("vertical-align", StyleProperty::VerticalAlignment),
            ("padding", StyleProperty::Padding),
            ("list-style-type", StyleProperty::ListStyle),
            ("text-decoration", StyleProperty::TextDecoration),
            ("text-decoration-line", StyleProperty::TextDecoration),
            ("list-style", StyleProperty::ListStyle),
        ];
        let name = name.trim();
        if let Some((_, prop)) = NAMES.iter().find(|(known, _)| are_same(known, name)) {
            return Some(*prop);
        }
        let side = name.get(..8).filter(|head| are_same(head, "padding-"));
        side.and_then(|_| padding_side(&name[8..]))
            .map(|_| StyleProperty::Padding)
    }

    const fn bit(self) -> u16 {
        1 << (self as u8)
    }
}

/// Set of properties changed by one resolution pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StyleChanges(u16);

impl StyleChanges {
    pub const NONE: Self = Self(0);

    pub fn insert(&mut self, prop: StyleProperty) {
        self.0 |= prop.bit();
    }

    pub fn contains(self, prop: StyleProperty) -> bool {
        self.0 & prop.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn bits(self) -> u16 {
        self.0
    }
}

impl From<StyleProperty> for StyleChanges {
    fn from(prop: StyleProperty) -> Self {
        Self(prop.bit())
    }
}

const KEYWORD_SIZES: [(&str, f32); 8] = [
    ("xx-small", 0.6),
    ("x-small", 0.75),
    ("small", 0.89),
    ("medium", 1.0),
    ("large", 1.2),
    ("x-large", 1.5),
    ("xx-large", 2.0),
    ("xxx-large", 3.0),
];

/// Apply one `name: value` property to `style`.
///
/// Relative values (`em`, `%`, `larger`) resolve against `parent`. Returns
/// the changed property, or [`StyleChanges::NONE`] when the value equals
/// what the style already holds. Unknown names and unparseable values are
/// reported as warnings and leave `style` untouched, except colours: an
/// unreadable `color` or `background` still falls back to black.
///
/// The font handle is not refreshed; call [`StyleDescriptor::resolve_font`]
/// after the last property of a tag.
pub fn populate_segment_style<'a>(
    style: &mut StyleDescriptor<'a>,
    parent: &StyleDescriptor<'a>,
    name: &str,
    value: &'a str,
    config: &RenderConfig,
) -> Result<StyleChanges, MarkupError> {
    let prop = StyleProperty::from_name(name).ok_or_else(|| {
        MarkupError::new(
            MarkupErrorKind::UnknownProperty,
            format!("unsupported style property `{}`", name.trim()),
        )
        .with_tag(name.trim())
    })?;
    let value = value.trim();
    let before = *style;
    let applied = match prop {
        StyleProperty::FontSize => font_size(value, parent, config).map(|size| {
            style.font.size = size;
        }),
        StyleProperty::FontWeight => font_weight(value).map(|(bold, light)| {
            style.font.bold = bold;
            style.font.light = light;
        }),
        StyleProperty::FontFamily => font_family(value).map(|family| {
            style.font.family = family;
        }),
        StyleProperty::FontStyle => keyword(value, &[("italic", true), ("oblique", true), ("normal", false)])
            .map(|italic| style.font.italic = italic),
        StyleProperty::Color => {
            let parsed = try_extract_color(value, config.color_resolver());
            style.fg = parsed.unwrap_or(Color::BLACK);
            parsed.map(|_| ())
        }
        StyleProperty::Background => {
            let parsed = if are_same(value, "transparent") || are_same(value, "none") {
                Some(Color::TRANSPARENT)
            } else {
                try_extract_color(value, config.color_resolver())
            };
            style.bg = parsed.unwrap_or(Color::BLACK);
            parsed.map(|_| ())
        }
        StyleProperty::Width => {
            length(value, style.font.size, parent.width, config).map(|w| style.width = Some(w))
        }
        StyleProperty::Height => {
            length(value, style.font.size, parent.height, config).map(|h| style.height = Some(h))
        }
        StyleProperty::HorizontalAlignment => keyword(
            value,
            &[
                ("left", HorizontalAlignment::Left),
                ("start", HorizontalAlignment::Left),
                ("center", HorizontalAlignment::Center),
                ("right", HorizontalAlignment::Right),
                ("end", HorizontalAlignment::Right),
                ("justify", HorizontalAlignment::Justify),
            ],
        )
        .map(|align| style.h_align = align),
        StyleProperty::VerticalAlignment => keyword(
            value,
            &[
                ("top", VerticalAlignment::Top),
                ("middle", VerticalAlignment::Center),
                ("center", VerticalAlignment::Center),
                ("bottom", VerticalAlignment::Bottom),
            ],
        )
        .map(|align| style.v_align = align),
        StyleProperty::Padding => padding(name.trim(), value, style, config),
        StyleProperty::ListStyle => keyword(
            value,
            &[
                ("disc", BulletKind::Disc),
                ("circle", BulletKind::Circle),
                ("square", BulletKind::Square),
                ("triangle", BulletKind::Triangle),
                ("decimal", BulletKind::Decimal),
                ("none", BulletKind::None),
                ("custom", BulletKind::Custom),
            ],
        )
        .map(|kind| style.list_style = kind),
        StyleProperty::TextDecoration => text_decoration(value).map(|d| style.decoration = d),
    };
    if applied.is_none() {
        return Err(MarkupError::new(
            MarkupErrorKind::InvalidPropertyValue,
            format!("invalid value `{}` for `{}`", value, name.trim()),
        )
        .with_tag(name.trim()));
    }
    if *style == before {
        Ok(StyleChanges::NONE)
    } else {
        Ok(prop.into())
    }
}

fn keyword<T: Copy>(value: &str, table: &[(&str, T)]) -> Option<T> {
    table
        .iter()
        .find(|(name, _)| are_same(name, value))
        .map(|(_, out)| *out)
}

fn font_size(value: &str, parent: &StyleDescriptor<'_>, config: &RenderConfig) -> Option<f32> {
    if let Some(factor) = keyword(value, &KEYWORD_SIZES) {
        return Some(config.scaled_default_font_size() * factor);
    }
    if are_same(value, "larger") {
        return Some(parent.font.size * 1.2);
    }
    if are_same(value, "smaller") {
        return Some(parent.font.size / 1.2);
    }
    if !has_number(value) {
        return None;
    }
    let parent_size = parent.font.size;
    let size = extract_float_with_unit(value, parent_size, parent_size, parent_size, config.font_scale);
    (size > 0.0).then_some(size)
}

/// `(bold, light)` for a weight keyword or number.
fn font_weight(value: &str) -> Option<(bool, bool)> {
    if let Some(out) = keyword(
        value,
        &[
            ("bold", (true, false)),
            ("bolder", (true, false)),
            ("normal", (false, false)),
            ("light", (false, true)),
            ("lighter", (false, true)),
        ],
    ) {
        return Some(out);
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) || value.is_empty() {
        return None;
    }
    let weight = extract_number(value, 400.0);
    Some((weight >= 600.0, weight <= 300.0))
}

fn font_family(value: &str) -> Option<FontFamily<'_>> {
    let first = value.split(',').next()?.trim().trim_matches(|c| c == '"' || c == '\'');
    if first.is_empty() {
        return None;
    }
    if are_same(first, "monospace") {
        Some(FontFamily::Monospace)
    } else if are_same(first, "default") || are_same(first, "inherit") {
        Some(FontFamily::Default)
    } else {
        Some(FontFamily::Named(first))
    }
}

fn length(value: &str, ems: f32, parent: Option<f32>, config: &RenderConfig) -> Option<f32> {
    if !has_number(value) {
        return None;
    }
    let v = extract_float_with_unit(value, 0.0, ems, parent.unwrap_or(0.0), config.font_scale);
    (v >= 0.0).then_some(v)
}

#[derive(Clone, Copy)]
enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

fn padding_side(name: &str) -> Option<Side> {
    keyword(
        name,
        &[
            ("top", Side::Top),
            ("right", Side::Right),
            ("bottom", Side::Bottom),
            ("left", Side::Left),
        ],
    )
}

fn padding(name: &str, value: &str, style: &mut StyleDescriptor<'_>, config: &RenderConfig) -> Option<()> {
    let ems = style.font.size;
    let px = |part: &str| length(part, ems, None, config);
    if let Some(side) = name.get(8..).and_then(padding_side) {
        let v = px(value)?;
        match side {
            Side::Top => style.padding.top = v,
            Side::Right => style.padding.right = v,
            Side::Bottom => style.padding.bottom = v,
            Side::Left => style.padding.left = v,
        }
        return Some(());
    }
    let mut parts = [0.0f32; 4];
    let mut count = 0usize;
    for part in value.split_ascii_whitespace() {
        if count == 4 {
            return None;
        }
        parts[count] = px(part)?;
        count += 1;
    }
    let [t, r, b, l] = match count {
        1 => [parts[0]; 4],
        2 => [parts[0], parts[1], parts[0], parts[1]],
        3 => [parts[0], parts[1], parts[2], parts[1]],
        4 => parts,
        _ => return None,
    };
    style.padding = Padding {
        top: t,
        right: r,
        bottom: b,
        left: l,
    };
    Some(())
}

fn text_decoration(value: &str) -> Option<TextDecoration> {
    let mut out = TextDecoration::default();
    for word in value.split_ascii_whitespace() {
        if are_same(word, "underline") {
            out.underline = true;
        } else if are_same(word, "line-through") {
            out.strikethrough = true;
        } else if !are_same(word, "none") {
            return None;
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve<'a>(
        parent: &StyleDescriptor<'a>,
        name: &str,
        value: &'a str,
        config: &RenderConfig,
    ) -> (StyleDescriptor<'a>, Result<StyleChanges, MarkupError>) {
        let mut style = *parent;
        let result = populate_segment_style(&mut style, parent, name, value, config);
        (style, result)
    }

    #[test]
    fn keyword_sizes_scale_default() {
        let mut config = RenderConfig::default();
        config.font_scale = 2.0;
        let parent = StyleDescriptor::base(&config);
        let (style, changes) = resolve(&parent, "font-size", "xx-large", &config);
        assert_eq!(style.font.size, 64.0);
        assert!(changes.unwrap().contains(StyleProperty::FontSize));
    }

    #[test]
    fn unreadable_colour_falls_back_to_black_and_reports() {
        let config = RenderConfig::default();
        let mut parent = StyleDescriptor::base(&config);
        parent.fg = Color::rgb(0, 0, 255);
        let (style, result) = resolve(&parent, "color", "#zzzzzz", &config);
        assert_eq!(style.fg, Color::BLACK);
        let err = result.unwrap_err();
        assert_eq!(err.kind, MarkupErrorKind::InvalidPropertyValue);

        let (style, result) = resolve(&parent, "background", "not-a-colour", &config);
        assert_eq!(style.bg, Color::BLACK);
        assert!(result.is_err());

        let (style, result) = resolve(&parent, "background", "transparent", &config);
        assert_eq!(style.bg, Color::TRANSPARENT);
        assert!(result.is_ok());
    }

    #[test]
    fn relative_sizes_use_parent() {
        let config = RenderConfig::default();
        let mut parent = StyleDescriptor::base(&config);
        parent.font.size = 20.0;
        assert_eq!(resolve(&parent, "font-size", "150%", &config).0.font.size, 30.0);
        assert_eq!(resolve(&parent, "Font-Size", "2em", &config).0.font.size, 40.0);
        assert_eq!(resolve(&parent, "font-size", "12px", &config).0.font.size, 12.0);
    }

    #[test]
    fn unchanged_value_reports_no_change() {
        let config = RenderConfig::default();
        let parent = StyleDescriptor::base(&config);
        let (_, changes) = resolve(&parent, "font-weight", "normal", &config);
        assert_eq!(changes.unwrap(), StyleChanges::NONE);
    }

    #[test]
    fn unknown_property_is_a_warning() {
        let config = RenderConfig::default();
        let parent = StyleDescriptor::base(&config);
        let (style, result) = resolve(&parent, "border", "1px solid", &config);
        let err = result.unwrap_err();
        assert_eq!(err.kind, MarkupErrorKind::UnknownProperty);
        assert_eq!(style, parent);
    }

    #[test]
    fn invalid_value_leaves_style() {
        let config = RenderConfig::default();
        let parent = StyleDescriptor::base(&config);
        let (style, result) = resolve(&parent, "text-align", "sideways", &config);
        assert_eq!(result.unwrap_err().kind, MarkupErrorKind::InvalidPropertyValue);
        assert_eq!(style, parent);
    }

    #[test]
    fn colors_and_weights() {
        let config = RenderConfig::default();
        let parent = StyleDescriptor::base(&config);
        assert_eq!(resolve(&parent, "color", "red", &config).0.fg, Color::rgb(255, 0, 0));
        assert_eq!(
            resolve(&parent, "background-color", "#00f", &config).0.bg,
            Color::rgb(0, 0, 255)
        );
        assert!(resolve(&parent, "font-weight", "700", &config).0.font.bold);
        assert!(resolve(&parent, "font-weight", "lighter", &config).0.font.light);
        assert!(resolve(&parent, "font-style", "italic", &config).0.font.italic);
    }

    #[test]
    fn padding_shorthand_and_sides() {
        let config = RenderConfig::default();
        let parent = StyleDescriptor::base(&config);
        let (style, _) = resolve(&parent, "padding", "1 2 3", &config);
        assert_eq!(
            style.padding,
            Padding {
                top: 1.0,
                right: 2.0,
                bottom: 3.0,
                left: 2.0
            }
        );
        let (style, changes) = resolve(&parent, "padding-left", "5px", &config);
        assert_eq!(style.padding.left, 5.0);
        assert!(changes.unwrap().contains(StyleProperty::Padding));
    }

    #[test]
    fn misc_keywords() {
        let config = RenderConfig::default();
        let parent = StyleDescriptor::base(&config);
        assert_eq!(
            resolve(&parent, "text-align", "center", &config).0.h_align,
            HorizontalAlignment::Center
        );
        assert_eq!(
            resolve(&parent, "vertical-align", "bottom", &config).0.v_align,
            VerticalAlignment::Bottom
        );
        assert_eq!(
            resolve(&parent, "list-style-type", "square", &config).0.list_style,
            BulletKind::Square
        );
        let deco = resolve(&parent, "text-decoration", "underline line-through", &config).0;
        assert!(deco.decoration.underline && deco.decoration.strikethrough);
        assert_eq!(
            resolve(&parent, "font-family", "'Fira Code', monospace", &config).0.font.family,
            FontFamily::Named("Fira Code")
        );
    }

    #[test]
    fn gauge_fraction_clamps() {
        let g = GaugeRange {
            value: 15.0,
            min: 0.0,
            max: 10.0,
        };
        assert_eq!(g.fraction(), 1.0);
        assert_eq!(GaugeRange::default().fraction(), 0.0);
    }
}
