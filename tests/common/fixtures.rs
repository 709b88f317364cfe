use std::sync::Arc;

use rich_markup::{FontHandle, RenderConfig, Size, TextMeasurer};

pub const ARTICLE: &str = "<h2>Release notes</h2>\
<p>This build adds <b>bold</b>, <i>italic</i> and <u>underlined</u> text, \
<mark>highlights</mark> and <a href=\"https://example.com/notes\">links</a>.</p>\
<ul><li>Faster wrapping</li><li>Nested <sup>scripts</sup> and <sub>indices</sub></li></ul>\
<blockquote>Quoted text keeps its bar.</blockquote>\
<pre>let x = 1;\nlet y = 2;</pre>\
<p>Progress <meter value=\"3\" min=\"0\" max=\"4\"></p>";

pub const NESTED_LISTS: &str =
    "<ol><li>one</li><li>two<ol><li>nested</li></ol></li><li>three</li></ol>";

pub const MALFORMED: &[&str] = &[
    "<b>open",
    "<b>a</i>",
    "<>x",
    "<span style=\"color:#zzzzzz\">bad</span>",
    "<a href=\"unterminated>text",
    "<p",
    "&bogus; text",
    "</p>",
    "<unknown>x</unknown>",
];

/// Every glyph advances 8px; height follows the handle of the default
/// resolver.
pub struct FixedWidthMeasurer;

impl TextMeasurer for FixedWidthMeasurer {
    fn measure_text(&self, text: &str, font: FontHandle) -> Size {
        let size = rich_markup::DefaultFontResolver::size_px(font);
        Size::new(text.chars().count() as f32 * 8.0, size)
    }
}

pub fn fixed_width_config() -> RenderConfig {
    RenderConfig::default().with_text_measurer(Arc::new(FixedWidthMeasurer))
}

/// `paragraphs` paragraphs of mixed inline markup.
pub fn long_document(paragraphs: usize) -> String {
    let mut out = String::with_capacity(paragraphs * 160);
    for idx in 0..paragraphs {
        out.push_str("<p>Paragraph ");
        out.push_str(&idx.to_string());
        out.push_str(
            " has <b>bold</b> words, <i>italic</i> words and &amp; escapes \
             that wrap across several rows of the layout width.</p>",
        );
    }
    out
}
