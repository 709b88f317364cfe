//! Zero-copy rich-text markup layout for immediate-mode GUIs.
//!
//! `rich-markup` parses a constrained HTML-like markup subset into styled,
//! word-wrapped lines of positioned tokens. Text is never copied: every token
//! borrows its content from the source buffer (or from the escape table of the
//! active [`RenderConfig`]). Drawing is left to a presentation layer such as
//! `rich-markup-render`.
//!
//! ```
//! use rich_markup::{layout, RenderConfig, Size};
//!
//! let config = RenderConfig::default();
//! let outcome = layout("<p>Hello <b>World</b></p>", &config, Size::new(320.0, 0.0));
//! assert!(outcome.is_complete());
//! assert_eq!(outcome.drawables.plain_text(), "Hello World");
//! ```

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

mod assembly;
mod cache;
mod color;
mod config;
mod drawables;
mod error;
mod parser;
pub mod primitives;
mod style;
mod tags;
mod wrap;

pub use assembly::{assemble, measure_line};
pub use cache::CacheKey;
pub use color::Color;
pub use config::{
    BasicColorNames, ColorResolver, ConfigStack, DefaultFontResolver, Delimiters, FontHandle,
    FontRequest, FontResolver, RenderConfig, TextMeasurer,
};
pub use drawables::{
    BackgroundKind, BackgroundShape, BoundingBox, Drawables, HitTarget, Line, ListMarker,
    ListNumbering, Offsets, Segment, Size, Token, TokenKind,
};
pub use error::{MarkupDiagnostic, MarkupError, MarkupErrorKind, Severity};
pub use parser::{layout, layout_with_sink, LayoutOutcome, ParseStatus};
pub use style::{
    populate_segment_style, BulletKind, FontFamily, FontSpec, GaugeRange, HorizontalAlignment,
    Padding, StyleChanges, StyleDescriptor, StyleProperty, TextDecoration, VerticalAlignment,
};
pub use tags::{classify_tag, heading_level, TagKind, TagStack, TagStackEntry, MAX_TAG_DEPTH};
pub use wrap::{adjust_for_super_subscripts, nested_script_offset, perform_word_wrap};
