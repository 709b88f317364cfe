//! Draw commands, backend interface, and render orchestration for `rich-markup`.
//!
//! Layout output is converted into an owned [`CommandList`] that can be
//! cached, exported as JSON, and replayed on any [`DrawBackend`]. Blink and
//! marquee animation are applied at replay time from a [`FrameClock`].

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

mod render_backend;
mod render_engine;
mod render_ir;

pub use render_backend::{execute_commands, DrawBackend, FrameClock};
pub use render_engine::{
    FileRenderCacheStore, MemoryRenderCache, PreparedText, RenderCacheStore, RenderDiagnostic,
    RichTextRenderer,
};
pub use render_ir::{
    BulletCommand, BulletShape, CommandList, DrawCommand, HitRegion, MarqueeCommand, MeterCommand,
    Point, Rect, RectCommand, RuleCommand, TextCommand,
};
pub use rich_markup::{CacheKey, Color, FontHandle, RenderConfig, Size};
