mod common;

use common::fixtures::{fixed_width_config, long_document, ARTICLE, MALFORMED, NESTED_LISTS};
use rich_markup::primitives::{extract_color, extract_float_with_unit};
use rich_markup::{
    classify_tag, layout, perform_word_wrap, Color, MarkupErrorKind, ParseStatus, RenderConfig,
    Severity, Size, TagKind, TokenKind,
};

const WIDTH: f32 = 240.0;

#[test]
fn classify_tag_is_total() {
    for name in ["b", "STRONG", "h3", "meter", "div", "", "h9", "bb", "ß"] {
        let kind = classify_tag(name);
        let known = !matches!(kind, TagKind::Unknown);
        assert_eq!(
            known,
            ["b", "STRONG", "h3", "meter"].contains(&name),
            "{name}"
        );
    }
}

#[test]
fn colour_inherits_through_nested_spans() {
    let config = RenderConfig::default();
    let out = layout(
        "<span style=\"color:#00ff00\">a<span>b<span>c<b>deep</b></span></span></span>",
        &config,
        Size::new(WIDTH, 0.0),
    );
    assert!(out.is_complete());
    let green = Color::rgb(0, 255, 0);
    let segments = &out.drawables.lines[0].segments;
    assert!(segments.iter().all(|s| s.style.fg == green));
    assert!(segments.last().is_some_and(|s| s.style.font.bold));
}

#[test]
fn well_formed_markup_balances_the_stack() {
    let config = fixed_width_config();
    for markup in [ARTICLE, NESTED_LISTS, "<q>x</q><br/><hr/>"] {
        let out = layout(markup, &config, Size::new(WIDTH, 0.0));
        assert!(out.is_complete(), "{markup}");
        assert!(out.unclosed_tags.is_empty(), "{markup}");
        assert!(
            out.diagnostics.is_empty(),
            "{markup}: {:?}",
            out.diagnostics
        );
    }
}

#[test]
fn wrapped_lines_do_not_split_again() {
    let config = fixed_width_config();
    let doc = long_document(3);
    let out = layout(&doc, &config, Size::new(WIDTH, 0.0));
    let mut lines = out.drawables.lines;
    assert!(lines.len() > 3, "paragraphs should wrap");
    let before = lines.len();
    for idx in 0..before {
        let available = WIDTH - lines[idx].offset.left - lines[idx].offset.right;
        let touched = perform_word_wrap(&mut lines, idx, available, &config);
        assert_eq!(touched.as_slice(), &[idx]);
    }
    assert_eq!(lines.len(), before);
}

#[test]
fn wrapped_rows_fit_the_width() {
    let config = fixed_width_config();
    let doc = long_document(5);
    let out = layout(&doc, &config, Size::new(WIDTH, 0.0));
    for line in &out.drawables.lines {
        // A lone token may overflow; every multi-token row fits.
        if line.token_count() > 1 {
            assert!(line.content.width <= WIDTH, "{}", line.content.width);
        }
    }
}

#[test]
fn unit_and_colour_extraction() {
    assert_eq!(extract_float_with_unit("2em", 0.0, 24.0, 0.0, 1.0), 48.0);
    let percent = extract_float_with_unit("150%", 0.0, 0.0, 10.0, 1.0);
    assert!((percent - 15.0).abs() < 1e-4, "{percent}");
    let pt = extract_float_with_unit("12pt", 0.0, 0.0, 0.0, 1.0);
    assert!((pt - 16.0).abs() < 0.01, "{pt}");

    let red = Color::rgb(255, 0, 0);
    assert_eq!(extract_color("rgb(255, 0, 0)", None), red);
    assert_eq!(extract_color("#ff0000", None), red);
    let half = extract_color("rgba(0,0,0,0.5)", None);
    assert_eq!((half.r, half.g, half.b), (0, 0, 0));
    assert!((i32::from(half.a) - 128).abs() <= 1, "{}", half.a);
}

#[test]
fn nested_ordered_lists_number_hierarchically() {
    let config = RenderConfig::default();
    let out = layout(NESTED_LISTS, &config, Size::new(WIDTH, 0.0));
    let numbers: Vec<&str> = out
        .drawables
        .lines
        .iter()
        .flat_map(|l| l.segments.iter().flat_map(|s| s.tokens.iter()))
        .filter(|t| t.kind == TokenKind::ListItemNumbered)
        .map(|t| t.display_text())
        .collect();
    assert_eq!(numbers, ["1.", "2.", "2.1.", "3."]);
    assert_eq!(
        out.drawables.plain_text(),
        "1. one\n2. two\n2.1. nested\n3. three"
    );
}

#[test]
fn nested_items_are_indented_further() {
    let config = RenderConfig::default();
    let out = layout(NESTED_LISTS, &config, Size::new(WIDTH, 0.0));
    let lines = &out.drawables.lines;
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0].offset.left, config.list_indent);
    assert_eq!(lines[2].offset.left, 2.0 * config.list_indent);
    assert_eq!(lines[3].offset.left, config.list_indent);
}

#[test]
fn hello_world_without_wrap() {
    let config = RenderConfig::default().with_word_wrap(false);
    let out = layout("<p>Hello <b>World</b></p>", &config, Size::new(WIDTH, 0.0));
    let lines = &out.drawables.lines;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].segments.len(), 2);
    assert!(lines[0].segments[1].style.font.bold);
    assert_eq!(out.drawables.plain_text(), "Hello World");
}

#[test]
fn heading_then_rule() {
    let config = RenderConfig::default();
    let out = layout("<h1>Title</h1>", &config, Size::new(WIDTH, 0.0));
    let lines = &out.drawables.lines;
    assert_eq!(lines.len(), 2);
    assert_eq!(out.drawables.plain_text(), "Title");
    assert!(lines[1].is_rule_only());
    assert!(lines[1].content.y > lines[0].content.y);
    assert_eq!(lines[1].segments[0].tokens[0].bounds.width, WIDTH);
}

#[test]
fn unclosed_tag_is_auto_closed() {
    let config = RenderConfig::default();
    let out = layout("<b>text", &config, Size::new(WIDTH, 0.0));
    assert_eq!(out.status, ParseStatus::Complete);
    assert_eq!(out.unclosed_tags, ["b"]);
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].error.kind, MarkupErrorKind::UnclosedTag);
    assert_eq!(out.diagnostics[0].severity, Severity::Warning);
    assert_eq!(out.drawables.plain_text(), "text");
    assert!(out.drawables.lines[0].segments[0].style.font.bold);
}

#[test]
fn article_renders_every_construct() {
    let config = fixed_width_config();
    let out = layout(ARTICLE, &config, Size::new(WIDTH, 0.0));
    assert!(out.is_complete());
    let drawables = &out.drawables;
    let kinds: Vec<TokenKind> = drawables
        .lines
        .iter()
        .flat_map(|l| l.segments.iter().flat_map(|s| s.tokens.iter()))
        .map(|t| t.kind)
        .collect();
    for kind in [
        TokenKind::Text,
        TokenKind::HorizontalRule,
        TokenKind::ListItemBullet,
        TokenKind::Meter,
    ] {
        assert!(kinds.contains(&kind), "{kind:?} missing");
    }
    assert_eq!(drawables.backgrounds.len(), 2);
    assert!(drawables.lines.iter().any(|l| l.has_superscript));
    assert!(drawables.lines.iter().any(|l| l.has_subscript));
    let text = drawables.plain_text();
    assert!(text.contains("let x = 1;\nlet y = 2;"), "{text}");

    // Lines never overlap vertically.
    for pair in drawables.lines.windows(2) {
        assert!(pair[1].outer_bounds().y >= pair[0].outer_bounds().bottom());
    }
    let last = &drawables.lines[drawables.lines.len() - 1];
    assert!(drawables.size.height >= last.content.bottom());
}

#[test]
fn link_is_hit_testable() {
    let config = fixed_width_config();
    let out = layout(ARTICLE, &config, Size::new(WIDTH, 0.0));
    let link_segment = out
        .drawables
        .lines
        .iter()
        .flat_map(|l| l.segments.iter())
        .find(|s| s.style.link.is_some())
        .expect("article has a link");
    let bounds = link_segment.bounds;
    let hit = out
        .drawables
        .hit_test(bounds.x + 1.0, bounds.y + 1.0)
        .expect("point inside link");
    assert_eq!(hit.link, Some("https://example.com/notes"));
}

#[test]
fn malformed_inputs_never_panic_and_report() {
    let config = fixed_width_config();
    for markup in MALFORMED {
        let out = layout(markup, &config, Size::new(WIDTH, 0.0));
        assert!(!out.diagnostics.is_empty(), "{markup} should report");
        if let ParseStatus::Aborted(err) = &out.status {
            assert_eq!(err.severity(), Severity::Fatal, "{markup}");
        }
    }
}

#[test]
fn zero_width_lays_out_unbounded() {
    let config = fixed_width_config();
    let doc = long_document(1);
    let out = layout(&doc, &config, Size::ZERO);
    assert_eq!(out.drawables.lines.len(), 1);
    assert!(out.drawables.size.width > WIDTH);
}
