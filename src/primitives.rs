//! Allocation-free scanning and value extraction over markup text.
//!
//! Scanners take a byte index and return the first index at or after it where
//! the scanned predicate stops holding. They saturate at the end of the text
//! and never move backwards.

use crate::color::{unit_to_channel, Color};
use crate::config::ColorResolver;

/// Skip ASCII whitespace.
pub fn skip_space(text: &str, start: usize) -> usize {
    scan_while(text, start, |b| b.is_ascii_whitespace())
}

/// Skip ASCII digits.
pub fn skip_digits(text: &str, start: usize) -> usize {
    scan_while(text, start, |b| b.is_ascii_digit())
}

/// Skip digits with at most one decimal point.
pub fn skip_fractional_digits(text: &str, start: usize) -> usize {
    let mut seen_dot = false;
    scan_while(text, start, |b| {
        if b == b'.' && !seen_dot {
            seen_dot = true;
            true
        } else {
            b.is_ascii_digit()
        }
    })
}

/// Skip an identifier-like word (`[A-Za-z0-9_-]`).
pub fn whole_word(text: &str, start: usize) -> usize {
    scan_while(text, start, |b| {
        b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
    })
}

fn scan_while(text: &str, start: usize, mut pred: impl FnMut(u8) -> bool) -> usize {
    let bytes = text.as_bytes();
    let mut idx = start.min(bytes.len());
    while idx < bytes.len() && pred(bytes[idx]) {
        idx += 1;
    }
    idx
}

/// ASCII case-insensitive equality.
pub fn are_same(lhs: &str, rhs: &str) -> bool {
    lhs.eq_ignore_ascii_case(rhs)
}

/// Parse the trailing digit run, ignoring leading noise.
///
/// A `-` directly before the run negates it. Returns `default` when there
/// are no trailing digits.
pub fn extract_int(text: &str, default: i64) -> i64 {
    let bytes = text.trim_end().as_bytes();
    let end = bytes.len();
    let mut start = end;
    while start > 0 && bytes[start - 1].is_ascii_digit() {
        start -= 1;
    }
    if start == end {
        return default;
    }
    let mut value = 0i64;
    let mut place = 1i64;
    for &b in bytes[start..end].iter().rev() {
        value = value.saturating_add(i64::from(b - b'0').saturating_mul(place));
        place = place.saturating_mul(10);
    }
    if start > 0 && bytes[start - 1] == b'-' {
        -value
    } else {
        value
    }
}

/// Parse the trailing hexadecimal digit run (at most eight digits).
pub fn extract_int_from_hex(text: &str, default: u32) -> u32 {
    let bytes = text.trim_end().as_bytes();
    let end = bytes.len();
    let mut start = end;
    while start > 0 && end - start < 8 && bytes[start - 1].is_ascii_hexdigit() {
        start -= 1;
    }
    if start == end {
        return default;
    }
    let digits = &text.trim_end()[start..end];
    u32::from_str_radix(digits, 16).unwrap_or(default)
}

/// Parse the trailing decimal number, ignoring leading noise.
pub fn extract_number(text: &str, default: f32) -> f32 {
    trailing_number(text).unwrap_or(default)
}

fn trailing_number(text: &str) -> Option<f32> {
    let trimmed = text.trim_end();
    let bytes = trimmed.as_bytes();
    let end = bytes.len();
    let mut start = end;
    let mut seen_dot = false;
    while start > 0 {
        let b = bytes[start - 1];
        if b.is_ascii_digit() {
            start -= 1;
        } else if b == b'.' && !seen_dot {
            seen_dot = true;
            start -= 1;
        } else {
            break;
        }
    }
    let run = &trimmed[start..end];
    if !run.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: f32 = run.parse().ok()?;
    if start > 0 && bytes[start - 1] == b'-' {
        Some(-value)
    } else {
        Some(value)
    }
}

/// Points to pixels.
pub const PT_TO_PX: f32 = 1.3333;

/// Parse a length with an optional unit suffix.
///
/// `pt` scales by [`PT_TO_PX`], `em` by `ems`, `%` by `parent / 100`;
/// `px` and unitless values scale by `scale`. Returns `default` when no
/// number is present.
pub fn extract_float_with_unit(text: &str, default: f32, ems: f32, parent: f32, scale: f32) -> f32 {
    let trimmed = text.trim();
    // (number, multiplier, divisor); percentages divide last so whole
    // percentages of whole sizes stay exact.
    let (number, factor, divisor) = if let Some(rest) = strip_suffix_ignore_case(trimmed, "pt") {
        (rest, PT_TO_PX, 1.0)
    } else if let Some(rest) = strip_suffix_ignore_case(trimmed, "em") {
        (rest, ems, 1.0)
    } else if let Some(rest) = trimmed.strip_suffix('%') {
        (rest, parent, 100.0)
    } else if let Some(rest) = strip_suffix_ignore_case(trimmed, "px") {
        (rest, scale, 1.0)
    } else {
        (trimmed, scale, 1.0)
    };
    match trailing_number(number) {
        Some(value) => value * factor / divisor,
        None => default,
    }
}

/// True when `text` carries a parseable trailing number (after units).
pub(crate) fn has_number(text: &str) -> bool {
    let trimmed = text.trim();
    let number = ["pt", "em", "px", "%"]
        .iter()
        .find_map(|unit| strip_suffix_ignore_case(trimmed, unit))
        .unwrap_or(trimmed);
    trailing_number(number).is_some()
}

fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let split = text.len().checked_sub(suffix.len())?;
    if !text.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = text.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

/// Quoted value located inside markup text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotedValue<'a> {
    /// Content between the quotes, escapes left in place.
    pub value: &'a str,
    /// Index just past the closing quote.
    pub end: usize,
}

/// Scan a single- or double-quoted value starting at `start` (leading
/// whitespace skipped). Backslash escapes the next byte.
///
/// Returns `None` when there is no opening quote or the value is unterminated.
pub fn get_quoted_string(text: &str, start: usize) -> Option<QuotedValue<'_>> {
    let bytes = text.as_bytes();
    let open = skip_space(text, start);
    let quote = *bytes.get(open)?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let mut idx = open + 1;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => idx += 2,
            b if b == quote => {
                return Some(QuotedValue {
                    value: &text[open + 1..idx],
                    end: idx + 1,
                });
            }
            _ => idx += 1,
        }
    }
    None
}

/// Parse a CSS colour: `rgb()`, `rgba()`, `hsl()`, `hsla()`, `hsv()`,
/// `hsva()`, `#hex`, or a name via `resolver`. Anything else is opaque black.
pub fn extract_color(text: &str, resolver: Option<&dyn ColorResolver>) -> Color {
    try_extract_color(text, resolver).unwrap_or(Color::BLACK)
}

pub(crate) fn try_extract_color(text: &str, resolver: Option<&dyn ColorResolver>) -> Option<Color> {
    let value = text.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex_color(hex);
    }
    if let Some(args) = function_args(value, "rgba").or_else(|| function_args(value, "rgb")) {
        return parse_rgb_args(args);
    }
    if let Some(args) = function_args(value, "hsla").or_else(|| function_args(value, "hsl")) {
        let [h, s, l, a] = parse_hue_args(args)?;
        return Some(Color::from_hsl(h, s, l, a));
    }
    if let Some(args) = function_args(value, "hsva").or_else(|| function_args(value, "hsv")) {
        let [h, s, v, a] = parse_hue_args(args)?;
        return Some(Color::from_hsv(h, s, v, a));
    }
    resolver.and_then(|r| r.resolve_color(value))
}

fn function_args<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    let head = value.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    let rest = value[name.len()..].trim_start();
    rest.strip_prefix('(')?.strip_suffix(')')
}

fn split_args(args: &str) -> impl Iterator<Item = &str> {
    let by_comma = args.contains(',');
    args.split(move |c: char| {
        if by_comma {
            c == ','
        } else {
            c.is_ascii_whitespace() || c == '/'
        }
    })
    .map(str::trim)
    .filter(|part| !part.is_empty())
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |idx: usize| extract_int_from_hex(&hex[idx..idx + 1], 0) as u8 * 17;
    let byte = |idx: usize| extract_int_from_hex(&hex[idx..idx + 2], 0) as u8;
    match hex.len() {
        3 => Some(Color::rgb(nibble(0), nibble(1), nibble(2))),
        4 => Some(Color::rgba(nibble(0), nibble(1), nibble(2), nibble(3))),
        6 => Some(Color::rgb(byte(0), byte(2), byte(4))),
        8 => Some(Color::rgba(byte(0), byte(2), byte(4), byte(6))),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Color> {
    let mut channels = [0u8, 0, 0, 255];
    let mut count = 0usize;
    for (idx, part) in split_args(args).take(4).enumerate() {
        channels[idx] = if idx == 3 {
            unit_to_channel(parse_unit(part)?)
        } else if let Some(pct) = part.strip_suffix('%') {
            unit_to_channel(trailing_number(pct)? / 100.0)
        } else {
            trailing_number(part)?.clamp(0.0, 255.0).round() as u8
        };
        count += 1;
    }
    (count >= 3).then_some(Color::rgba(
        channels[0],
        channels[1],
        channels[2],
        channels[3],
    ))
}

fn parse_hue_args(args: &str) -> Option<[f32; 4]> {
    let mut out = [0.0, 0.0, 0.0, 1.0];
    let mut count = 0usize;
    for (idx, part) in split_args(args).take(4).enumerate() {
        out[idx] = if idx == 0 {
            trailing_number(part.trim_end_matches("deg"))?
        } else {
            parse_unit(part)?
        };
        count += 1;
    }
    (count >= 3).then_some(out)
}

/// `50%` and `0.5` both mean one half; bare values above one are percents.
fn parse_unit(part: &str) -> Option<f32> {
    if let Some(pct) = part.strip_suffix('%') {
        return Some((trailing_number(pct)? / 100.0).clamp(0.0, 1.0));
    }
    let value = trailing_number(part)?;
    if value > 1.0 {
        Some((value / 100.0).clamp(0.0, 1.0))
    } else {
        Some(value.max(0.0))
    }
}
