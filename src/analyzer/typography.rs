//! Typography levels from computed styles

use super::{defaults, selector_has_tag_prefix};
use crate::model::{round_px, Typography, TypographyLevel};
use crate::render::StyleEntry;

const ROOT_FONT_SIZE: f64 = 16.0;

/// Tag whose computed style describes each level. Extraction never
/// reports `<body>` itself, so body text is read from paragraphs.
fn level_tag(level: &str) -> &str {
    match level {
        "body" => "p",
        other => other,
    }
}

/// Parse `32px`, `2rem`, `1.5em` into CSS pixels
pub fn parse_length(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let (num, scale) = if let Some(n) = raw.strip_suffix("px") {
        (n, 1.0)
    } else if let Some(n) = raw.strip_suffix("rem") {
        (n, ROOT_FONT_SIZE)
    } else if let Some(n) = raw.strip_suffix("em") {
        (n, ROOT_FONT_SIZE)
    } else {
        (raw, 1.0)
    };
    num.trim().parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v * scale)
}

pub fn parse_weight(raw: &str) -> Option<u16> {
    match raw.trim() {
        "normal" => Some(400),
        "bold" => Some(700),
        "lighter" => Some(300),
        "bolder" => Some(800),
        n => n.parse::<u16>().ok().filter(|w| (1..=1000).contains(w)),
    }
}

/// Line height as a unitless multiplier of `font_size`
pub fn parse_line_height(raw: &str, font_size: f64) -> Option<f64> {
    let raw = raw.trim();
    if raw == "normal" || raw.is_empty() {
        return None;
    }
    if raw.ends_with("px") || raw.ends_with("em") {
        let px = parse_length(raw)?;
        if font_size <= 0.0 {
            return None;
        }
        return Some(round_px(px / font_size));
    }
    if let Some(pct) = raw.strip_suffix('%') {
        return pct.trim().parse::<f64>().ok().map(|p| round_px(p / 100.0));
    }
    raw.parse::<f64>().ok().filter(|v| *v > 0.0)
}

fn apply(level: &mut TypographyLevel, entry: &StyleEntry) {
    let style = &entry.style;
    if let Some(size) = style.font_size.as_deref().and_then(parse_length) {
        level.size = round_px(size);
    }
    if let Some(weight) = style.font_weight.as_deref().and_then(parse_weight) {
        level.weight = weight;
    }
    if let Some(lh) = style
        .line_height
        .as_deref()
        .and_then(|lh| parse_line_height(lh, level.size))
    {
        level.line_height = lh;
    }
}

/// Start from the fixed defaults and overwrite each level from the first
/// style entry whose selector starts with that level's tag. Later matches
/// are ignored.
pub fn derive(entries: &[StyleEntry]) -> Typography {
    let mut typography = defaults::typography();
    for name in Typography::LEVELS {
        let tag = level_tag(name);
        if let Some(entry) = entries.iter().find(|e| selector_has_tag_prefix(&e.selector, tag)) {
            if let Some(level) = typography.level_mut(name) {
                apply(level, entry);
            }
        }
    }
    typography
}
