//! Global styles and color scheme derivation

use super::defaults;
use crate::model::{ColorScheme, GlobalStyles};
use crate::render::ColorSamples;

/// Normalize any CSS color to lowercase `#rrggbb`.
///
/// Fully transparent and unparseable values yield `None`.
pub fn normalize(raw: &str) -> Option<String> {
    let color = csscolorparser::parse(raw.trim()).ok()?;
    let [r, g, b, a] = color.to_rgba8();
    if a == 0 {
        return None;
    }
    Some(format!("#{:02x}{:02x}{:02x}", r, g, b))
}

pub fn is_white(hex: &str) -> bool {
    hex == "#ffffff"
}

pub fn is_black(hex: &str) -> bool {
    hex == "#000000"
}

fn normalized(list: &[String]) -> Vec<String> {
    list.iter().filter_map(|c| normalize(c)).collect()
}

fn first_where(list: &[String], pred: impl Fn(&str) -> bool) -> Option<String> {
    list.iter().find(|c| pred(c)).cloned()
}

/// Body defaults: dominant background and text color, first detected font
pub fn global_styles(colors: &ColorSamples, fonts: &[String], max_width: f64) -> GlobalStyles {
    let backgrounds = normalized(&colors.backgrounds);
    let texts = normalized(&colors.texts);

    GlobalStyles {
        background: backgrounds
            .first()
            .cloned()
            .unwrap_or_else(|| defaults::BACKGROUND.to_string()),
        color: texts.first().cloned().unwrap_or_else(|| defaults::TEXT.to_string()),
        font_family: font_stack(fonts),
        line_height: defaults::BASE_LINE_HEIGHT,
        max_width,
    }
}

/// First named family followed by the system stack
pub fn font_stack(fonts: &[String]) -> String {
    const GENERIC: [&str; 6] = ["serif", "sans-serif", "monospace", "cursive", "fantasy", "system-ui"];

    let first = fonts
        .iter()
        .map(|f| f.split(',').next().unwrap_or("").trim().trim_matches(|c| c == '"' || c == '\''))
        .find(|f| !f.is_empty());

    match first {
        Some(family) if !GENERIC.contains(&family.to_ascii_lowercase().as_str()) => {
            let family: String = family.chars().filter(|c| !matches!(c, '"' | '<' | '>' | ';')).collect();
            format!("\"{}\", {}", family, defaults::SYSTEM_FONT_STACK)
        }
        _ => defaults::SYSTEM_FONT_STACK.to_string(),
    }
}

/// Map observed colors onto the eight scheme roles.
///
/// Accent-tagged colors fill primary/secondary/accent in order. Background,
/// surface, text and muted text each take the first candidate that is
/// neither plain white nor plain black; surface and muted text also skip the
/// color already chosen for background and text.
pub fn color_scheme(colors: &ColorSamples) -> ColorScheme {
    let accents = normalized(&colors.accents);
    let backgrounds = normalized(&colors.backgrounds);
    let texts = normalized(&colors.texts);

    let pick = |i: usize, fallback: &str| accents.get(i).cloned().unwrap_or_else(|| fallback.to_string());

    let tinted = |c: &str| !is_white(c) && !is_black(c);

    let background = first_where(&backgrounds, tinted);
    let surface = first_where(&backgrounds, |c| tinted(c) && Some(c) != background.as_deref());
    let text = first_where(&texts, tinted);
    let text_muted = first_where(&texts, |c| tinted(c) && Some(c) != text.as_deref());

    ColorScheme {
        primary: pick(0, defaults::PRIMARY),
        secondary: pick(1, defaults::SECONDARY),
        accent: pick(2, defaults::ACCENT),
        background: background.unwrap_or_else(|| defaults::BACKGROUND.to_string()),
        surface: surface.unwrap_or_else(|| defaults::SURFACE.to_string()),
        text: text.unwrap_or_else(|| defaults::TEXT.to_string()),
        text_muted: text_muted.unwrap_or_else(|| defaults::TEXT_MUTED.to_string()),
        border: defaults::BORDER.to_string(),
    }
}
