//! Fixed fallbacks used whenever the page does not tell us better

use crate::model::{
    ColorScheme, Display, FlexDirection, GlobalStyles, LayoutConfig, SectionType, Spacing, Typography,
    TypographyLevel,
};

pub const SYSTEM_FONT_STACK: &str =
    "-apple-system, BlinkMacSystemFont, \"Segoe UI\", Roboto, \"Helvetica Neue\", Arial, sans-serif";

pub const BACKGROUND: &str = "#ffffff";
pub const SURFACE: &str = "#f8fafc";
pub const TEXT: &str = "#111827";
pub const TEXT_MUTED: &str = "#6b7280";
pub const BORDER: &str = "#e5e7eb";
pub const PRIMARY: &str = "#2563eb";
pub const SECONDARY: &str = "#1e40af";
pub const ACCENT: &str = "#f59e0b";

pub const BASE_LINE_HEIGHT: f64 = 1.6;
pub const CONTENT_MAX_WIDTH: f64 = 1200.0;

pub const OFFER_GAP: f64 = 24.0;
pub const OFFER_MAX_WIDTH: f64 = 960.0;

pub fn global_styles() -> GlobalStyles {
    GlobalStyles {
        background: BACKGROUND.to_string(),
        color: TEXT.to_string(),
        font_family: SYSTEM_FONT_STACK.to_string(),
        line_height: BASE_LINE_HEIGHT,
        max_width: CONTENT_MAX_WIDTH,
    }
}

pub fn typography() -> Typography {
    Typography {
        h1: TypographyLevel::new(48.0, 700, 1.2, 24.0),
        h2: TypographyLevel::new(36.0, 700, 1.25, 20.0),
        h3: TypographyLevel::new(28.0, 600, 1.3, 16.0),
        h4: TypographyLevel::new(22.0, 600, 1.35, 12.0),
        body: TypographyLevel::new(16.0, 400, 1.6, 16.0),
        small: TypographyLevel::new(14.0, 400, 1.5, 8.0),
    }
}

pub fn color_scheme() -> ColorScheme {
    ColorScheme {
        primary: PRIMARY.to_string(),
        secondary: SECONDARY.to_string(),
        accent: ACCENT.to_string(),
        background: BACKGROUND.to_string(),
        surface: SURFACE.to_string(),
        text: TEXT.to_string(),
        text_muted: TEXT_MUTED.to_string(),
        border: BORDER.to_string(),
    }
}

/// Vertical flex stack used by every offer-type section
pub fn offer_layout() -> LayoutConfig {
    LayoutConfig {
        display: Display::Flex,
        direction: Some(FlexDirection::Column),
        gap: Some(OFFER_GAP),
        max_width: Some(OFFER_MAX_WIDTH),
        padding: Spacing::symmetric(48.0, 24.0),
        ..Default::default()
    }
}

/// Starting layout for a section of the given type
pub fn layout_for(section_type: SectionType) -> LayoutConfig {
    match section_type {
        SectionType::OfferList | SectionType::OfferCard => offer_layout(),
        SectionType::Header => LayoutConfig {
            justify: Some("space-between".into()),
            align: Some("center".into()),
            gap: Some(16.0),
            ..LayoutConfig::flex(FlexDirection::Row, Spacing::symmetric(16.0, 24.0))
        },
        SectionType::Hero => LayoutConfig {
            align: Some("center".into()),
            gap: Some(16.0),
            ..LayoutConfig::flex(FlexDirection::Column, Spacing::symmetric(80.0, 24.0))
        },
        SectionType::Features | SectionType::Testimonials => LayoutConfig {
            display: Display::Grid,
            grid_template: Some("repeat(auto-fit, minmax(240px, 1fr))".into()),
            gap: Some(24.0),
            padding: Spacing::symmetric(64.0, 24.0),
            ..Default::default()
        },
        SectionType::Cta => LayoutConfig {
            align: Some("center".into()),
            gap: Some(16.0),
            ..LayoutConfig::flex(FlexDirection::Column, Spacing::symmetric(64.0, 24.0))
        },
        SectionType::Footer => LayoutConfig::block(Spacing::symmetric(40.0, 24.0)),
        SectionType::Content | SectionType::Generic => LayoutConfig::block(Spacing::symmetric(48.0, 24.0)),
    }
}
