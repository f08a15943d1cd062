//! Deterministic style adjustments between iterations
//!
//! Which adjustments run is a fixed lookup on the iteration index and the
//! failing viewports; there is no search. Every adjustment works on a
//! [`StyleSurface`], so it cannot reach ids, types, tags, text or nesting.

use crate::analyzer::defaults::OFFER_MAX_WIDTH;
use crate::model::{px, round_px, Display, LayoutModel, StyleMap, StyleSurface};
use crate::{Error, Result, ViewportKind};
use log::debug;

/// Line heights are never pushed below this
const MIN_LINE_HEIGHT: f64 = 1.0;
/// Offer sections never shrink below this width
const MIN_OFFER_WIDTH: f64 = 320.0;

/// One deterministic transform of the style surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    /// Multiply every section's padding
    ScalePadding(f64),
    /// Multiply every flex/grid gap
    ScaleGap(f64),
    /// Multiply every typography size and px font sizes on elements
    ScaleFontSize(f64),
    /// Multiply every typography line height and the body line height
    ScaleLineHeight(f64),
    /// Multiply the max width of offer sections
    ScaleOfferWidth(f64),
    /// Center items in every flex/grid section
    AlignCenter,
}

impl Adjustment {
    pub fn name(&self) -> &'static str {
        match self {
            Adjustment::ScalePadding(_) => "scale-padding",
            Adjustment::ScaleGap(_) => "scale-gap",
            Adjustment::ScaleFontSize(_) => "scale-font-size",
            Adjustment::ScaleLineHeight(_) => "scale-line-height",
            Adjustment::ScaleOfferWidth(_) => "scale-offer-width",
            Adjustment::AlignCenter => "align-center",
        }
    }
}

/// The adjustment table. Iteration 1 tunes spacing, iteration 2 typography,
/// later iterations width and alignment. Never empty.
pub fn plan(iteration: u32, failing: &[ViewportKind]) -> Vec<Adjustment> {
    use Adjustment::*;

    let desktop = failing.contains(&ViewportKind::Desktop);
    let mobile = failing.contains(&ViewportKind::Mobile);

    match (iteration, desktop, mobile) {
        (1, true, false) => vec![ScalePadding(0.85)],
        (1, false, true) => vec![ScaleGap(0.75)],
        (1, _, _) => vec![ScalePadding(0.85), ScaleGap(0.75)],
        (2, true, false) => vec![ScaleFontSize(0.94)],
        (2, false, true) => vec![ScaleLineHeight(0.95)],
        (2, _, _) => vec![ScaleFontSize(0.9), ScaleLineHeight(0.95)],
        (_, true, false) => vec![ScaleOfferWidth(1.15)],
        (_, false, true) => vec![ScaleOfferWidth(0.9), AlignCenter],
        (_, _, _) => vec![ScaleOfferWidth(1.15), AlignCenter],
    }
}

fn scale_px_value(styles: &mut StyleMap, property: &str, factor: f64) {
    if let Some(value) = styles.get_mut(property) {
        if let Some(n) = value.trim().strip_suffix("px").and_then(|n| n.trim().parse::<f64>().ok()) {
            *value = px(n * factor);
        }
    }
}

/// Apply one adjustment to the surface
pub fn apply(surface: &mut StyleSurface<'_>, adjustment: Adjustment) {
    match adjustment {
        Adjustment::ScalePadding(f) => {
            for s in surface.sections.iter_mut() {
                s.layout.padding.scale(f);
            }
        }
        Adjustment::ScaleGap(f) => {
            for s in surface.sections.iter_mut() {
                if let Some(gap) = s.layout.gap.as_mut() {
                    *gap = round_px(*gap * f);
                }
            }
        }
        Adjustment::ScaleFontSize(f) => {
            for level in surface.typography.levels_mut() {
                level.size = round_px(level.size * f);
            }
            for s in surface.sections.iter_mut() {
                for el in s.elements.iter_mut() {
                    scale_px_value(el.styles, "font-size", f);
                }
            }
        }
        Adjustment::ScaleLineHeight(f) => {
            for level in surface.typography.levels_mut() {
                level.line_height = round_px(level.line_height * f).max(MIN_LINE_HEIGHT);
            }
            surface.global.line_height = round_px(surface.global.line_height * f).max(MIN_LINE_HEIGHT);
        }
        Adjustment::ScaleOfferWidth(f) => {
            let page_width = surface.global.max_width;
            for s in surface.sections.iter_mut().filter(|s| s.section_type().is_offer()) {
                let current = s.layout.max_width.unwrap_or(OFFER_MAX_WIDTH);
                let scaled = round_px(current * f).max(MIN_OFFER_WIDTH);
                s.layout.max_width = Some(if page_width > 0.0 { scaled.min(page_width) } else { scaled });
            }
        }
        Adjustment::AlignCenter => {
            for s in surface.sections.iter_mut() {
                if s.layout.display != Display::Block {
                    s.layout.align = Some("center".to_string());
                }
            }
        }
    }
}

/// Apply `adjustments` in order and verify the structural fingerprint did
/// not move.
pub fn apply_all(model: &mut LayoutModel, adjustments: &[Adjustment]) -> Result<()> {
    let before = model.fingerprint();
    {
        let mut surface = model.style_surface();
        for adjustment in adjustments {
            debug!("applying {:?}", adjustment);
            apply(&mut surface, *adjustment);
        }
    }
    let after = model.fingerprint();
    if before != after {
        return Err(Error::StructureViolation { before, after });
    }
    Ok(())
}
