//! Layout model shared by the analyzer, generator and refinement loop
//!
//! A [`LayoutModel`] is a plain value: it is cloned, never shared, between
//! pipeline steps. Refinement only ever receives a [`StyleSurface`], which
//! exposes the style/layout/typography/color values of a model while keeping
//! ids, types, tags, content and nesting out of reach.

use crate::{Error, Result, ViewportPair};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

/// CSS property name -> value. Ordered so that emission is deterministic.
pub type StyleMap = BTreeMap<String, String>;

/// Kind of top-level region a section represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionType {
    Header,
    Hero,
    Content,
    OfferList,
    OfferCard,
    Features,
    Testimonials,
    Cta,
    Footer,
    Generic,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Header => "header",
            SectionType::Hero => "hero",
            SectionType::Content => "content",
            SectionType::OfferList => "offer-list",
            SectionType::OfferCard => "offer-card",
            SectionType::Features => "features",
            SectionType::Testimonials => "testimonials",
            SectionType::Cta => "cta",
            SectionType::Footer => "footer",
            SectionType::Generic => "generic",
        }
    }

    /// Markup tag a section of this type is emitted as
    pub fn semantic_tag(&self) -> &'static str {
        match self {
            SectionType::Header => "header",
            SectionType::Footer => "footer",
            SectionType::Content => "main",
            _ => "section",
        }
    }

    pub fn is_offer(&self) -> bool {
        matches!(self, SectionType::OfferList | SectionType::OfferCard)
    }
}

/// Kind of content node inside a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementType {
    Heading,
    Paragraph,
    Image,
    Button,
    Link,
    List,
    ListItem,
    Card,
    Divider,
    Container,
    #[default]
    Text,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Heading => "heading",
            ElementType::Paragraph => "paragraph",
            ElementType::Image => "image",
            ElementType::Button => "button",
            ElementType::Link => "link",
            ElementType::List => "list",
            ElementType::ListItem => "list-item",
            ElementType::Card => "card",
            ElementType::Divider => "divider",
            ElementType::Container => "container",
            ElementType::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Display {
    Flex,
    Grid,
    #[default]
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlexDirection {
    Row,
    Column,
}

/// Box edge values in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Spacing {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Spacing {
    pub fn uniform(v: f64) -> Self {
        Self { top: v, right: v, bottom: v, left: v }
    }

    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self { top: vertical, right: horizontal, bottom: vertical, left: horizontal }
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0 && self.left == 0.0
    }

    pub fn scale(&mut self, factor: f64) {
        self.top = round_px(self.top * factor);
        self.right = round_px(self.right * factor);
        self.bottom = round_px(self.bottom * factor);
        self.left = round_px(self.left * factor);
    }

    pub fn to_css(&self) -> String {
        format!(
            "{} {} {} {}",
            px(self.top),
            px(self.right),
            px(self.bottom),
            px(self.left)
        )
    }
}

/// Round a pixel quantity to two decimals so repeated scaling stays stable
pub fn round_px(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Format a pixel quantity without trailing zeros (`12px`, `12.5px`)
pub fn px(v: f64) -> String {
    format!("{}px", trim_number(v))
}

/// Format a number without trailing zeros
pub fn trim_number(v: f64) -> String {
    let v = round_px(v);
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        let s = format!("{:.2}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Display mode plus the knobs that apply to it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub display: Display,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<FlexDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justify: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<f64>,
    #[serde(default)]
    pub padding: Spacing,
    #[serde(default)]
    pub margin: Spacing,
}

impl LayoutConfig {
    pub fn block(padding: Spacing) -> Self {
        Self { display: Display::Block, padding, ..Default::default() }
    }

    pub fn flex(direction: FlexDirection, padding: Spacing) -> Self {
        Self {
            display: Display::Flex,
            direction: Some(direction),
            padding,
            ..Default::default()
        }
    }

    /// CSS declarations for this layout, in a fixed order.
    ///
    /// Mode-specific knobs are only emitted for the mode they belong to.
    pub fn declarations(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        match self.display {
            Display::Flex => {
                out.push(("display".into(), "flex".into()));
                if let Some(dir) = self.direction {
                    let v = match dir {
                        FlexDirection::Row => "row",
                        FlexDirection::Column => "column",
                    };
                    out.push(("flex-direction".into(), v.into()));
                }
                if let Some(j) = &self.justify {
                    out.push(("justify-content".into(), j.clone()));
                }
                if let Some(a) = &self.align {
                    out.push(("align-items".into(), a.clone()));
                }
                if let Some(g) = self.gap {
                    out.push(("gap".into(), px(g)));
                }
            }
            Display::Grid => {
                out.push(("display".into(), "grid".into()));
                if let Some(t) = &self.grid_template {
                    out.push(("grid-template-columns".into(), t.clone()));
                }
                if let Some(a) = &self.align {
                    out.push(("align-items".into(), a.clone()));
                }
                if let Some(g) = self.gap {
                    out.push(("gap".into(), px(g)));
                }
            }
            Display::Block => {
                out.push(("display".into(), "block".into()));
            }
        }
        if let Some(w) = self.max_width {
            out.push(("--section-max-width".into(), px(w)));
        }
        if !self.padding.is_zero() {
            out.push(("padding".into(), self.padding.to_css()));
        }
        if !self.margin.is_zero() {
            out.push(("margin".into(), self.margin.to_css()));
        }
        out
    }
}

/// A content node inside a section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: String,
    #[serde(rename = "type", default)]
    pub element_type: ElementType,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
    #[serde(default)]
    pub styles: StyleMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data_attributes: BTreeMap<String, String>,
}

impl Element {
    pub fn new(id: impl Into<String>, element_type: ElementType, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            element_type,
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_styles(mut self, styles: StyleMap) -> Self {
        self.styles = styles;
        self
    }
}

/// A top-level structural region of the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub order: u32,
    pub layout: LayoutConfig,
    #[serde(default)]
    pub children: Vec<Element>,
    #[serde(default)]
    pub styles: StyleMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStyles {
    pub background: String,
    pub color: String,
    pub font_family: String,
    pub line_height: f64,
    pub max_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypographyLevel {
    /// Font size in px
    pub size: f64,
    pub weight: u16,
    /// Unitless line-height multiplier
    pub line_height: f64,
    /// Bottom margin in px
    pub margin_bottom: f64,
}

impl TypographyLevel {
    pub const fn new(size: f64, weight: u16, line_height: f64, margin_bottom: f64) -> Self {
        Self { size, weight, line_height, margin_bottom }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Typography {
    pub h1: TypographyLevel,
    pub h2: TypographyLevel,
    pub h3: TypographyLevel,
    pub h4: TypographyLevel,
    pub body: TypographyLevel,
    pub small: TypographyLevel,
}

impl Typography {
    pub const LEVELS: [&'static str; 6] = ["h1", "h2", "h3", "h4", "body", "small"];

    pub fn level(&self, name: &str) -> Option<&TypographyLevel> {
        match name {
            "h1" => Some(&self.h1),
            "h2" => Some(&self.h2),
            "h3" => Some(&self.h3),
            "h4" => Some(&self.h4),
            "body" => Some(&self.body),
            "small" => Some(&self.small),
            _ => None,
        }
    }

    pub fn level_mut(&mut self, name: &str) -> Option<&mut TypographyLevel> {
        match name {
            "h1" => Some(&mut self.h1),
            "h2" => Some(&mut self.h2),
            "h3" => Some(&mut self.h3),
            "h4" => Some(&mut self.h4),
            "body" => Some(&mut self.body),
            "small" => Some(&mut self.small),
            _ => None,
        }
    }

    pub fn levels(&self) -> [(&'static str, &TypographyLevel); 6] {
        [
            ("h1", &self.h1),
            ("h2", &self.h2),
            ("h3", &self.h3),
            ("h4", &self.h4),
            ("body", &self.body),
            ("small", &self.small),
        ]
    }

    pub fn levels_mut(&mut self) -> [&mut TypographyLevel; 6] {
        [
            &mut self.h1,
            &mut self.h2,
            &mut self.h3,
            &mut self.h4,
            &mut self.body,
            &mut self.small,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorScheme {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub surface: String,
    pub text: String,
    pub text_muted: String,
    pub border: String,
}

impl ColorScheme {
    /// Role name (as used in CSS custom properties) paired with its color
    pub fn roles(&self) -> [(&'static str, &str); 8] {
        [
            ("primary", &self.primary),
            ("secondary", &self.secondary),
            ("accent", &self.accent),
            ("background", &self.background),
            ("surface", &self.surface),
            ("text", &self.text),
            ("text-muted", &self.text_muted),
            ("border", &self.border),
        ]
    }
}

/// The structured description of a page, the single source of truth for the
/// generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutModel {
    pub viewport: ViewportPair,
    pub sections: Vec<Section>,
    pub global_styles: GlobalStyles,
    pub typography: Typography,
    pub color_scheme: ColorScheme,
}

impl LayoutModel {
    /// Sections in render order (ascending `order`)
    pub fn ordered_sections(&self) -> Vec<&Section> {
        let mut sections: Vec<&Section> = self.sections.iter().collect();
        sections.sort_by_key(|s| s.order);
        sections
    }

    /// Total number of elements, nested ones included
    pub fn element_count(&self) -> usize {
        fn count(els: &[Element]) -> usize {
            els.iter().map(|e| 1 + count(&e.children)).sum()
        }
        self.sections.iter().map(|s| count(&s.children)).sum()
    }

    /// Check that section orders and element ids are unique within the plan
    pub fn validate(&self) -> Result<()> {
        let mut orders = HashSet::new();
        let mut section_ids = HashSet::new();
        for s in &self.sections {
            if !orders.insert(s.order) {
                return Err(Error::Other(format!("Duplicate section order {}", s.order)));
            }
            if !section_ids.insert(s.id.as_str()) {
                return Err(Error::Other(format!("Duplicate section id {}", s.id)));
            }
        }

        fn walk<'a>(els: &'a [Element], ids: &mut HashSet<&'a str>) -> Result<()> {
            for e in els {
                if !ids.insert(e.id.as_str()) {
                    return Err(Error::Other(format!("Duplicate element id {}", e.id)));
                }
                walk(&e.children, ids)?;
            }
            Ok(())
        }
        let mut element_ids = HashSet::new();
        for s in &self.sections {
            walk(&s.children, &mut element_ids)?;
        }
        Ok(())
    }

    /// SHA-256 of everything refinement must not touch: section ids, types and
    /// orders, element ids, types, tags, text, sources, links and nesting.
    pub fn fingerprint(&self) -> String {
        fn feed_element(hasher: &mut Sha256, e: &Element, depth: usize) {
            hasher.update(format!("E{}|", depth));
            for part in [
                e.id.as_str(),
                e.element_type.as_str(),
                e.tag.as_str(),
                e.content.as_deref().unwrap_or("\u{0}"),
                e.src.as_deref().unwrap_or("\u{0}"),
                e.href.as_deref().unwrap_or("\u{0}"),
            ] {
                hasher.update(part.as_bytes());
                hasher.update([0x1f]);
            }
            for c in &e.children {
                feed_element(hasher, c, depth + 1);
            }
            hasher.update(b"/E");
        }

        let mut hasher = Sha256::new();
        for s in &self.sections {
            hasher.update(format!("S|{}|{}|{}|", s.id, s.section_type.as_str(), s.order));
            for e in &s.children {
                feed_element(&mut hasher, e, 0);
            }
            hasher.update(b"/S");
        }
        hex::encode(hasher.finalize())
    }

    /// Borrow the mutable, non-structural parts of the model
    pub fn style_surface(&mut self) -> StyleSurface<'_> {
        let LayoutModel {
            sections,
            global_styles,
            typography,
            color_scheme,
            ..
        } = self;

        let sections = sections
            .iter_mut()
            .map(|section| {
                let Section {
                    id,
                    section_type,
                    layout,
                    children,
                    styles,
                    ..
                } = section;
                let mut elements = Vec::new();
                collect_element_styles(children, &mut elements);
                SectionStyle {
                    id: id.as_str(),
                    section_type: *section_type,
                    layout,
                    styles,
                    elements,
                }
            })
            .collect();

        StyleSurface {
            sections,
            global: global_styles,
            typography,
            color_scheme,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

fn collect_element_styles<'a>(els: &'a mut [Element], out: &mut Vec<ElementStyle<'a>>) {
    for el in els {
        let Element {
            element_type,
            styles,
            children,
            ..
        } = el;
        out.push(ElementStyle {
            element_type: *element_type,
            styles,
        });
        collect_element_styles(children, out);
    }
}

/// Mutable view over the style values of one section
pub struct SectionStyle<'a> {
    id: &'a str,
    section_type: SectionType,
    pub layout: &'a mut LayoutConfig,
    pub styles: &'a mut StyleMap,
    pub elements: Vec<ElementStyle<'a>>,
}

impl SectionStyle<'_> {
    pub fn id(&self) -> &str {
        self.id
    }

    pub fn section_type(&self) -> SectionType {
        self.section_type
    }
}

/// Mutable view over the style map of one element (nested ones flattened)
pub struct ElementStyle<'a> {
    element_type: ElementType,
    pub styles: &'a mut StyleMap,
}

impl ElementStyle<'_> {
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }
}

/// Everything an adjustment is allowed to change
pub struct StyleSurface<'a> {
    pub sections: Vec<SectionStyle<'a>>,
    pub global: &'a mut GlobalStyles,
    pub typography: &'a mut Typography,
    pub color_scheme: &'a mut ColorScheme,
}
