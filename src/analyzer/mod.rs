//! Content analyzer: raw page content -> [`LayoutModel`]
//!
//! The analyzer never fails. Every sub-step degrades to fixed defaults on
//! missing or malformed input: colors and typography per field, sections by
//! falling back to a single content section built from the whole body.

pub mod classify;
pub mod colors;
pub mod defaults;
pub mod elements;
pub mod segment;
pub mod typography;

use crate::model::{LayoutModel, Section, SectionType, StyleMap};
use crate::render::RenderedPage;
use crate::CloneConfig;
use elements::ElementExtractor;
use log::{debug, warn};
use scraper::Html;
use std::collections::HashSet;
use url::Url;

/// Whether a selector starts with `tag` followed by a selector boundary
/// (`h1`, `h1.title`, `h1#x`, `h1:hover`, `h1 span`), not a longer name.
pub fn selector_has_tag_prefix(selector: &str, tag: &str) -> bool {
    let selector = selector.trim_start();
    let Some(head) = selector.get(..tag.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(tag) {
        return false;
    }
    match selector[tag.len()..].chars().next() {
        None => true,
        Some(c) => !(c.is_ascii_alphanumeric() || c == '-' || c == '_'),
    }
}

/// Section-level overrides worth carrying from the block's own style
const SECTION_STYLE_KEYS: [&str; 2] = ["background-color", "color"];

fn section_id(candidate: Option<&str>, section_type: SectionType, order: u32, used: &mut HashSet<String>) -> String {
    let sanitized = candidate.map(|id| {
        id.chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect::<String>()
    });
    let id = match sanitized {
        Some(id) if !id.is_empty() && !used.contains(&id) => id,
        _ => {
            let base = format!("{}_{}", section_type.as_str().replace('-', "_"), order);
            let mut id = base.clone();
            let mut suffix = 2;
            while used.contains(&id) {
                id = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            id
        }
    };
    used.insert(id.clone());
    id
}

/// Build a layout model from a rendered page
pub fn analyze(page: &RenderedPage, config: &CloneConfig) -> LayoutModel {
    let global_styles = colors::global_styles(&page.colors, &page.fonts, config.content_max_width);
    let typography = typography::derive(&page.computed_styles);
    let color_scheme = colors::color_scheme(&page.colors);

    let base_url = Url::parse(&page.url).ok();
    let mut extractor = ElementExtractor::new(&page.computed_styles, base_url, config.min_paragraph_length);

    let fragment = Html::parse_fragment(&page.body_html);
    let root = fragment.root_element();
    let blocks = segment::segment(root, config.min_block_length);
    debug!("segmented body into {} candidate blocks", blocks.len());

    let mut sections = Vec::new();
    let mut used_ids = HashSet::new();
    let mut order = 0u32;

    for block in &blocks {
        let section_type = classify::classify(block);
        let mut children = extractor.extract(block.node, section_type == SectionType::OfferList);
        if section_type == SectionType::OfferList {
            children.extend(extractor.extract_cards(block.node));
        }
        if children.is_empty() {
            debug!("dropping {} block without extractable content", block.tag);
            continue;
        }

        let block_style = extractor.lookup_style(&block.tag, &block.classes);
        let styles: StyleMap = block_style
            .into_iter()
            .filter(|(k, _)| SECTION_STYLE_KEYS.contains(&k.as_str()))
            .collect();

        sections.push(Section {
            id: section_id(block.id.as_deref(), section_type, order, &mut used_ids),
            section_type,
            order,
            layout: defaults::layout_for(section_type),
            children,
            styles,
        });
        order += 1;
    }

    if sections.is_empty() {
        warn!("no structural blocks survived analysis; using a single content section");
        let children = extractor.extract(root, false);
        sections.push(Section {
            id: "content_0".to_string(),
            section_type: SectionType::Content,
            order: 0,
            layout: defaults::layout_for(SectionType::Content),
            children,
            styles: StyleMap::new(),
        });
    }

    debug!(
        "analyzed {} sections with {} elements",
        sections.len(),
        sections.iter().map(|s| s.children.len()).sum::<usize>()
    );

    LayoutModel {
        viewport: config.viewports,
        sections,
        global_styles,
        typography,
        color_scheme,
    }
}
