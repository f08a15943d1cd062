//! Element extraction inside a block

use super::classify::is_card;
use super::segment::class_tokens;
use super::selector_has_tag_prefix;
use crate::model::{Element, ElementType, StyleMap};
use crate::render::StyleEntry;
use scraper::{ElementRef, Selector};
use std::collections::BTreeMap;
use url::Url;

const CTA_KEYWORDS: [&str; 3] = ["btn", "button", "cta"];

/// Collapse runs of whitespace in an element's text
pub fn text_of(node: ElementRef<'_>) -> String {
    node.text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hands out element ids and looks up computed styles for one plan
pub struct ElementExtractor<'s> {
    styles: &'s [StyleEntry],
    base_url: Option<Url>,
    min_paragraph_length: usize,
    next_id: usize,
    next_offer: usize,
}

impl<'s> ElementExtractor<'s> {
    pub fn new(styles: &'s [StyleEntry], base_url: Option<Url>, min_paragraph_length: usize) -> Self {
        Self {
            styles,
            base_url,
            min_paragraph_length,
            next_id: 1,
            next_offer: 1,
        }
    }

    fn next_id(&mut self) -> String {
        let id = format!("el_{}", self.next_id);
        self.next_id += 1;
        id
    }

    fn resolve(&self, link: &str) -> String {
        match &self.base_url {
            Some(base) => base.join(link).map(|u| u.to_string()).unwrap_or_else(|_| link.to_string()),
            None => link.to_string(),
        }
    }

    /// First style entry whose selector starts with `tag` or contains the
    /// element's class list (in `.a.b` selector form); empty when none does.
    pub fn lookup_style(&self, tag: &str, classes: &[String]) -> StyleMap {
        let class_selector: String = classes.iter().map(|c| format!(".{}", c)).collect();
        self.styles
            .iter()
            .find(|e| {
                selector_has_tag_prefix(&e.selector, tag)
                    || (!class_selector.is_empty() && e.selector.to_ascii_lowercase().contains(&class_selector))
            })
            .map(|e| e.style.to_style_map())
            .unwrap_or_default()
    }

    fn styles_for(&self, node: ElementRef<'_>) -> StyleMap {
        let tag = node.value().name().to_ascii_lowercase();
        self.lookup_style(&tag, &class_tokens(node))
    }

    /// Flat element list for `root`: headings, then paragraphs, then images,
    /// then call-to-action buttons and links, each scan in document order.
    ///
    /// With `skip_cards`, anything inside a card-classed descendant of `root`
    /// is left for [`extract_cards`](Self::extract_cards).
    pub fn extract(&mut self, root: ElementRef<'_>, skip_cards: bool) -> Vec<Element> {
        let keep = |node: &ElementRef<'_>| !skip_cards || !inside_card(*node, root);
        let mut out = Vec::new();

        let heading_sel = Selector::parse("h1, h2, h3, h4, h5, h6").unwrap();
        for node in root.select(&heading_sel).filter(|n| keep(n)) {
            let text = text_of(node);
            if text.is_empty() {
                continue;
            }
            let tag = node.value().name().to_ascii_lowercase();
            let el = Element::new(self.next_id(), ElementType::Heading, tag)
                .with_content(text)
                .with_styles(self.styles_for(node));
            out.push(el);
        }

        let p_sel = Selector::parse("p").unwrap();
        for node in root.select(&p_sel).filter(|n| keep(n)) {
            let text = text_of(node);
            if text.chars().count() < self.min_paragraph_length {
                continue;
            }
            let el = Element::new(self.next_id(), ElementType::Paragraph, "p")
                .with_content(text)
                .with_styles(self.styles_for(node));
            out.push(el);
        }

        let img_sel = Selector::parse("img").unwrap();
        for node in root.select(&img_sel).filter(|n| keep(n)) {
            let src = match node.value().attr("src").map(str::trim) {
                Some(s) if !s.is_empty() => self.resolve(s),
                _ => continue,
            };
            let alt = node.value().attr("alt").unwrap_or("").trim().to_string();
            let mut el = Element::new(self.next_id(), ElementType::Image, "img").with_styles(self.styles_for(node));
            el.src = Some(src);
            el.alt = Some(alt);
            out.push(el);
        }

        let action_sel = Selector::parse("a, button").unwrap();
        for node in root.select(&action_sel).filter(|n| keep(n)) {
            let classes = class_tokens(node);
            let element_type = if classes.iter().any(|c| CTA_KEYWORDS.iter().any(|k| c.contains(k))) {
                ElementType::Button
            } else if node.value().name() == "a" && classes.iter().any(|c| c.contains("link")) {
                ElementType::Link
            } else {
                continue;
            };
            let text = text_of(node);
            if text.is_empty() {
                continue;
            }
            let href = node
                .value()
                .attr("href")
                .map(|h| self.resolve(h.trim()))
                .unwrap_or_else(|| "#".to_string());
            let mut el = Element::new(self.next_id(), element_type, "a")
                .with_content(text)
                .with_styles(self.styles_for(node));
            el.href = Some(href);
            out.push(el);
        }

        out
    }

    /// One `card` element per outermost card-classed descendant of `root`
    pub fn extract_cards(&mut self, root: ElementRef<'_>) -> Vec<Element> {
        let cards: Vec<ElementRef<'_>> = root
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|e| is_card(*e) && !inside_card(*e, root))
            .collect();

        let mut out = Vec::new();
        for card in cards {
            let id = self.next_id();
            let offer_id = match card.value().attr("id").map(str::trim) {
                Some(s) if !s.is_empty() => s.to_string(),
                _ => {
                    let generated = format!("offer_{}", self.next_offer);
                    self.next_offer += 1;
                    generated
                }
            };
            let children = self.extract(card, false);
            if children.is_empty() {
                continue;
            }
            out.push(Element {
                children,
                styles: self.styles_for(card),
                data_attributes: BTreeMap::from([("offer-id".to_string(), offer_id)]),
                ..Element::new(id, ElementType::Card, "div")
            });
        }
        out
    }
}

/// Whether `node` sits inside a card-classed element below `root`
fn inside_card(node: ElementRef<'_>, root: ElementRef<'_>) -> bool {
    for ancestor in node.ancestors() {
        if ancestor.id() == root.id() {
            return false;
        }
        if let Some(el) = ElementRef::wrap(ancestor) {
            if is_card(el) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ComputedStyle;
    use scraper::Html;

    fn style(selector: &str, color: &str) -> StyleEntry {
        StyleEntry {
            selector: selector.to_string(),
            style: ComputedStyle {
                color: Some(color.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn scans_grouped_by_kind() {
        let doc = Html::parse_fragment(
            "<p>First paragraph with enough text</p><h2>Title</h2>\
             <img src=\"/hero.png\" alt=\"Hero\"><a class=\"btn primary\" href=\"/go\">Start now</a>\
             <a href=\"/plain\">Plain link</a><p>short</p>",
        );
        let mut ex = ElementExtractor::new(&[], Url::parse("https://shop.test/a/").ok(), 20);
        let els = ex.extract(doc.root_element(), false);
        let kinds: Vec<_> = els.iter().map(|e| e.element_type).collect();
        assert_eq!(
            kinds,
            vec![ElementType::Heading, ElementType::Paragraph, ElementType::Image, ElementType::Button]
        );
        assert_eq!(els[0].id, "el_1");
        assert_eq!(els[0].tag, "h2");
        assert_eq!(els[2].src.as_deref(), Some("https://shop.test/hero.png"));
        assert_eq!(els[3].href.as_deref(), Some("https://shop.test/go"));
    }

    #[test]
    fn style_lookup_first_match_by_tag_or_class() {
        let styles = vec![style("div.hero", "red"), style("a.btn.primary", "blue"), style("h2", "green")];
        let ex = ElementExtractor::new(&styles, None, 20);
        assert_eq!(ex.lookup_style("h2", &[]).get("color").map(String::as_str), Some("green"));
        let classes = vec!["btn".to_string(), "primary".to_string()];
        assert_eq!(ex.lookup_style("button", &classes).get("color").map(String::as_str), Some("blue"));
        assert!(ex.lookup_style("span", &[]).is_empty());
    }

    #[test]
    fn cards_are_grouped_with_offer_ids() {
        let doc = Html::parse_fragment(
            "<h2>Plans</h2>\
             <div class=\"card\" id=\"basic\"><h3>Basic</h3><a class=\"btn\" href=\"#b\">Buy</a></div>\
             <div class=\"card\"><h3>Pro</h3></div>",
        );
        let root = doc.root_element();
        let mut ex = ElementExtractor::new(&[], None, 20);
        let flat = ex.extract(root, true);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].content.as_deref(), Some("Plans"));

        let cards = ex.extract_cards(root);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].data_attributes.get("offer-id").map(String::as_str), Some("basic"));
        assert_eq!(cards[1].data_attributes.get("offer-id").map(String::as_str), Some("offer_1"));
        assert_eq!(cards[0].children.len(), 2);
        assert_eq!(cards[0].id, "el_2");
        assert_eq!(cards[0].children[0].id, "el_3");
    }
}
