//! Keyword rules mapping a block to a section type
//!
//! Rules are checked in a fixed order and the first match wins. The order
//! is part of the contract: it decides every tie.

use super::segment::{class_tokens, Block};
use crate::model::SectionType;
use scraper::ElementRef;

struct Rule {
    section_type: SectionType,
    tags: &'static [&'static str],
    class_keywords: &'static [&'static str],
    markup_keywords: &'static [&'static str],
}

impl Rule {
    fn matches(&self, block: &Block<'_>, class_text: &str, markup: &str) -> bool {
        self.tags.contains(&block.tag.as_str())
            || self.class_keywords.iter().any(|k| class_text.contains(k))
            || self.markup_keywords.iter().any(|k| markup.contains(k))
    }
}

const RULES: [Rule; 7] = [
    Rule {
        section_type: SectionType::Header,
        tags: &["header"],
        class_keywords: &["header", "navbar", "topbar"],
        markup_keywords: &["<nav"],
    },
    Rule {
        section_type: SectionType::Footer,
        tags: &["footer"],
        class_keywords: &["footer"],
        markup_keywords: &["&copy;", "\u{a9}"],
    },
    Rule {
        section_type: SectionType::Hero,
        tags: &[],
        class_keywords: &["hero", "banner", "jumbotron", "masthead"],
        markup_keywords: &[],
    },
    Rule {
        // Refined into OfferList / OfferCard below
        section_type: SectionType::OfferList,
        tags: &[],
        class_keywords: &["offer", "card", "pricing", "plan", "product"],
        markup_keywords: &["class=\"offer", "class=\"card", "data-offer"],
    },
    Rule {
        section_type: SectionType::Cta,
        tags: &[],
        class_keywords: &["cta", "action", "signup", "subscribe"],
        markup_keywords: &[],
    },
    Rule {
        section_type: SectionType::Features,
        tags: &[],
        class_keywords: &["feature"],
        markup_keywords: &[],
    },
    Rule {
        section_type: SectionType::Testimonials,
        tags: &[],
        class_keywords: &["testimonial", "review"],
        markup_keywords: &["<blockquote"],
    },
];

const CARD_KEYWORDS: [&str; 2] = ["card", "offer"];

/// Whether an element's class list marks it as an offer card
pub fn is_card(node: ElementRef<'_>) -> bool {
    class_tokens(node)
        .iter()
        .any(|c| CARD_KEYWORDS.iter().any(|k| c.contains(k)))
}

/// Number of card-classed elements strictly inside `root`
pub fn card_count(root: ElementRef<'_>) -> usize {
    root.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|e| is_card(*e))
        .count()
}

/// Classify a block; falls back to `Content` when no rule matches
pub fn classify(block: &Block<'_>) -> SectionType {
    let class_text = block.class_text();
    let markup = block.inner_html.to_ascii_lowercase();

    let matched = RULES
        .iter()
        .find(|r| r.matches(block, &class_text, &markup))
        .map(|r| r.section_type)
        .unwrap_or(SectionType::Content);

    match matched {
        SectionType::OfferList if card_count(block.node) < 2 => SectionType::OfferCard,
        other => other,
    }
}
