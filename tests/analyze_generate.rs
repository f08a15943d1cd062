//! Analyzer and generator over a realistic landing page

use rfclone::model::{ElementType, LayoutModel, SectionType};
use rfclone::render::{page_from_markup, RenderedPage};
use rfclone::{analyzer, generator, CloneConfig};

const LANDING: &str = include_str!("fixtures/landing.html");

fn landing() -> (RenderedPage, LayoutModel) {
    let page = page_from_markup("https://acme.test/", LANDING);
    let model = analyzer::analyze(&page, &CloneConfig::default());
    (page, model)
}

#[test]
fn test_landing_sections_in_document_order() {
    let (page, model) = landing();
    assert_eq!(page.title, "Acme Plans");

    let types: Vec<SectionType> = model.ordered_sections().iter().map(|s| s.section_type).collect();
    assert_eq!(
        types,
        vec![
            SectionType::Header,
            SectionType::Hero,
            SectionType::OfferList,
            SectionType::Testimonials,
            SectionType::Footer,
        ]
    );
    let orders: Vec<u32> = model.sections.iter().map(|s| s.order).collect();
    assert_eq!(orders, vec![0, 1, 2, 3, 4]);
    assert_eq!(model.sections[2].id, "offer_list_2");
    assert!(model.validate().is_ok());
}

#[test]
fn test_landing_elements_and_links() {
    let (_, model) = landing();

    let header = &model.sections[0];
    assert_eq!(header.children[0].element_type, ElementType::Heading);
    assert_eq!(header.children[1].element_type, ElementType::Link);
    assert_eq!(header.children[1].href.as_deref(), Some("https://acme.test/about"));

    let hero = &model.sections[1];
    let kinds: Vec<ElementType> = hero.children.iter().map(|e| e.element_type).collect();
    assert_eq!(
        kinds,
        vec![ElementType::Heading, ElementType::Paragraph, ElementType::Image, ElementType::Button]
    );
    assert_eq!(hero.children[2].src.as_deref(), Some("https://acme.test/img/hero.png"));
    assert_eq!(hero.children[2].alt.as_deref(), Some("Dashboard screenshot"));
    assert_eq!(hero.children[3].href.as_deref(), Some("https://acme.test/signup"));
}

#[test]
fn test_landing_offer_cards_are_grouped() {
    let (_, model) = landing();
    let offers = &model.sections[2];

    // The section heading stays outside the cards
    assert_eq!(offers.children[0].content.as_deref(), Some("Plans"));

    let cards: Vec<_> = offers
        .children
        .iter()
        .filter(|e| e.element_type == ElementType::Card)
        .collect();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].data_attributes.get("offer-id").map(String::as_str), Some("basic"));
    assert_eq!(cards[1].data_attributes.get("offer-id").map(String::as_str), Some("pro"));
    assert_eq!(cards[1].children.len(), 3);
    assert_eq!(cards[1].children[2].element_type, ElementType::Button);

    // Nothing that belongs to a card leaks into the flat list
    assert!(offers
        .children
        .iter()
        .all(|e| e.element_type == ElementType::Card || e.content.as_deref() != Some("Basic")));
}

#[test]
fn test_generated_document_reflects_model() {
    let (page, model) = landing();
    let html = generator::generate(&model, &page.title, &page.description);

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Acme Plans</title>"));
    assert!(html.contains("content=\"Pick the Acme plan that fits your team\""));
    assert!(html.contains("<header id=\"header_0\" class=\"header\""));
    assert!(html.contains("<footer id=\"footer_4\" class=\"footer\""));
    assert!(html.contains("data-offer-id=\"basic\""));
    assert!(html.contains("data-offer-id=\"pro\""));
    assert!(html.contains("<a href=\"https://acme.test/signup\" class=\"btn btn-primary\">Start free</a>"));
    assert!(html.contains("href=\"https://acme.test/buy?plan=pro&amp;period=year\""));
    assert!(html.contains("<img src=\"https://acme.test/img/hero.png\" alt=\"Dashboard screenshot\" loading=\"lazy\" />"));

    // Sections come out in order
    let positions: Vec<usize> = ["id=\"header_0\"", "id=\"hero_1\"", "id=\"offer_list_2\"", "id=\"testimonials_3\"", "id=\"footer_4\""]
        .iter()
        .map(|needle| html.find(needle).expect(needle))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    // Self-contained and editable
    assert!(!html.contains("<link"));
    assert!(!html.contains("position: absolute"));
    assert!(!html.contains("analytics and other noise"));
}

#[test]
fn test_generation_is_byte_stable_across_json_round_trip() {
    let (page, model) = landing();
    let json = model.to_json_pretty().unwrap();
    let restored = LayoutModel::from_json(&json).unwrap();
    assert_eq!(restored.fingerprint(), model.fingerprint());
    assert_eq!(
        generator::generate(&model, &page.title, &page.description),
        generator::generate(&restored, &page.title, &page.description)
    );
}

#[test]
fn test_empty_page_still_generates() {
    let page = page_from_markup("", "<html><body></body></html>");
    let model = analyzer::analyze(&page, &CloneConfig::default());
    assert_eq!(model.sections.len(), 1);
    assert_eq!(model.sections[0].section_type, SectionType::Content);
    let html = generator::generate(&model, "", "");
    assert!(html.contains("<main id=\"content_0\" class=\"content\""));
}
