//! Markup generator: [`LayoutModel`] -> one self-contained HTML document
//!
//! Output depends only on the model and the title/description strings.
//! Sections are emitted in ascending `order`, every style map is walked in
//! key order, and the script and base stylesheet are constants, so the same
//! input always yields byte-identical output.

pub mod css;

use crate::model::{Element, ElementType, LayoutModel, Section, SectionType, StyleMap};
use std::fmt::Write;

/// Smooth scrolling for in-page anchors and a `loaded` marker class.
pub const SCRIPT: &str = r##"(function () {
  document.addEventListener('click', function (event) {
    var link = event.target.closest ? event.target.closest('a[href^="#"]') : null;
    if (!link) { return; }
    var id = link.getAttribute('href').slice(1);
    var target = id ? document.getElementById(id) : null;
    if (target) {
      event.preventDefault();
      target.scrollIntoView({ behavior: 'smooth', block: 'start' });
    }
  });
  window.addEventListener('load', function () {
    document.body.classList.add('loaded');
  });
})();
"##;

/// Layout declarations that belong on the section box itself; the rest
/// (display mode and its knobs) go on the inner container.
const SECTION_BOX_PROPERTIES: [&str; 3] = ["padding", "margin", "--section-max-width"];

/// Escape text and attribute values
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Flatten a style map to `prop: value; prop: value`, skipping empty values
pub fn inline_style(styles: &StyleMap) -> String {
    declarations_to_css(styles.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

fn declarations_to_css<'a>(decls: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    decls
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| format!("{}: {}", k, v.trim()))
        .collect::<Vec<_>>()
        .join("; ")
}

fn style_attr(style: &str) -> String {
    if style.is_empty() {
        String::new()
    } else {
        format!(" style=\"{}\"", escape(style))
    }
}

/// Only lowercase alphanumerics and dashes survive in a `data-*` name
fn data_attr_name(key: &str) -> Option<String> {
    let name: String = key
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let name = name.trim_matches('-').to_string();
    (!name.is_empty()).then_some(name)
}

fn heading_tag(tag: &str) -> &str {
    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => tag,
        _ => "h2",
    }
}

/// Render one element (and its children) at the given indent depth
pub fn render_element(out: &mut String, el: &Element, depth: usize) {
    let pad = "  ".repeat(depth);
    let style = style_attr(&inline_style(&el.styles));
    let text = escape(el.content.as_deref().unwrap_or(""));

    match el.element_type {
        ElementType::Heading => {
            let tag = heading_tag(&el.tag);
            let _ = writeln!(out, "{pad}<{tag}{style}>{text}</{tag}>");
        }
        ElementType::Paragraph => {
            let _ = writeln!(out, "{pad}<p{style}>{text}</p>");
        }
        ElementType::Image => {
            let src = escape(el.src.as_deref().unwrap_or(""));
            let alt = escape(el.alt.as_deref().unwrap_or(""));
            let _ = writeln!(out, "{pad}<img src=\"{src}\" alt=\"{alt}\" loading=\"lazy\"{style} />");
        }
        ElementType::Button => {
            let href = escape(el.href.as_deref().unwrap_or("#"));
            let _ = writeln!(out, "{pad}<a href=\"{href}\" class=\"btn btn-primary\"{style}>{text}</a>");
        }
        ElementType::Link => {
            let href = escape(el.href.as_deref().unwrap_or("#"));
            let _ = writeln!(out, "{pad}<a href=\"{href}\"{style}>{text}</a>");
        }
        ElementType::List => {
            let _ = writeln!(out, "{pad}<ul{style}>");
            for child in &el.children {
                render_element(out, child, depth + 1);
            }
            let _ = writeln!(out, "{pad}</ul>");
        }
        ElementType::ListItem => {
            if el.children.is_empty() {
                let _ = writeln!(out, "{pad}<li{style}>{text}</li>");
            } else {
                let _ = writeln!(out, "{pad}<li{style}>{text}");
                for child in &el.children {
                    render_element(out, child, depth + 1);
                }
                let _ = writeln!(out, "{pad}</li>");
            }
        }
        ElementType::Card => {
            let mut attrs = String::new();
            for (key, value) in &el.data_attributes {
                if let Some(name) = data_attr_name(key) {
                    let _ = write!(attrs, " data-{}=\"{}\"", name, escape(value));
                }
            }
            let _ = writeln!(out, "{pad}<div class=\"offer-card\"{attrs}{style}>");
            for child in &el.children {
                render_element(out, child, depth + 1);
            }
            let _ = writeln!(out, "{pad}</div>");
        }
        ElementType::Container => {
            let _ = writeln!(out, "{pad}<div{style}>");
            for child in &el.children {
                render_element(out, child, depth + 1);
            }
            let _ = writeln!(out, "{pad}</div>");
        }
        ElementType::Divider => {
            let _ = writeln!(out, "{pad}<hr{style} />");
        }
        ElementType::Text => {
            let _ = writeln!(out, "{pad}<span{style}>{text}</span>");
        }
    }
}

/// Render one section: semantic tag, type class, anchor id and the uniform
/// inner container holding its children.
pub fn render_section(out: &mut String, section: &Section) {
    let tag = section.section_type.semantic_tag();
    let declarations = section.layout.declarations();
    let (box_decls, flow_decls): (Vec<_>, Vec<_>) = declarations
        .iter()
        .partition(|(k, _)| SECTION_BOX_PROPERTIES.contains(&k.as_str()));

    let section_style = declarations_to_css(
        box_decls
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(section.styles.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
    );
    let container_style = declarations_to_css(flow_decls.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let offer_attr = if section.section_type == SectionType::OfferCard {
        format!(" data-offer-id=\"{}\"", escape(&section.id))
    } else {
        String::new()
    };

    let _ = writeln!(
        out,
        "  <{tag} id=\"{id}\" class=\"{class}\"{offer_attr}{style}>",
        id = escape(&section.id),
        class = section.section_type.as_str(),
        style = style_attr(&section_style),
    );
    let _ = writeln!(out, "    <div class=\"container\"{}>", style_attr(&container_style));
    for el in &section.children {
        render_element(out, el, 3);
    }
    let _ = writeln!(out, "    </div>");
    let _ = writeln!(out, "  </{tag}>");
}

/// Generate the complete document for `model`
pub fn generate(model: &LayoutModel, title: &str, description: &str) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    out.push_str("  <meta charset=\"utf-8\" />\n");
    out.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
    let _ = writeln!(out, "  <title>{}</title>", escape(title));
    let _ = writeln!(out, "  <meta name=\"description\" content=\"{}\" />", escape(description));
    out.push_str("  <style>\n");
    out.push_str(&css::stylesheet(model));
    out.push_str("  </style>\n</head>\n<body>\n");

    for section in model.ordered_sections() {
        render_section(&mut out, section);
    }

    out.push_str("  <script>\n");
    out.push_str(SCRIPT);
    out.push_str("  </script>\n</body>\n</html>\n");
    out
}
