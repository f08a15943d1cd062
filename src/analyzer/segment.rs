//! Splitting the body into top-level structural blocks

use scraper::ElementRef;

/// Tags that start a structural block
pub const BLOCK_TAGS: [&str; 6] = ["header", "section", "main", "footer", "article", "div"];

/// Subtrees that never contribute content
const SKIPPED_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "svg"];

/// A top-level region of the body, in document order
#[derive(Debug, Clone)]
pub struct Block<'a> {
    pub node: ElementRef<'a>,
    pub tag: String,
    pub classes: Vec<String>,
    pub id: Option<String>,
    pub inner_html: String,
}

impl<'a> Block<'a> {
    fn from_node(node: ElementRef<'a>) -> Self {
        let el = node.value();
        Block {
            node,
            tag: el.name().to_ascii_lowercase(),
            classes: class_tokens(node),
            id: el.attr("id").map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            inner_html: node.inner_html(),
        }
    }

    /// Lowercased class list plus id, the haystack keyword rules run against
    pub fn class_text(&self) -> String {
        let mut text = self.classes.join(" ");
        if let Some(id) = &self.id {
            text.push(' ');
            text.push_str(&id.to_ascii_lowercase());
        }
        text
    }
}

/// Lowercased class tokens of an element
pub fn class_tokens(node: ElementRef<'_>) -> Vec<String> {
    node.value()
        .attr("class")
        .unwrap_or("")
        .split_whitespace()
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn is_block_tag(name: &str) -> bool {
    BLOCK_TAGS.contains(&name)
}

fn element_children<'a>(node: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    node.children().filter_map(ElementRef::wrap)
}

/// A `div`/`main` whose children are themselves several blocks is a layout
/// wrapper, not a section of its own.
fn is_wrapper(node: ElementRef<'_>) -> bool {
    let name = node.value().name();
    if name != "div" && name != "main" {
        return false;
    }
    element_children(node)
        .filter(|c| is_block_tag(&c.value().name().to_ascii_lowercase()))
        .count()
        >= 2
}

fn visit<'a>(node: ElementRef<'a>, min_len: usize, out: &mut Vec<Block<'a>>) {
    for child in element_children(node) {
        let name = child.value().name().to_ascii_lowercase();
        if SKIPPED_TAGS.contains(&name.as_str()) {
            continue;
        }
        if !is_block_tag(&name) {
            visit(child, min_len, out);
            continue;
        }
        if is_wrapper(child) {
            visit(child, min_len, out);
            continue;
        }
        let block = Block::from_node(child);
        if block.inner_html.trim().len() < min_len {
            continue;
        }
        out.push(block);
    }
}

/// Top-most block-level elements under `root`, in document order.
///
/// Blocks whose inner markup is shorter than `min_len` are discarded as
/// noise; wrappers are descended into instead of being kept.
pub fn segment<'a>(root: ElementRef<'a>, min_len: usize) -> Vec<Block<'a>> {
    let mut blocks = Vec::new();
    visit(root, min_len, &mut blocks);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn tags(html: &str, min_len: usize) -> Vec<String> {
        let doc = Html::parse_fragment(html);
        segment(doc.root_element(), min_len)
            .into_iter()
            .map(|b| b.tag)
            .collect()
    }

    #[test]
    fn finds_top_level_blocks_in_order() {
        let html = "<header><h1>Site name goes here</h1></header>\
                    <section class=\"Hero\"><p>Big welcome message text</p></section>\
                    <footer><p>Copyright notice and links</p></footer>";
        assert_eq!(tags(html, 10), vec!["header", "section", "footer"]);

        let doc = Html::parse_fragment(html);
        let blocks = segment(doc.root_element(), 10);
        assert_eq!(blocks[1].classes, vec!["hero".to_string()]);
    }

    #[test]
    fn unwraps_layout_wrappers() {
        let html = "<div id=\"app\"><div class=\"a\"><p>first block of some text</p></div>\
                    <div class=\"b\"><p>second block of some text</p></div></div>";
        let doc = Html::parse_fragment(html);
        let blocks = segment(doc.root_element(), 10);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].classes, vec!["a".to_string()]);
    }

    #[test]
    fn drops_short_blocks_and_scripts() {
        let html = "<div>x</div><script>var a = '<section>long enough text here</section>';</script>\
                    <article><p>An article body that is long enough</p></article>";
        assert_eq!(tags(html, 20), vec!["article"]);
    }

    #[test]
    fn descends_through_non_block_tags() {
        let html = "<nav><span><section><p>nested section with text</p></section></span></nav>";
        assert_eq!(tags(html, 10), vec!["section"]);
    }

    #[test]
    fn no_blocks_in_plain_text() {
        assert!(tags("<p>just a paragraph, nothing structural</p>", 10).is_empty());
    }
}
