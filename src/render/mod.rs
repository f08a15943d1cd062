//! Renderer collaborators
//!
//! The cloner never drives a browser directly. It talks to a
//! [`PageRenderer`] to load the target page and to a [`MarkupRenderer`] to
//! screenshot generated documents. Backends live behind features:
//!
//! - `cdp`: headless Chrome over the DevTools protocol ([`cdp::CdpRenderer`])
//! - `fetch`: plain HTTP fetch without styles or screenshots ([`fetch::HttpRenderer`])

use crate::{Error, Result, Viewport, ViewportKind};
use image::{ImageFormat, RgbaImage};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

#[cfg(feature = "cdp")]
pub mod cdp;

#[cfg(feature = "fetch")]
pub mod fetch;

/// Computed style snapshot for one element, as reported by the renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComputedStyle {
    pub font_size: Option<String>,
    pub font_weight: Option<String>,
    pub font_family: Option<String>,
    pub line_height: Option<String>,
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub text_align: Option<String>,
    pub margin: Option<String>,
    pub padding: Option<String>,
    pub border_radius: Option<String>,
    pub box_shadow: Option<String>,
    pub letter_spacing: Option<String>,
}

impl ComputedStyle {
    /// Flatten to CSS property -> value, dropping empty and no-op values
    pub fn to_style_map(&self) -> crate::model::StyleMap {
        let pairs = [
            ("font-size", &self.font_size),
            ("font-weight", &self.font_weight),
            ("font-family", &self.font_family),
            ("line-height", &self.line_height),
            ("color", &self.color),
            ("background-color", &self.background_color),
            ("text-align", &self.text_align),
            ("margin", &self.margin),
            ("padding", &self.padding),
            ("border-radius", &self.border_radius),
            ("box-shadow", &self.box_shadow),
            ("letter-spacing", &self.letter_spacing),
        ];
        pairs
            .into_iter()
            .filter_map(|(k, v)| {
                let v = v.as_deref()?.trim();
                if v.is_empty() || matches!(v, "none" | "normal" | "rgba(0, 0, 0, 0)" | "0px") {
                    None
                } else {
                    Some((k.to_string(), v.to_string()))
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One selector -> computed style entry. Entries keep the renderer's
/// document order, which is what "first match wins" lookups rely on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleEntry {
    pub selector: String,
    pub style: ComputedStyle,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// Colors observed on the page, most frequent first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSamples {
    pub backgrounds: Vec<String>,
    pub texts: Vec<String>,
    /// Colors seen on links, buttons and call-to-action elements
    pub accents: Vec<String>,
}

/// An encoded PNG capture
#[derive(Debug, Clone, PartialEq)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

impl Screenshot {
    /// Wrap encoded PNG bytes, reading the dimensions from the header
    pub fn from_png(png_data: Vec<u8>) -> Result<Self> {
        let img = image::load_from_memory_with_format(&png_data, ImageFormat::Png)
            .map_err(|e| Error::ImageError(format!("Failed to decode PNG: {}", e)))?;
        Ok(Self {
            width: img.width(),
            height: img.height(),
            png_data,
        })
    }

    pub fn from_rgba(img: &RgbaImage) -> Result<Self> {
        Ok(Self {
            width: img.width(),
            height: img.height(),
            png_data: encode_png(img)?,
        })
    }

    /// A single-color capture, handy for fixtures and blank references
    pub fn solid(viewport: Viewport, rgba: [u8; 4]) -> Result<Self> {
        let img = RgbaImage::from_pixel(viewport.width, viewport.height, image::Rgba(rgba));
        Self::from_rgba(&img)
    }

    pub fn decode(&self) -> Result<RgbaImage> {
        decode_png(&self.png_data)
    }
}

/// Desktop + mobile captures of the same document
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotPair {
    pub desktop: Screenshot,
    pub mobile: Screenshot,
}

impl ScreenshotPair {
    pub fn get(&self, kind: ViewportKind) -> &Screenshot {
        match kind {
            ViewportKind::Desktop => &self.desktop,
            ViewportKind::Mobile => &self.mobile,
        }
    }
}

/// Everything the analyzer and scorer need from a rendered target page
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderedPage {
    /// Final URL after redirects
    pub url: String,
    pub title: String,
    /// Content of the description meta tag
    pub description: String,
    /// Inner markup of `<body>`
    pub body_html: String,
    pub computed_styles: Vec<StyleEntry>,
    pub images: Vec<String>,
    pub fonts: Vec<String>,
    pub colors: ColorSamples,
    /// Reference captures; absent for backends that cannot take screenshots
    #[serde(skip)]
    pub screenshots: Option<ScreenshotPair>,
}

/// Read title, description, body and image sources out of a full document
pub fn page_from_markup(url: &str, html: &str) -> RenderedPage {
    let document = Html::parse_document(html);
    let title_sel = Selector::parse("title").unwrap();
    let desc_sel = Selector::parse("meta[name=\"description\"]").unwrap();
    let body_sel = Selector::parse("body").unwrap();
    let img_sel = Selector::parse("img[src]").unwrap();

    let title = document
        .select(&title_sel)
        .next()
        .map(|n| n.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let description = document
        .select(&desc_sel)
        .next()
        .and_then(|n| n.value().attr("content"))
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let body_html = document
        .select(&body_sel)
        .next()
        .map(|b| b.inner_html())
        .unwrap_or_default();

    let images = document
        .select(&img_sel)
        .filter_map(|n| n.value().attr("src"))
        .map(|s| s.to_string())
        .collect();

    RenderedPage {
        url: url.to_string(),
        title,
        description,
        body_html,
        images,
        ..Default::default()
    }
}

/// Loads a target page and reports its content
pub trait PageRenderer {
    fn render_url(&mut self, url: &str) -> Result<RenderedPage>;
}

/// Screenshots a generated document at the desktop and mobile viewports
pub trait MarkupRenderer {
    fn render_markup(&mut self, html: &str) -> Result<ScreenshotPair>;
}

impl<T: PageRenderer + ?Sized> PageRenderer for Box<T> {
    fn render_url(&mut self, url: &str) -> Result<RenderedPage> {
        (**self).render_url(url)
    }
}

impl<T: MarkupRenderer + ?Sized> MarkupRenderer for Box<T> {
    fn render_markup(&mut self, html: &str) -> Result<ScreenshotPair> {
        (**self).render_markup(html)
    }
}

/// A job-local rendering context able to do both
pub trait RenderSession: PageRenderer + MarkupRenderer + Send {}

impl<T> RenderSession for T where T: PageRenderer + MarkupRenderer + Send {}

/// Decode PNG bytes into an RGBA image.
pub fn decode_png(data: &[u8]) -> Result<RgbaImage> {
    image::load_from_memory_with_format(data, ImageFormat::Png)
        .map(|img| img.to_rgba8())
        .map_err(|e| Error::ImageError(format!("Failed to decode PNG: {}", e)))
}

/// Encode an RGBA image to PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| Error::ImageError(format!("Failed to encode PNG: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_from_markup_reads_head_and_body() {
        let html = r#"<html><head><title> Hi </title><meta name="description" content="A page"></head>
            <body><h1>Hello world</h1><img src="/a.png"></body></html>"#;
        let page = page_from_markup("http://x.test/", html);
        assert_eq!(page.title, "Hi");
        assert_eq!(page.description, "A page");
        assert!(page.body_html.contains("<h1>Hello world</h1>"));
        assert_eq!(page.images, vec!["/a.png".to_string()]);
        assert!(page.screenshots.is_none());
    }

    #[test]
    fn screenshot_round_trips_dimensions() {
        let shot = Screenshot::solid(Viewport { width: 12, height: 7 }, [255, 255, 255, 255]).unwrap();
        assert_eq!(&shot.png_data[0..8], b"\x89PNG\r\n\x1a\n");
        let again = Screenshot::from_png(shot.png_data.clone()).unwrap();
        assert_eq!((again.width, again.height), (12, 7));
        assert_eq!(again.decode().unwrap().get_pixel(3, 3).0, [255, 255, 255, 255]);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode_png(b"not a png"), Err(Error::ImageError(_))));
    }

    #[test]
    fn style_map_drops_noop_values() {
        let style = ComputedStyle {
            font_size: Some("18px".into()),
            box_shadow: Some("none".into()),
            background_color: Some("rgba(0, 0, 0, 0)".into()),
            color: Some(" ".into()),
            ..Default::default()
        };
        let map = style.to_style_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("font-size").map(String::as_str), Some("18px"));
    }

    #[test]
    fn rendered_page_parses_extractor_json() {
        let json = r##"{
            "title": "Shop",
            "bodyHtml": "<main></main>",
            "computedStyles": [{"selector": "h1.title", "style": {"fontSize": "40px"}, "box": {"x": 0, "y": 0, "width": 100, "height": 40}}],
            "colors": {"backgrounds": ["rgb(255, 255, 255)"], "texts": [], "accents": ["#0af"]}
        }"##;
        let page: RenderedPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.title, "Shop");
        assert_eq!(page.computed_styles[0].style.font_size.as_deref(), Some("40px"));
        assert_eq!(page.computed_styles[0].bbox.width, 100.0);
        assert!(page.screenshots.is_none());
    }
}
