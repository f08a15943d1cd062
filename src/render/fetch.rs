//! A lightweight, browser-less renderer that fetches HTML over HTTP.
//!
//! This backend performs an HTTP GET and reads the title, description, body
//! markup and image sources straight from the response. It has no layout
//! engine, so computed styles and color samples stay empty and screenshots
//! are not available: it is enough for `analyze`/`generate`, not for scoring.

use crate::render::{page_from_markup, MarkupRenderer, PageRenderer, RenderedPage, ScreenshotPair};
use crate::{CloneConfig, Error, Result};
use log::debug;
use reqwest::blocking::Client;
use std::time::Duration;

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/115.0 RFOX-Clone/0.1";

pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(config: &CloneConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::LoadError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl PageRenderer for HttpRenderer {
    fn render_url(&mut self, url: &str) -> Result<RenderedPage> {
        let res = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::LoadError(format!("HTTP GET failed: {}", e)))?;

        if !res.status().is_success() {
            return Err(Error::LoadError(format!("{} answered {}", url, res.status())));
        }
        let final_url = res.url().to_string();

        let body = res
            .text()
            .map_err(|e| Error::LoadError(format!("Failed to read response body: {}", e)))?;
        debug!("fetched {} bytes from {}", body.len(), final_url);

        Ok(page_from_markup(&final_url, &body))
    }
}

impl MarkupRenderer for HttpRenderer {
    fn render_markup(&mut self, _html: &str) -> Result<ScreenshotPair> {
        Err(Error::RenderError(
            "Screenshots are not supported by HttpRenderer".into(),
        ))
    }
}
