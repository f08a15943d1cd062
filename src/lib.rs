//! RFox Page Cloner
//!
//! Turns a single rendered web page into a self-contained, human-editable
//! HTML approximation of that page, then tunes the approximation against
//! screenshots of the original until a visual-similarity budget is met or an
//! iteration cap is reached.
//!
//! # Pipeline
//!
//! - [`analyzer`]: raw page markup + computed styles -> [`LayoutModel`]
//! - [`generator`]: [`LayoutModel`] -> one HTML document
//! - [`scoring`]: generated document vs. reference screenshots -> mismatch %
//! - [`refine`]: the bounded Generate -> Score -> Adjust state machine
//!
//! Browser automation is behind the [`render::PageRenderer`] and
//! [`render::MarkupRenderer`] traits; the `cdp` feature provides a
//! headless Chrome backend.
//!
//! # Example
//!
//! ```
//! use rfclone::{analyzer, generator, render::RenderedPage, CloneConfig};
//!
//! let page = RenderedPage {
//!     title: "Hello".to_string(),
//!     body_html: "<header class=\"site-header\"><h1>Hello there, visitor, and welcome to our site</h1></header>"
//!         .to_string(),
//!     ..Default::default()
//! };
//! let config = CloneConfig::default();
//! let model = analyzer::analyze(&page, &config);
//! let html = generator::generate(&model, &page.title, &page.description);
//! assert!(html.contains("<header id=\"header_0\""));
//! assert!(!html.contains("<main"));
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod error;
pub use error::{Error, Result};

pub mod analyzer;
pub mod artifacts;
pub mod generator;
pub mod jobs;
pub mod model;
pub mod pipeline;
pub mod refine;
pub mod render;
pub mod scoring;

pub use model::{Element, ElementType, LayoutModel, Section, SectionType};
pub use pipeline::clone_page;
pub use refine::{RefinementOutcome, Terminal};
pub use scoring::{Score, VisualScorer};

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const DESKTOP: Viewport = Viewport { width: 1440, height: 900 };
    pub const MOBILE: Viewport = Viewport { width: 390, height: 844 };

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::DESKTOP
    }
}

/// Which of the two captures a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewportKind {
    Desktop,
    Mobile,
}

impl ViewportKind {
    pub const ALL: [ViewportKind; 2] = [ViewportKind::Desktop, ViewportKind::Mobile];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewportKind::Desktop => "desktop",
            ViewportKind::Mobile => "mobile",
        }
    }
}

/// The two fixed capture sizes every job renders at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportPair {
    pub desktop: Viewport,
    pub mobile: Viewport,
}

impl ViewportPair {
    pub fn get(&self, kind: ViewportKind) -> Viewport {
        match kind {
            ViewportKind::Desktop => self.desktop,
            ViewportKind::Mobile => self.mobile,
        }
    }
}

impl Default for ViewportPair {
    fn default() -> Self {
        Self {
            desktop: Viewport::DESKTOP,
            mobile: Viewport::MOBILE,
        }
    }
}

/// Configuration for a clone job
///
/// Every contract constant lives here with its default so that nothing in
/// the pipeline depends on a hidden magic number.
///
/// # Examples
///
/// ```
/// let cfg = rfclone::CloneConfig::default();
/// assert_eq!(cfg.max_iterations, 3);
/// assert_eq!(cfg.desktop_budget, 6.0);
/// assert_eq!(cfg.viewports.mobile.width, 390);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneConfig {
    /// Capture sizes for reference and generated screenshots
    pub viewports: ViewportPair,
    /// Maximum desktop mismatch percentage for a passing verdict
    pub desktop_budget: f64,
    /// Maximum mobile mismatch percentage for a passing verdict
    pub mobile_budget: f64,
    /// Upper bound on Generate/Score cycles per job
    pub max_iterations: u32,
    /// Per-pixel color sensitivity handed to the comparator (0.0-1.0)
    pub sensitivity: f64,
    /// Whether anti-aliased pixels are tolerated by the comparator
    pub anti_aliasing_tolerance: bool,
    /// Blocks whose inner markup is shorter than this are dropped as noise
    pub min_block_length: usize,
    /// Paragraphs with less text than this are skipped
    pub min_paragraph_length: usize,
    /// Content max width written into global styles (px)
    pub content_max_width: f64,
    /// Timeout for page loads and captures in milliseconds
    pub timeout_ms: u64,
    /// Where per-iteration artifacts are written; `None` disables persistence
    pub artifact_dir: Option<PathBuf>,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            viewports: ViewportPair::default(),
            desktop_budget: 6.0,
            mobile_budget: 8.0,
            max_iterations: 3,
            sensitivity: 0.1,
            anti_aliasing_tolerance: true,
            min_block_length: 40,
            min_paragraph_length: 20,
            content_max_width: 1200.0,
            timeout_ms: 30000,
            artifact_dir: None,
        }
    }
}

impl CloneConfig {
    /// Load a configuration from a TOML file; missing keys keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CloneConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        for (name, vp) in [("desktop", self.viewports.desktop), ("mobile", self.viewports.mobile)] {
            if vp.width == 0 || vp.height == 0 {
                return Err(Error::ConfigError(format!("{} viewport must be non-empty", name)));
            }
        }
        if self.max_iterations == 0 {
            return Err(Error::ConfigError("max_iterations must be at least 1".into()));
        }
        for (name, budget) in [("desktop_budget", self.desktop_budget), ("mobile_budget", self.mobile_budget)] {
            if !(0.0..=100.0).contains(&budget) {
                return Err(Error::ConfigError(format!("{} must be within 0-100, got {}", name, budget)));
            }
        }
        if !(0.0..=1.0).contains(&self.sensitivity) {
            return Err(Error::ConfigError(format!(
                "sensitivity must be within 0-1, got {}",
                self.sensitivity
            )));
        }
        Ok(())
    }
}
