//! Inspection artifacts written while a job runs
//!
//! Layout:
//!
//! ```text
//! <root>/layout.json
//! <root>/reference-{desktop,mobile}.png
//! <root>/iteration-{n}.html
//! <root>/diff-{desktop,mobile}-{n}.png
//! <root>/final.html
//! <root>/report.json
//! ```
//!
//! A store without a root accepts every write and does nothing, so callers
//! never branch on whether persistence is enabled.

use crate::model::LayoutModel;
use crate::render::{encode_png, Screenshot};
use crate::{CloneConfig, Error, Result, ViewportKind};
use image::RgbaImage;
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    root: Option<PathBuf>,
}

impl ArtifactStore {
    /// A store that writes nothing
    pub fn disabled() -> Self {
        Self { root: None }
    }

    /// A store rooted at `root`, created if missing
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| Error::ArtifactError(format!("Failed to create {}: {}", root.display(), e)))?;
        Ok(Self { root: Some(root) })
    }

    pub fn from_config(config: &CloneConfig) -> Result<Self> {
        match &config.artifact_dir {
            Some(dir) => Self::new(dir),
            None => Ok(Self::disabled()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.root.is_some()
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<Option<PathBuf>> {
        let Some(root) = &self.root else {
            return Ok(None);
        };
        let path = root.join(name);
        fs::write(&path, bytes)
            .map_err(|e| Error::ArtifactError(format!("Failed to write {}: {}", path.display(), e)))?;
        debug!("wrote artifact {}", path.display());
        Ok(Some(path))
    }

    pub fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<Option<PathBuf>> {
        if !self.is_enabled() {
            return Ok(None);
        }
        let json = serde_json::to_vec_pretty(value)?;
        self.write(name, &json)
    }

    pub fn write_layout(&self, model: &LayoutModel) -> Result<Option<PathBuf>> {
        self.write_json("layout.json", model)
    }

    pub fn write_reference(&self, kind: ViewportKind, shot: &Screenshot) -> Result<Option<PathBuf>> {
        self.write(&format!("reference-{}.png", kind.as_str()), &shot.png_data)
    }

    pub fn write_iteration(&self, iteration: u32, html: &str) -> Result<Option<PathBuf>> {
        self.write(&format!("iteration-{}.html", iteration), html.as_bytes())
    }

    pub fn write_diff(&self, kind: ViewportKind, iteration: u32, diff: &RgbaImage) -> Result<Option<PathBuf>> {
        if !self.is_enabled() {
            return Ok(None);
        }
        let png = encode_png(diff)?;
        self.write(&format!("diff-{}-{}.png", kind.as_str(), iteration), &png)
    }

    pub fn write_final(&self, html: &str) -> Result<Option<PathBuf>> {
        self.write("final.html", html.as_bytes())
    }

    pub fn write_report<T: Serialize>(&self, report: &T) -> Result<Option<PathBuf>> {
        self.write_json("report.json", report)
    }
}
