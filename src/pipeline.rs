//! One clone job end to end: render the target, refine, persist
//!
//! This is a pure function of the renderer's answers: nothing here is shared
//! between jobs. Only a failed render of the target page aborts a job; every
//! later failure is absorbed by the refinement loop.

use crate::artifacts::ArtifactStore;
use crate::refine::{IterationScore, Refinement, Terminal};
use crate::render::{MarkupRenderer, PageRenderer};
use crate::scoring::VisualScorer;
use crate::{CloneConfig, Error, Result, ViewportKind};
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;

/// Decision taken by a caller before each new iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Cancel,
}

/// What a finished job reports; also written as `report.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneReport {
    pub url: String,
    pub title: String,
    pub terminal: Terminal,
    pub best_iteration: u32,
    pub desktop: f64,
    pub mobile: f64,
    pub passed: bool,
    pub history: Vec<IterationScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_dir: Option<PathBuf>,
    /// Best generated document
    #[serde(skip)]
    pub html: String,
}

/// Clone `url` with no cancellation
pub fn clone_page<R>(renderer: &mut R, url: &str, config: &CloneConfig, artifacts: &ArtifactStore) -> Result<CloneReport>
where
    R: PageRenderer + MarkupRenderer,
{
    clone_page_with(renderer, url, config, artifacts, |_| Control::Continue)
}

/// Clone `url`, asking `before_iteration` ahead of every Generate step
/// whether to go on. Returns [`Error::Cancelled`] if it says no.
pub fn clone_page_with<R, F>(
    renderer: &mut R,
    url: &str,
    config: &CloneConfig,
    artifacts: &ArtifactStore,
    mut before_iteration: F,
) -> Result<CloneReport>
where
    R: PageRenderer + MarkupRenderer,
    F: FnMut(u32) -> Control,
{
    config.validate()?;

    let page = renderer.render_url(url).map_err(|e| match e {
        Error::LoadError(_) => e,
        other => Error::LoadError(format!("{}: {}", url, other)),
    })?;
    let references = page
        .screenshots
        .clone()
        .ok_or_else(|| Error::LoadError(format!("{}: renderer returned no reference screenshots", url)))?;
    info!("rendered {} ({})", url, page.title);

    for kind in ViewportKind::ALL {
        if let Err(e) = artifacts.write_reference(kind, references.get(kind)) {
            warn!("could not persist {} reference: {}", kind.as_str(), e);
        }
    }

    let scorer = VisualScorer::new(config);
    let mut controller = Refinement::new(config, &page, &references, &scorer, artifacts);
    while !controller.is_terminal() {
        if controller.is_between_iterations() && before_iteration(controller.iteration()) == Control::Cancel {
            info!("{} cancelled before iteration {}", url, controller.iteration());
            return Err(Error::Cancelled);
        }
        controller.step(&mut *renderer)?;
    }
    let outcome = controller.finish()?;

    let report = CloneReport {
        url: url.to_string(),
        title: page.title.clone(),
        terminal: outcome.terminal,
        best_iteration: outcome.best_iteration,
        desktop: outcome.desktop,
        mobile: outcome.mobile,
        passed: outcome.passed,
        history: outcome.history,
        artifact_dir: artifacts.root().map(|p| p.to_path_buf()),
        html: outcome.html,
    };

    if let Err(e) = artifacts.write_final(&report.html) {
        warn!("could not persist final markup: {}", e);
    }
    if let Err(e) = artifacts.write_report(&report) {
        warn!("could not persist report: {}", e);
    }
    info!(
        "{} finished {:?}: best iteration {} (desktop {:.2}%, mobile {:.2}%)",
        url, report.terminal, report.best_iteration, report.desktop, report.mobile
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RenderedPage, Screenshot, ScreenshotPair};
    use crate::Viewport;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn white_pair() -> ScreenshotPair {
        let vp = Viewport { width: 20, height: 20 };
        ScreenshotPair {
            desktop: Screenshot::solid(vp, WHITE).unwrap(),
            mobile: Screenshot::solid(vp, WHITE).unwrap(),
        }
    }

    struct Blank {
        screenshots: bool,
        fail_load: bool,
    }

    impl PageRenderer for Blank {
        fn render_url(&mut self, url: &str) -> Result<RenderedPage> {
            if self.fail_load {
                return Err(Error::RenderError("connection refused".into()));
            }
            Ok(RenderedPage {
                url: url.to_string(),
                title: "Blank".into(),
                body_html: "<main><h1>Nothing much to see on this page</h1></main>".into(),
                screenshots: self.screenshots.then(white_pair),
                ..Default::default()
            })
        }
    }

    impl MarkupRenderer for Blank {
        fn render_markup(&mut self, _html: &str) -> Result<ScreenshotPair> {
            Ok(white_pair())
        }
    }

    #[test]
    fn test_load_failure_aborts_job() {
        let mut r = Blank { screenshots: true, fail_load: true };
        let err = clone_page(&mut r, "https://x.test/", &CloneConfig::default(), &ArtifactStore::disabled()).unwrap_err();
        assert!(matches!(err, Error::LoadError(_)));
    }

    #[test]
    fn test_missing_references_is_a_load_error() {
        let mut r = Blank { screenshots: false, fail_load: false };
        let err = clone_page(&mut r, "https://x.test/", &CloneConfig::default(), &ArtifactStore::disabled()).unwrap_err();
        assert!(matches!(err, Error::LoadError(_)));
    }

    #[test]
    fn test_writes_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let mut r = Blank { screenshots: true, fail_load: false };
        let report = clone_page(&mut r, "https://x.test/", &CloneConfig::default(), &store).unwrap();
        assert_eq!(report.terminal, Terminal::Converged);
        assert_eq!(report.best_iteration, 1);
        for name in [
            "layout.json",
            "reference-desktop.png",
            "reference-mobile.png",
            "iteration-1.html",
            "diff-desktop-1.png",
            "diff-mobile-1.png",
            "final.html",
            "report.json",
        ] {
            assert!(dir.path().join(name).exists(), "missing {}", name);
        }
        let final_html = std::fs::read_to_string(dir.path().join("final.html")).unwrap();
        assert_eq!(final_html, report.html);
    }

    #[test]
    fn test_cancel_before_first_iteration() {
        let mut r = Blank { screenshots: true, fail_load: false };
        let err = clone_page_with(
            &mut r,
            "https://x.test/",
            &CloneConfig::default(),
            &ArtifactStore::disabled(),
            |_| Control::Cancel,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
