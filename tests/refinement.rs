//! End-to-end clone jobs against a scripted renderer

use image::{Rgba, RgbaImage};
use rfclone::artifacts::ArtifactStore;
use rfclone::render::{page_from_markup, MarkupRenderer, PageRenderer, RenderedPage, Screenshot, ScreenshotPair};
use rfclone::{clone_page, CloneConfig, Error, Result, Terminal, Viewport, ViewportPair};
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

const LANDING: &str = include_str!("fixtures/landing.html");
const SIZE: u32 = 100;

/// White capture with the top `rows` rows painted black
fn shot(rows: u32) -> Screenshot {
    let img = RgbaImage::from_fn(SIZE, SIZE, |_, y| {
        if y < rows {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    Screenshot::from_rgba(&img).unwrap()
}

/// Serves the landing fixture with white references, then plays back one
/// entry per generated document; `None` is a failed capture.
struct ScriptedSession {
    script: Vec<Option<(u32, u32)>>,
    renders: usize,
}

impl ScriptedSession {
    fn new(script: Vec<Option<(u32, u32)>>) -> Self {
        Self { script, renders: 0 }
    }
}

impl PageRenderer for ScriptedSession {
    fn render_url(&mut self, url: &str) -> Result<RenderedPage> {
        let mut page = page_from_markup(url, LANDING);
        page.screenshots = Some(ScreenshotPair { desktop: shot(0), mobile: shot(0) });
        Ok(page)
    }
}

impl MarkupRenderer for ScriptedSession {
    fn render_markup(&mut self, _html: &str) -> Result<ScreenshotPair> {
        let step = self.script[self.renders.min(self.script.len() - 1)];
        self.renders += 1;
        match step {
            Some((d, m)) => Ok(ScreenshotPair { desktop: shot(d), mobile: shot(m) }),
            None => Err(Error::RenderError("tab crashed".into())),
        }
    }
}

fn config() -> CloneConfig {
    CloneConfig {
        viewports: ViewportPair {
            desktop: Viewport { width: SIZE, height: SIZE },
            mobile: Viewport { width: SIZE, height: SIZE },
        },
        ..Default::default()
    }
}

fn ids_in(path: &Path) -> BTreeSet<String> {
    let doc = Html::parse_document(&fs::read_to_string(path).unwrap());
    let sel = Selector::parse("[id], [data-offer-id]").unwrap();
    doc.select(&sel)
        .map(|e| {
            format!(
                "{}#{}/{}",
                e.value().name(),
                e.value().attr("id").unwrap_or(""),
                e.value().attr("data-offer-id").unwrap_or("")
            )
        })
        .collect()
}

#[test]
fn test_exhausted_job_keeps_best_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = ArtifactStore::new(dir.path()).unwrap();
    let mut session = ScriptedSession::new(vec![Some((30, 30)), Some((20, 20)), Some((25, 25))]);

    let report = clone_page(&mut session, "https://acme.test/", &config(), &artifacts).unwrap();

    assert_eq!(session.renders, 3);
    assert_eq!(report.terminal, Terminal::Exhausted);
    assert_eq!(report.best_iteration, 2);
    assert!(!report.passed);
    assert_eq!(report.history.len(), 3);
    assert!(report.desktop < report.history[0].desktop);

    let best = fs::read_to_string(dir.path().join("iteration-2.html")).unwrap();
    assert_eq!(fs::read_to_string(dir.path().join("final.html")).unwrap(), best);
    assert_eq!(report.html, best);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(json["terminal"], "exhausted");
    assert_eq!(json["bestIteration"], 2);
    assert_eq!(json["history"].as_array().map(Vec::len), Some(3));
}

#[test]
fn test_refinement_changes_styles_but_never_structure() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = ArtifactStore::new(dir.path()).unwrap();
    let mut session = ScriptedSession::new(vec![Some((40, 40))]);

    clone_page(&mut session, "https://acme.test/", &config(), &artifacts).unwrap();

    let first = dir.path().join("iteration-1.html");
    let last = dir.path().join("iteration-3.html");
    assert_ne!(fs::read_to_string(&first).unwrap(), fs::read_to_string(&last).unwrap());
    assert_eq!(ids_in(&first), ids_in(&last));
    assert_eq!(ids_in(&first), ids_in(&dir.path().join("iteration-2.html")));
}

#[test]
fn test_first_passing_iteration_converges() {
    let mut session = ScriptedSession::new(vec![Some((0, 0))]);
    let report = clone_page(&mut session, "https://acme.test/", &config(), &ArtifactStore::disabled()).unwrap();

    assert_eq!(session.renders, 1);
    assert_eq!(report.terminal, Terminal::Converged);
    assert_eq!(report.best_iteration, 1);
    assert!(report.passed);
    assert_eq!((report.desktop, report.mobile), (0.0, 0.0));
    assert!(report.artifact_dir.is_none());
}

#[test]
fn test_failed_capture_scores_worst_and_loop_goes_on() {
    let mut session = ScriptedSession::new(vec![None, Some((0, 0))]);
    let report = clone_page(&mut session, "https://acme.test/", &config(), &ArtifactStore::disabled()).unwrap();

    assert_eq!(report.history[0].desktop, 100.0);
    assert_eq!(report.history[0].mobile, 100.0);
    assert!(!report.history[0].passed);
    assert_eq!(report.terminal, Terminal::Converged);
    assert_eq!(report.best_iteration, 2);
}

#[test]
fn test_iteration_cap_is_configurable() {
    let mut session = ScriptedSession::new(vec![Some((50, 50))]);
    let cfg = CloneConfig { max_iterations: 5, ..config() };
    let report = clone_page(&mut session, "https://acme.test/", &cfg, &ArtifactStore::disabled()).unwrap();
    assert_eq!(session.renders, 5);
    assert_eq!(report.terminal, Terminal::Exhausted);
    assert_eq!(report.history.len(), 5);
    assert_eq!(report.best_iteration, 1);
}
