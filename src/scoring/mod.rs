//! Visual scorer: generated document vs. reference captures
//!
//! Scoring never fails from the caller's point of view. Any rendering,
//! decoding or comparison error is logged and reported as the worst possible
//! score so the refinement loop can keep going or terminate normally.

pub mod compare;
pub mod resample;

pub use compare::{CompareOptions, Comparison, PixelComparator, YiqComparator};

use crate::artifacts::ArtifactStore;
use crate::render::{MarkupRenderer, Screenshot, ScreenshotPair};
use crate::{CloneConfig, Result, ViewportKind};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Mismatch percentage reported when scoring could not be carried out
pub const WORST_MISMATCH: f64 = 100.0;

/// Per-viewport mismatch percentages and the pass verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub desktop: f64,
    pub mobile: f64,
    pub passed: bool,
}

impl Score {
    pub fn worst() -> Self {
        Self {
            desktop: WORST_MISMATCH,
            mobile: WORST_MISMATCH,
            passed: false,
        }
    }

    /// Summed mismatch, the quantity best-candidate tracking minimises
    pub fn total(&self) -> f64 {
        self.desktop + self.mobile
    }

    pub fn get(&self, kind: ViewportKind) -> f64 {
        match kind {
            ViewportKind::Desktop => self.desktop,
            ViewportKind::Mobile => self.mobile,
        }
    }
}

/// Mismatch budgets per viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budgets {
    pub desktop: f64,
    pub mobile: f64,
}

impl Budgets {
    pub fn from_config(config: &CloneConfig) -> Self {
        Self {
            desktop: config.desktop_budget,
            mobile: config.mobile_budget,
        }
    }

    pub fn get(&self, kind: ViewportKind) -> f64 {
        match kind {
            ViewportKind::Desktop => self.desktop,
            ViewportKind::Mobile => self.mobile,
        }
    }

    /// Passes iff both viewports are within budget
    pub fn verdict(&self, desktop: f64, mobile: f64) -> bool {
        desktop <= self.desktop && mobile <= self.mobile
    }

    /// Viewports whose mismatch is over budget
    pub fn failing(&self, score: &Score) -> Vec<ViewportKind> {
        ViewportKind::ALL
            .into_iter()
            .filter(|k| score.get(*k) > self.get(*k))
            .collect()
    }
}

/// `mismatched / total * 100`, rounded to two decimals
pub fn mismatch_percentage(mismatched: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = mismatched as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

pub struct VisualScorer {
    comparator: Box<dyn PixelComparator>,
    options: CompareOptions,
    budgets: Budgets,
}

impl VisualScorer {
    pub fn new(config: &CloneConfig) -> Self {
        Self::with_comparator(config, Box::new(YiqComparator))
    }

    pub fn with_comparator(config: &CloneConfig, comparator: Box<dyn PixelComparator>) -> Self {
        Self {
            comparator,
            options: CompareOptions {
                sensitivity: config.sensitivity,
                anti_aliasing: config.anti_aliasing_tolerance,
            },
            budgets: Budgets::from_config(config),
        }
    }

    pub fn budgets(&self) -> Budgets {
        self.budgets
    }

    /// Compare two captures, resampling the smaller one first. Returns the
    /// mismatch percentage and the comparator's diff image.
    pub fn compare_screenshots(
        &self,
        reference: &Screenshot,
        generated: &Screenshot,
    ) -> Result<(f64, Option<image::RgbaImage>)> {
        let reference = reference.decode()?;
        let generated = generated.decode()?;
        let (a, b) = resample::match_dimensions(&reference, &generated);
        let comparison = self.comparator.compare(&a, &b, &self.options)?;
        let total = a.width() as u64 * a.height() as u64;
        Ok((mismatch_percentage(comparison.mismatched, total), comparison.diff))
    }

    /// Score already-rendered captures against the references
    pub fn score_captures(
        &self,
        references: &ScreenshotPair,
        generated: &ScreenshotPair,
        iteration: u32,
        artifacts: &ArtifactStore,
    ) -> Result<Score> {
        let mut pct = [0.0; 2];
        for (slot, kind) in ViewportKind::ALL.into_iter().enumerate() {
            let (mismatch, diff) = self.compare_screenshots(references.get(kind), generated.get(kind))?;
            if let Some(diff) = diff {
                if let Err(e) = artifacts.write_diff(kind, iteration, &diff) {
                    warn!("could not persist {} diff for iteration {}: {}", kind.as_str(), iteration, e);
                }
            }
            pct[slot] = mismatch;
        }
        let [desktop, mobile] = pct;
        Ok(Score {
            desktop,
            mobile,
            passed: self.budgets.verdict(desktop, mobile),
        })
    }

    /// Render `html`, compare it against `references` and persist the diffs.
    /// Failures yield [`Score::worst`].
    pub fn score(
        &self,
        renderer: &mut dyn MarkupRenderer,
        references: &ScreenshotPair,
        html: &str,
        iteration: u32,
        artifacts: &ArtifactStore,
    ) -> Score {
        let result = renderer
            .render_markup(html)
            .and_then(|generated| self.score_captures(references, &generated, iteration, artifacts));
        match result {
            Ok(score) => {
                debug!(
                    "iteration {}: desktop {:.2}%, mobile {:.2}%, passed {}",
                    iteration, score.desktop, score.mobile, score.passed
                );
                score
            }
            Err(e) => {
                warn!("scoring iteration {} failed, counting as worst case: {}", iteration, e);
                Score::worst()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Viewport};

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn pair(w: u32, h: u32, rgba: [u8; 4]) -> ScreenshotPair {
        let vp = Viewport { width: w, height: h };
        ScreenshotPair {
            desktop: Screenshot::solid(vp, rgba).unwrap(),
            mobile: Screenshot::solid(vp, rgba).unwrap(),
        }
    }

    struct Fixed(std::result::Result<ScreenshotPair, String>);

    impl MarkupRenderer for Fixed {
        fn render_markup(&mut self, _html: &str) -> Result<ScreenshotPair> {
            self.0.clone().map_err(Error::RenderError)
        }
    }

    #[test]
    fn test_percentage_rounds_to_two_decimals() {
        assert_eq!(mismatch_percentage(1, 3), 33.33);
        assert_eq!(mismatch_percentage(2, 3), 66.67);
        assert_eq!(mismatch_percentage(0, 0), 0.0);
    }

    #[test]
    fn test_solid_white_scores_zero_and_passes() {
        let scorer = VisualScorer::new(&CloneConfig::default());
        let refs = pair(100, 100, WHITE);
        let mut renderer = Fixed(Ok(pair(100, 100, WHITE)));
        let score = scorer.score(&mut renderer, &refs, "<html></html>", 1, &ArtifactStore::disabled());
        assert_eq!(score, Score { desktop: 0.0, mobile: 0.0, passed: true });
    }

    #[test]
    fn test_render_failure_is_worst_case() {
        let scorer = VisualScorer::new(&CloneConfig::default());
        let refs = pair(10, 10, WHITE);
        let mut renderer = Fixed(Err("browser went away".into()));
        let score = scorer.score(&mut renderer, &refs, "<html></html>", 1, &ArtifactStore::disabled());
        assert_eq!(score, Score::worst());
    }

    #[test]
    fn test_scaled_identical_content_scores_zero() {
        let scorer = VisualScorer::new(&CloneConfig::default());
        let refs = pair(50, 40, WHITE);
        let generated = pair(100, 80, WHITE);
        let score = scorer
            .score_captures(&refs, &generated, 1, &ArtifactStore::disabled())
            .unwrap();
        assert_eq!(score.desktop, 0.0);
        assert!(score.passed);
    }

    #[test]
    fn test_verdict_uses_both_budgets() {
        let budgets = Budgets::from_config(&CloneConfig::default());
        assert!(budgets.verdict(6.0, 8.0));
        assert!(!budgets.verdict(6.01, 0.0));
        assert!(!budgets.verdict(0.0, 8.01));
        let score = Score { desktop: 7.0, mobile: 1.0, passed: false };
        assert_eq!(budgets.failing(&score), vec![ViewportKind::Desktop]);
    }

    #[test]
    fn test_diffs_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let scorer = VisualScorer::new(&CloneConfig::default());
        let refs = pair(8, 8, WHITE);
        let mut renderer = Fixed(Ok(pair(8, 8, [0, 0, 0, 255])));
        let score = scorer.score(&mut renderer, &refs, "", 3, &store);
        assert_eq!(score.desktop, 100.0);
        assert!(!score.passed);
        assert!(dir.path().join("diff-desktop-3.png").exists());
        assert!(dir.path().join("diff-mobile-3.png").exists());
    }
}
