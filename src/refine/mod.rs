//! Refinement controller
//!
//! An explicit state machine:
//!
//! ```text
//! Analyzing -> Generating -> Scoring -+-> Converged         (verdict passed)
//!                  ^                  +-> Exhausted         (iteration == max)
//!                  |                  +-> Adjusting
//!                  +------------------------+
//! ```
//!
//! Each call to [`Refinement::step`] runs exactly one phase. Callers that
//! want to cancel a job simply stop stepping; the only sensible place to do
//! so is before a `Generating` phase, see [`Refinement::is_between_iterations`].

pub mod adjust;
pub mod best;

use crate::artifacts::ArtifactStore;
use crate::model::LayoutModel;
use crate::render::{MarkupRenderer, RenderedPage, ScreenshotPair};
use crate::scoring::{Score, VisualScorer};
use crate::{analyzer, generator, CloneConfig, Error, Result};
use adjust::Adjustment;
use best::{keep_better, Candidate};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Analyzing,
    Generating,
    Scoring,
    Adjusting,
    Converged,
    Exhausted,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Converged | Phase::Exhausted)
    }
}

/// How the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terminal {
    Converged,
    Exhausted,
}

/// One recorded Generate/Score cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationScore {
    pub iteration: u32,
    pub desktop: f64,
    pub mobile: f64,
    pub passed: bool,
    /// Adjustments applied after this iteration, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<String>,
}

/// Output of a finished loop, identical in shape for both terminal states
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub terminal: Terminal,
    /// HTML of the best-scoring iteration
    pub html: String,
    pub best_iteration: u32,
    pub desktop: f64,
    pub mobile: f64,
    pub passed: bool,
    pub history: Vec<IterationScore>,
    /// Layout model as generated at each iteration, oldest first
    pub models: Vec<LayoutModel>,
}

/// Transition out of `Scoring`
fn after_scoring(score: &Score, iteration: u32, max_iterations: u32) -> Phase {
    if score.passed {
        Phase::Converged
    } else if iteration >= max_iterations {
        Phase::Exhausted
    } else {
        Phase::Adjusting
    }
}

/// Per-job controller state. Borrowed collaborators stay with the caller.
pub struct Refinement<'a> {
    config: &'a CloneConfig,
    page: &'a RenderedPage,
    references: &'a ScreenshotPair,
    scorer: &'a VisualScorer,
    artifacts: &'a ArtifactStore,
    phase: Phase,
    iteration: u32,
    model: Option<LayoutModel>,
    html: Option<String>,
    last_score: Option<Score>,
    best: Option<Candidate>,
    history: Vec<IterationScore>,
    models: Vec<LayoutModel>,
}

impl<'a> Refinement<'a> {
    pub fn new(
        config: &'a CloneConfig,
        page: &'a RenderedPage,
        references: &'a ScreenshotPair,
        scorer: &'a VisualScorer,
        artifacts: &'a ArtifactStore,
    ) -> Self {
        Self {
            config,
            page,
            references,
            scorer,
            artifacts,
            phase: Phase::Analyzing,
            iteration: 1,
            model: None,
            html: None,
            last_score: None,
            best: None,
            history: Vec::new(),
            models: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 1-based index of the current (or last) iteration
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn history(&self) -> &[IterationScore] {
        &self.history
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.best.as_ref()
    }

    /// Current layout model, once analysis has run
    pub fn model(&self) -> Option<&LayoutModel> {
        self.model.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// True right before a new Generate step, the only safe cancellation point
    pub fn is_between_iterations(&self) -> bool {
        self.phase == Phase::Generating
    }

    /// Run one phase and return the phase entered next
    pub fn step(&mut self, renderer: &mut dyn MarkupRenderer) -> Result<Phase> {
        self.phase = match self.phase {
            Phase::Analyzing => self.analyze(),
            Phase::Generating => self.generate()?,
            Phase::Scoring => self.score(renderer)?,
            Phase::Adjusting => self.adjust()?,
            terminal => {
                return Err(Error::Other(format!("Refinement already finished ({:?})", terminal)));
            }
        };
        Ok(self.phase)
    }

    fn analyze(&mut self) -> Phase {
        let model = analyzer::analyze(self.page, self.config);
        info!(
            "analyzed {}: {} sections, {} elements",
            self.page.url,
            model.sections.len(),
            model.element_count()
        );
        if let Err(e) = self.artifacts.write_layout(&model) {
            warn!("could not persist layout model: {}", e);
        }
        self.model = Some(model);
        Phase::Generating
    }

    fn current_model(&self) -> Result<&LayoutModel> {
        self.model
            .as_ref()
            .ok_or_else(|| Error::Other("No layout model; analysis has not run".into()))
    }

    fn generate(&mut self) -> Result<Phase> {
        let model = self.current_model()?.clone();
        let html = generator::generate(&model, &self.page.title, &self.page.description);
        debug!("iteration {}: generated {} bytes of markup", self.iteration, html.len());
        self.models.push(model);
        if let Err(e) = self.artifacts.write_iteration(self.iteration, &html) {
            warn!("could not persist iteration {} markup: {}", self.iteration, e);
        }
        self.html = Some(html);
        Ok(Phase::Scoring)
    }

    fn score(&mut self, renderer: &mut dyn MarkupRenderer) -> Result<Phase> {
        let html = self
            .html
            .take()
            .ok_or_else(|| Error::Other("No generated markup to score".into()))?;
        let score = self
            .scorer
            .score(renderer, self.references, &html, self.iteration, self.artifacts);
        info!(
            "iteration {}/{}: desktop {:.2}%, mobile {:.2}% ({})",
            self.iteration,
            self.config.max_iterations,
            score.desktop,
            score.mobile,
            if score.passed { "pass" } else { "fail" }
        );

        self.history.push(IterationScore {
            iteration: self.iteration,
            desktop: score.desktop,
            mobile: score.mobile,
            passed: score.passed,
            adjustments: Vec::new(),
        });
        let candidate = Candidate {
            iteration: self.iteration,
            html,
            score,
        };
        self.best = Some(keep_better(self.best.take(), candidate));
        self.last_score = Some(score);

        let next = after_scoring(&score, self.iteration, self.config.max_iterations);
        match next {
            Phase::Converged => info!("converged at iteration {}", self.iteration),
            Phase::Exhausted => info!("iteration cap reached without meeting budgets"),
            _ => {}
        }
        Ok(next)
    }

    fn adjust(&mut self) -> Result<Phase> {
        let score = self
            .last_score
            .ok_or_else(|| Error::Other("No score to adjust from".into()))?;
        let failing = self.scorer.budgets().failing(&score);
        let adjustments: Vec<Adjustment> = adjust::plan(self.iteration, &failing);

        let model = self
            .model
            .as_mut()
            .ok_or_else(|| Error::Other("No layout model; analysis has not run".into()))?;
        adjust::apply_all(model, &adjustments)?;

        let names: Vec<String> = adjustments.iter().map(|a| a.name().to_string()).collect();
        debug!("iteration {}: applied {}", self.iteration, names.join(", "));
        if let Some(last) = self.history.last_mut() {
            last.adjustments = names;
        }

        self.iteration += 1;
        Ok(Phase::Generating)
    }

    /// Consume a finished controller into its outcome
    pub fn finish(self) -> Result<RefinementOutcome> {
        let terminal = match self.phase {
            Phase::Converged => Terminal::Converged,
            Phase::Exhausted => Terminal::Exhausted,
            other => return Err(Error::Other(format!("Refinement not finished ({:?})", other))),
        };
        let best = self
            .best
            .ok_or_else(|| Error::Other("Refinement finished without a candidate".into()))?;
        Ok(RefinementOutcome {
            terminal,
            html: best.html,
            best_iteration: best.iteration,
            desktop: best.score.desktop,
            mobile: best.score.mobile,
            passed: best.score.passed,
            history: self.history,
            models: self.models,
        })
    }

    /// Step until a terminal state and return the outcome
    pub fn run(mut self, renderer: &mut dyn MarkupRenderer) -> Result<RefinementOutcome> {
        while !self.is_terminal() {
            self.step(renderer)?;
        }
        self.finish()
    }
}

/// Analyze `page` and refine against `references` until a terminal state
pub fn refine(
    page: &RenderedPage,
    references: &ScreenshotPair,
    renderer: &mut dyn MarkupRenderer,
    config: &CloneConfig,
    artifacts: &ArtifactStore,
) -> Result<RefinementOutcome> {
    let scorer = VisualScorer::new(config);
    Refinement::new(config, page, references, &scorer, artifacts).run(renderer)
}
