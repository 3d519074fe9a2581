use crate::config::LearningSetParams;
use crate::error::Result;
use crate::outcome::Outcome;
use crate::scene::{Scene, SceneItem};
use crate::session::Counters;
use crate::stimulus::{StimulusIndex, StimulusLibrary, StimulusPair};
use crate::tasks::{place_pair, PlacedPair, Progress, ResponseClock, TrialContext};

/// Learning set: one correct stimulus is held fixed for a whole problem of
/// `trials_per_problem` trials, with a fresh distinct incorrect drawn every
/// trial. The task completes only once all problems are done AND the
/// cumulative percent gate holds; otherwise problems keep accruing.
#[derive(Debug)]
pub struct LearningSetTask {
    pub(crate) params: LearningSetParams,
    pub(crate) pair: Option<PlacedPair>,
    /// Correct stimulus of the current problem, None at a problem boundary.
    correct: Option<StimulusIndex>,
    pub(crate) problem_index: u32,
    pub(crate) trials_in_problem: u32,
    pub(crate) clock: ResponseClock,
}

impl LearningSetTask {
    pub fn new(params: LearningSetParams) -> Self {
        Self {
            params,
            pair: None,
            correct: None,
            problem_index: 1,
            trials_in_problem: 0,
            clock: ResponseClock::default(),
        }
    }

    pub fn setup(&mut self, ctx: &mut TrialContext<'_>) -> Result<()> {
        let correct = match self.correct {
            Some(index) => index,
            None => {
                let index = ctx.library.draw(ctx.rng);
                self.correct = Some(index);
                index
            }
        };
        let incorrect = ctx.library.draw_distinct_from(ctx.rng, correct);
        let drawn = StimulusPair { correct, incorrect };
        self.pair = Some(place_pair(
            ctx.library,
            ctx.rng,
            ctx.screen,
            drawn,
            ctx.screen.h / 2.0,
        )?);

        ctx.pointer
            .reset_center(ctx.screen.w / 2.0, ctx.screen.h / 2.0);
        self.clock.arm(ctx.now, self.params.response_secs);
        Ok(())
    }

    pub fn evaluate(&mut self, ctx: &mut TrialContext<'_>) -> Option<Outcome> {
        if self.clock.expired(ctx.now) {
            return Some(Outcome::Timeout);
        }
        let pair = self.pair.as_ref()?;
        if pair.correct.rect.contains_rect(&ctx.pointer.rect) {
            return Some(Outcome::Correct);
        }
        if pair.incorrect.rect.contains_rect(&ctx.pointer.rect) {
            return Some(Outcome::IncorrectChosen);
        }
        None
    }

    pub fn register_outcome(&mut self, _outcome: Outcome, counters: &Counters) -> Progress {
        self.trials_in_problem += 1;
        if self.trials_in_problem >= self.params.trials_per_problem {
            self.trials_in_problem = 0;
            self.problem_index += 1;
            self.correct = None;
            if self.problem_index > self.params.number_of_problems
                && counters.window_ratio() >= self.params.percent_correct / 100.0
            {
                return Progress::TaskComplete;
            }
        }
        Progress::Continue
    }

    pub fn log_fields(
        &self,
        counters: &Counters,
        outcome: Outcome,
        reaction_secs: f32,
        library: &StimulusLibrary,
    ) -> String {
        let pair = match &self.pair {
            Some(pair) => pair,
            None => return String::new(),
        };
        format!(
            "{}  {}  {}  {:.2}  {}  {}  {}  {:.2}  {}",
            counters.total_trials,
            self.problem_index,
            counters.trials_in_window,
            self.params.percent_correct,
            library.label(pair.left_index()),
            pair.side_label(),
            library.label(pair.right_index()),
            reaction_secs,
            outcome.label(),
        )
    }

    pub fn populate_scene(&self, scene: &mut Scene) {
        if let Some(pair) = &self.pair {
            scene.push(SceneItem::Stimulus {
                index: pair.correct.index,
                rect: pair.correct.rect,
            });
            scene.push(SceneItem::Stimulus {
                index: pair.incorrect.index,
                rect: pair.incorrect.rect,
            });
        }
    }
}
