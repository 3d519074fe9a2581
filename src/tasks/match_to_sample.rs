use crate::config::MatchParams;
use crate::error::Result;
use crate::geometry::RectPx;
use crate::outcome::Outcome;
use crate::scene::{Scene, SceneItem};
use crate::session::Counters;
use crate::stimulus::StimulusLibrary;
use crate::tasks::{place_pair, PlacedPair, Progress, ResponseClock, TrialContext};

/// Match-to-sample: two stimuli on the choice row plus a centered duplicate
/// of the correct one as the sample. Touching either choice ends the trial.
#[derive(Debug)]
pub struct MatchToSampleTask {
    pub(crate) params: MatchParams,
    pub(crate) pair: Option<PlacedPair>,
    sample_rect: Option<RectPx>,
    pub(crate) clock: ResponseClock,
}

impl MatchToSampleTask {
    pub fn new(params: MatchParams) -> Self {
        Self {
            params,
            pair: None,
            sample_rect: None,
            clock: ResponseClock::default(),
        }
    }

    pub fn setup(&mut self, ctx: &mut TrialContext<'_>) -> Result<()> {
        let drawn = ctx.library.draw_pair(ctx.rng);
        let pair = place_pair(ctx.library, ctx.rng, ctx.screen, drawn, ctx.screen.h / 4.0)?;

        let (sw, sh) = ctx.library.fitted_size(drawn.correct)?;
        self.sample_rect = Some(RectPx::centered(
            ctx.screen.w / 2.0,
            ctx.screen.h * 0.8,
            sw,
            sh,
        ));
        self.pair = Some(pair);

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
        // Completion needs the trial count AND the percent gate at once;
        // a failed gate keeps the window running untouched.
        if counters.trials_in_window >= self.params.trials_to_criterion
            && counters.window_ratio() >= self.params.percent_correct / 100.0
        {
            Progress::TaskComplete
        } else {
            Progress::Continue
        }
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
            "{}  {}  {:.2}  {}  {}  {}  {:.2}  {}",
            counters.total_trials,
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
            if let Some(rect) = self.sample_rect {
                scene.push(SceneItem::Stimulus {
                    index: pair.correct.index,
                    rect,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchParams;
    use crate::geometry::Pointer;
    use crate::input::AxisSample;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> MatchParams {
        MatchParams {
            trials_to_criterion: 10,
            percent_correct: 80.0,
            response_secs: 20.0,
            fail_timeout_secs: 6.0,
            titration: false,
        }
    }

    fn screen() -> RectPx {
        RectPx::new(0.0, 0.0, 1920.0, 1080.0)
    }

    struct Fixture {
        pointer: Pointer,
        rng: StdRng,
        library: StimulusLibrary,
    }

    impl Fixture {
        fn new(seed: u64) -> Self {
            Self {
                pointer: Pointer::new(),
                rng: StdRng::seed_from_u64(seed),
                library: StimulusLibrary::from_entries(vec![
                    ("apple", 120.0, 90.0),
                    ("brick", 150.0, 150.0),
                    ("cloud", 100.0, 80.0),
                ]),
            }
        }

        fn ctx(&mut self, now: u64) -> TrialContext<'_> {
            TrialContext {
                pointer: &mut self.pointer,
                screen: screen(),
                rng: &mut self.rng,
                library: &mut self.library,
                input: AxisSample::default(),
                now,
            }
        }
    }

    #[test]
    fn setup_places_distinct_pair_and_sample() {
        let mut task = MatchToSampleTask::new(params());
        let mut fixture = Fixture::new(21);
        task.setup(&mut fixture.ctx(0)).unwrap();

        let pair = task.pair.as_ref().unwrap();
        assert_ne!(pair.correct.index, pair.incorrect.index);
        // Pointer starts centered, away from both choices.
        assert_eq!(task.evaluate(&mut fixture.ctx(1)), None);
        assert!(task.sample_rect.is_some());
    }

    #[test]
    fn touching_either_choice_ends_the_trial() {
        let mut task = MatchToSampleTask::new(params());
        let mut fixture = Fixture::new(22);
        task.setup(&mut fixture.ctx(0)).unwrap();

        let pair = *task.pair.as_ref().unwrap();
        let (cx, cy) = pair.correct.rect.center();
        fixture.pointer.reset_center(cx, cy);
        assert_eq!(task.evaluate(&mut fixture.ctx(1)), Some(Outcome::Correct));

        let (cx, cy) = pair.incorrect.rect.center();
        fixture.pointer.reset_center(cx, cy);
        assert_eq!(
            task.evaluate(&mut fixture.ctx(2)),
            Some(Outcome::IncorrectChosen)
        );
    }

    #[test]
    fn completion_needs_count_and_ratio_together() {
        let mut task = MatchToSampleTask::new(params());

        // 10 trials, 7 correct: count met, ratio not.
        let counters = Counters {
            total_trials: 10,
            trials_in_window: 10,
            correct_in_window: 7,
        };
        assert_eq!(
            task.register_outcome(Outcome::Correct, &counters),
            Progress::Continue
        );

        // 5 of 5 correct: ratio met, count not.
        let counters = Counters {
            total_trials: 5,
            trials_in_window: 5,
            correct_in_window: 5,
        };
        assert_eq!(
            task.register_outcome(Outcome::Correct, &counters),
            Progress::Continue
        );

        // Both at once.
        let counters = Counters {
            total_trials: 15,
            trials_in_window: 15,
            correct_in_window: 12,
        };
        assert_eq!(
            task.register_outcome(Outcome::Correct, &counters),
            Progress::TaskComplete
        );
    }

    #[test]
    fn log_line_names_both_stimuli_and_the_correct_side() {
        let mut task = MatchToSampleTask::new(params());
        let mut fixture = Fixture::new(23);
        task.setup(&mut fixture.ctx(0)).unwrap();

        let counters = Counters {
            total_trials: 4,
            trials_in_window: 4,
            correct_in_window: 3,
        };
        let line = task.log_fields(&counters, Outcome::Correct, 1.5, &fixture.library);
        let pair = task.pair.as_ref().unwrap();
        assert!(line.contains(fixture.library.label(pair.left_index())));
        assert!(line.contains(fixture.library.label(pair.right_index())));
        assert!(line.contains(pair.side_label()));
        assert!(line.ends_with("Correct"));
    }
}
