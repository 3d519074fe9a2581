use crate::config::DelayedMatchParams;
use crate::error::Result;
use crate::geometry::RectPx;
use crate::outcome::Outcome;
use crate::scene::{Scene, SceneItem};
use crate::session::Counters;
use crate::stimulus::StimulusLibrary;
use crate::tasks::{place_pair, PlacedPair, Progress, ResponseClock, TrialContext};
use crate::timer::{secs_to_ticks, Tick};

/// Within-trial sub-state. Nothing can time out before the sample is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Only the sample is on screen, waiting for the pointer to touch it.
    AwaitSample,
    /// Blank screen until the delay expires. Pointer motion is suspended.
    Blank { until: Tick },
    /// Choice pair revealed, response clock running.
    Choice,
}

/// Delayed match-to-sample: the sample is shown alone, touching it starts a
/// blank delay, and only then is the left/right pair revealed. The response
/// clock starts at reveal.
#[derive(Debug)]
pub struct DelayedMatchTask {
    pub(crate) params: DelayedMatchParams,
    pub(crate) pair: Option<PlacedPair>,
    sample_rect: Option<RectPx>,
    phase: Phase,
    pub(crate) clock: ResponseClock,
}

impl DelayedMatchTask {
    pub fn new(params: DelayedMatchParams) -> Self {
        Self {
            params,
            pair: None,
            sample_rect: None,
            phase: Phase::AwaitSample,
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
        self.phase = Phase::AwaitSample;
        self.clock = ResponseClock::default();

        ctx.pointer
            .reset_center(ctx.screen.w / 2.0, ctx.screen.h / 2.0);
        Ok(())
    }

    pub fn evaluate(&mut self, ctx: &mut TrialContext<'_>) -> Option<Outcome> {
        match self.phase {
            Phase::AwaitSample => {
                let touched = self
                    .sample_rect
                    .is_some_and(|sample| sample.contains_rect(&ctx.pointer.rect));
                if touched {
                    self.phase = Phase::Blank {
                        until: ctx.now + secs_to_ticks(self.params.delay_secs),
                    };
                }
                None
            }
            Phase::Blank { until } => {
                if ctx.now >= until {
                    self.phase = Phase::Choice;
                    self.clock.arm(ctx.now, self.params.response_secs);
                }
                None
            }
            Phase::Choice => {
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
        }
    }

    pub fn register_outcome(&mut self, _outcome: Outcome, counters: &Counters) -> Progress {
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

    pub fn pointer_frozen(&self) -> bool {
        matches!(self.phase, Phase::Blank { .. })
    }

    pub fn populate_scene(&self, scene: &mut Scene) {
        match self.phase {
            Phase::AwaitSample => {
                if let (Some(pair), Some(rect)) = (&self.pair, self.sample_rect) {
                    scene.push(SceneItem::Stimulus {
                        index: pair.correct.index,
                        rect,
                    });
                }
            }
            Phase::Blank { .. } => {
                scene.blank = true;
            }
            Phase::Choice => {
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
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DelayedMatchParams;
    use crate::geometry::Pointer;
    use crate::input::AxisSample;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> DelayedMatchParams {
        DelayedMatchParams {
            trials_to_criterion: 10,
            percent_correct: 80.0,
            delay_secs: 2.0,
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

    fn touch_sample(task: &DelayedMatchTask, pointer: &mut Pointer) {
        let (cx, cy) = task.sample_rect.unwrap().center();
        pointer.reset_center(cx, cy);
    }

    #[test]
    fn nothing_times_out_before_the_sample_is_touched() {
        let mut task = DelayedMatchTask::new(params());
        let mut fixture = Fixture::new(31);
        task.setup(&mut fixture.ctx(0)).unwrap();

        // Far past any response window: still waiting, no outcome.
        let late = 100 * 60;
        assert_eq!(task.evaluate(&mut fixture.ctx(late)), None);
        assert_eq!(task.phase, Phase::AwaitSample);
    }

    #[test]
    fn touching_the_sample_starts_the_blank_delay() {
        let mut task = DelayedMatchTask::new(params());
        let mut fixture = Fixture::new(32);
        task.setup(&mut fixture.ctx(0)).unwrap();

        touch_sample(&task, &mut fixture.pointer);
        assert_eq!(task.evaluate(&mut fixture.ctx(10)), None);
        assert_eq!(task.phase, Phase::Blank { until: 10 + 120 });
        assert!(task.pointer_frozen());

        let mut scene = Scene::default();
        task.populate_scene(&mut scene);
        assert!(scene.blank);
        assert!(scene.items.is_empty());
    }

    #[test]
    fn reveal_arms_the_response_clock_at_delay_expiry() {
        let mut task = DelayedMatchTask::new(params());
        let mut fixture = Fixture::new(33);
        task.setup(&mut fixture.ctx(0)).unwrap();

        touch_sample(&task, &mut fixture.pointer);
        task.evaluate(&mut fixture.ctx(10));

        // Mid-delay: still blank.
        assert_eq!(task.evaluate(&mut fixture.ctx(100)), None);
        assert_eq!(task.phase, Phase::Blank { until: 130 });

        // Delay expires, pair revealed, pointer free again.
        assert_eq!(task.evaluate(&mut fixture.ctx(130)), None);
        assert_eq!(task.phase, Phase::Choice);
        assert!(!task.pointer_frozen());

        // Reaction time is measured from the reveal tick.
        let reveal = 130;
        assert!((task.clock.reaction_secs(reveal + 60) - 1.0).abs() < 1e-6);

        // Timeout counts from the reveal too.
        let expired = reveal + 20 * 60 + 1;
        assert_eq!(
            task.evaluate(&mut fixture.ctx(expired)),
            Some(Outcome::Timeout)
        );
    }

    #[test]
    fn choice_phase_resolves_on_either_stimulus() {
        let mut task = DelayedMatchTask::new(params());
        let mut fixture = Fixture::new(34);
        task.setup(&mut fixture.ctx(0)).unwrap();

        touch_sample(&task, &mut fixture.pointer);
        task.evaluate(&mut fixture.ctx(0));
        // Park the pointer away from the choice row before the reveal.
        fixture.pointer.reset_center(screen().w / 2.0, screen().h / 2.0);
        task.evaluate(&mut fixture.ctx(120));
        assert_eq!(task.phase, Phase::Choice);

        let pair = *task.pair.as_ref().unwrap();
        let (cx, cy) = pair.incorrect.rect.center();
        fixture.pointer.reset_center(cx, cy);
        assert_eq!(
            task.evaluate(&mut fixture.ctx(121)),
            Some(Outcome::IncorrectChosen)
        );

        let (cx, cy) = pair.correct.rect.center();
        fixture.pointer.reset_center(cx, cy);
        assert_eq!(task.evaluate(&mut fixture.ctx(122)), Some(Outcome::Correct));
    }

    #[test]
    fn sample_only_scene_before_the_touch() {
        let mut task = DelayedMatchTask::new(params());
        let mut fixture = Fixture::new(35);
        task.setup(&mut fixture.ctx(0)).unwrap();

        let mut scene = Scene::default();
        task.populate_scene(&mut scene);
        assert_eq!(scene.items.len(), 1);
        assert!(!scene.blank);
    }
}
