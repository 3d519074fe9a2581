use rand::Rng;

use crate::config::ChaseParams;
use crate::error::Result;
use crate::geometry::Target;
use crate::outcome::Outcome;
use crate::scene::{Scene, SceneItem};
use crate::session::Counters;
use crate::tasks::{Progress, ResponseClock, TrialContext};

/// Chase task: a bouncing target circle that only travels while the stick is
/// deflected; the trial resolves once the pointer is fully inside it.
#[derive(Debug)]
pub struct ChaseTask {
    pub(crate) params: ChaseParams,
    pub(crate) target: Option<Target>,
    pub(crate) clock: ResponseClock,
}

impl ChaseTask {
    pub fn new(params: ChaseParams) -> Self {
        Self {
            params,
            target: None,
            clock: ResponseClock::default(),
        }
    }

    pub fn setup(&mut self, ctx: &mut TrialContext<'_>) -> Result<()> {
        let diameter = self.params.circle_size.diameter();
        let target = Target::spawn(ctx.rng, ctx.screen, diameter);

        // Re-roll the pointer position until it does not overlap the target.
        while target.rect.intersects(&ctx.pointer.rect) {
            let x = ctx
                .rng
                .random_range(0.0..=(ctx.screen.w - ctx.pointer.rect.w));
            let y = ctx
                .rng
                .random_range(0.0..=(ctx.screen.h - ctx.pointer.rect.h));
            ctx.pointer.reset(x, y);
        }

        self.target = Some(target);
        self.clock.arm(ctx.now, self.params.response_secs);
        Ok(())
    }

    pub fn evaluate(&mut self, ctx: &mut TrialContext<'_>) -> Option<Outcome> {
        if self.clock.expired(ctx.now) {
            return Some(Outcome::Timeout);
        }

        let target = self.target.as_mut()?;
        // The target runs only while the subject is steering.
        if !ctx.input.is_centered() {
            target.advance(ctx.screen);
        }
        if target.rect.contains_rect(&ctx.pointer.rect) {
            return Some(Outcome::Correct);
        }
        None
    }

    pub fn register_outcome(&mut self, _outcome: Outcome, counters: &Counters) -> Progress {
        if counters.correct_in_window >= self.params.trials_to_criterion {
            Progress::TaskComplete
        } else {
            Progress::Continue
        }
    }

    pub fn log_fields(&self, counters: &Counters, reaction_secs: f32) -> String {
        format!(
            "{}  {}  {}  {:.2}",
            counters.total_trials,
            counters.trials_in_window,
            self.params.circle_size,
            reaction_secs,
        )
    }

    pub fn populate_scene(&self, scene: &mut Scene) {
        if let Some(target) = &self.target {
            scene.push(SceneItem::Target {
                rect: target.rect,
                engaged: true,
            });
        }
    }
}
