use rand::Rng;

use crate::config::PursuitParams;
use crate::error::Result;
use crate::geometry::Target;
use crate::outcome::Outcome;
use crate::scene::{Scene, SceneItem};
use crate::session::Counters;
use crate::tasks::{Progress, ResponseClock, TrialContext};
use crate::timer::secs_to_ticks;

/// Pursuit task: the target moves on its own and the pointer must be held
/// inside it for an unbroken dwell. The dwell counter drops back to zero the
/// instant containment breaks.
#[derive(Debug)]
pub struct PursuitTask {
    pub(crate) params: PursuitParams,
    pub(crate) target: Option<Target>,
    /// Consecutive ticks the pointer has been contained.
    pub(crate) dwell_ticks: u64,
    dwell_required: u64,
    pub(crate) clock: ResponseClock,
}

impl PursuitTask {
    pub fn new(params: PursuitParams) -> Self {
        let dwell_required = secs_to_ticks(params.pursuit_secs);
        Self {
            params,
            target: None,
            dwell_ticks: 0,
            dwell_required,
            clock: ResponseClock::default(),
        }
    }

    pub fn setup(&mut self, ctx: &mut TrialContext<'_>) -> Result<()> {
        let diameter = self.params.circle_size.diameter();
        let target = Target::spawn(ctx.rng, ctx.screen, diameter);

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
        self.dwell_ticks = 0;
        self.clock.arm(ctx.now, self.params.response_secs);
        Ok(())
    }

    pub fn evaluate(&mut self, ctx: &mut TrialContext<'_>) -> Option<Outcome> {
        if self.clock.expired(ctx.now) {
            return Some(Outcome::Timeout);
        }

        let target = self.target.as_mut()?;
        target.advance(ctx.screen);

        if target.rect.contains_rect(&ctx.pointer.rect) {
            target.engaged = true;
            self.dwell_ticks += 1;
            if self.dwell_ticks >= self.dwell_required {
                return Some(Outcome::Correct);
            }
        } else {
            target.engaged = false;
            self.dwell_ticks = 0;
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
                engaged: target.engaged,
            });
        }
    }
}
