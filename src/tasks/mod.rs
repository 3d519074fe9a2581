pub mod chase;
pub mod delayed_match;
pub mod learning_set;
pub mod match_to_sample;
pub mod pursuit;
pub mod side;

pub use chase::ChaseTask;
pub use delayed_match::DelayedMatchTask;
pub use learning_set::LearningSetTask;
pub use match_to_sample::MatchToSampleTask;
pub use pursuit::PursuitTask;
pub use side::SideTask;

use rand::rngs::StdRng;
use rand::Rng;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::geometry::{Pointer, RectPx};
use crate::input::AxisSample;
use crate::outcome::Outcome;
use crate::scene::Scene;
use crate::session::Counters;
use crate::stimulus::{StimulusIndex, StimulusLibrary, StimulusPair};
use crate::timer::{secs_to_ticks, ticks_to_secs, Tick};

/// Identifier of one task type, in session declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskId {
    Side,
    Chase,
    Pursuit,
    MatchToSample,
    DelayedMatchToSample,
    LearningSet,
}

impl TaskId {
    /// Short name used in result-log lines.
    pub fn label(self) -> &'static str {
        match self {
            TaskId::Side => "Side",
            TaskId::Chase => "Chase",
            TaskId::Pursuit => "Pursuit",
            TaskId::MatchToSample => "MTS",
            TaskId::DelayedMatchToSample => "DMTS",
            TaskId::LearningSet => "LS",
        }
    }
}

/// Everything a behavior may touch during setup and per-tick evaluation.
/// The analog sample is read once per tick and shared with every consumer.
pub struct TrialContext<'a> {
    pub pointer: &'a mut Pointer,
    pub screen: RectPx,
    pub rng: &'a mut StdRng,
    pub library: &'a mut StimulusLibrary,
    pub input: AxisSample,
    pub now: Tick,
}

/// Per-trial response-time clock. Expiry is checked before any success test
/// in the same tick, so a just-in-time touch never beats the deadline.
#[derive(Debug, Clone, Default)]
pub struct ResponseClock {
    started: Option<Tick>,
    deadline: Option<Tick>,
}

impl ResponseClock {
    pub fn arm(&mut self, now: Tick, secs: f32) {
        self.started = Some(now);
        self.deadline = Some(now + secs_to_ticks(secs));
    }

    pub fn expired(&self, now: Tick) -> bool {
        self.deadline.is_some_and(|deadline| now > deadline)
    }

    /// Elapsed reaction time in seconds since the clock was armed.
    pub fn reaction_secs(&self, now: Tick) -> f32 {
        self.started
            .map_or(0.0, |started| ticks_to_secs(now.saturating_sub(started)))
    }
}

/// What the scheduler should do after a resolved trial is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Next trial of the same task, same window.
    Continue,
    /// Criterion step met (Side level-up): same task, fresh window.
    AdvanceWindow,
    /// Task criterion fully met; retire it.
    TaskComplete,
}

/// A stimulus placed on screen for hit-testing and drawing.
#[derive(Debug, Clone, Copy)]
pub struct Placed {
    pub index: StimulusIndex,
    pub rect: RectPx,
}

/// A correct/incorrect pair with randomized left/right placement.
#[derive(Debug, Clone, Copy)]
pub struct PlacedPair {
    pub correct: Placed,
    pub incorrect: Placed,
    pub correct_on_left: bool,
}

impl PlacedPair {
    pub fn side_label(&self) -> &'static str {
        if self.correct_on_left {
            "Left"
        } else {
            "Right"
        }
    }

    pub fn left_index(&self) -> StimulusIndex {
        if self.correct_on_left {
            self.correct.index
        } else {
            self.incorrect.index
        }
    }

    pub fn right_index(&self) -> StimulusIndex {
        if self.correct_on_left {
            self.incorrect.index
        } else {
            self.correct.index
        }
    }
}

/// Places a drawn pair at the choice row: correct side chosen uniformly,
/// x at 15% / 85% of screen width, centered on the given y.
pub fn place_pair(
    library: &mut StimulusLibrary,
    rng: &mut StdRng,
    screen: RectPx,
    pair: StimulusPair,
    y: f32,
) -> Result<PlacedPair> {
    let correct_on_left = rng.random_bool(0.5);
    let (correct_frac, incorrect_frac) = if correct_on_left {
        (0.15, 0.85)
    } else {
        (0.85, 0.15)
    };

    let (cw, ch) = library.fitted_size(pair.correct)?;
    let (iw, ih) = library.fitted_size(pair.incorrect)?;
    Ok(PlacedPair {
        correct: Placed {
            index: pair.correct,
            rect: RectPx::centered(screen.w * correct_frac, y, cw, ch),
        },
        incorrect: Placed {
            index: pair.incorrect,
            rect: RectPx::centered(screen.w * incorrect_frac, y, iw, ih),
        },
        correct_on_left,
    })
}

/// The six task behaviors behind one uniform lifecycle capability:
/// setup once per trial, evaluate every Active tick, record the outcome
/// against the advancement rule, and describe the frame to draw.
#[derive(Debug)]
pub enum Behavior {
    Side(SideTask),
    Chase(ChaseTask),
    Pursuit(PursuitTask),
    MatchToSample(MatchToSampleTask),
    DelayedMatchToSample(DelayedMatchTask),
    LearningSet(LearningSetTask),
}

impl Behavior {
    /// Builds the behavior for a scheduled task. The queue only ever holds
    /// active tasks, so the matching parameter block is present.
    pub fn for_task(id: TaskId, config: &SessionConfig) -> Self {
        match id {
            TaskId::Side => Behavior::Side(SideTask::new(
                config.side.clone().expect("Side scheduled while inactive"),
            )),
            TaskId::Chase => Behavior::Chase(ChaseTask::new(
                config.chase.clone().expect("Chase scheduled while inactive"),
            )),
            TaskId::Pursuit => Behavior::Pursuit(PursuitTask::new(
                config
                    .pursuit
                    .clone()
                    .expect("Pursuit scheduled while inactive"),
            )),
            TaskId::MatchToSample => Behavior::MatchToSample(MatchToSampleTask::new(
                config
                    .match_to_sample
                    .clone()
                    .expect("MTS scheduled while inactive"),
            )),
            TaskId::DelayedMatchToSample => Behavior::DelayedMatchToSample(DelayedMatchTask::new(
                config
                    .delayed_match
                    .clone()
                    .expect("DMTS scheduled while inactive"),
            )),
            TaskId::LearningSet => Behavior::LearningSet(LearningSetTask::new(
                config
                    .learning_set
                    .clone()
                    .expect("LS scheduled while inactive"),
            )),
        }
    }

    pub fn task_id(&self) -> TaskId {
        match self {
            Behavior::Side(_) => TaskId::Side,
            Behavior::Chase(_) => TaskId::Chase,
            Behavior::Pursuit(_) => TaskId::Pursuit,
            Behavior::MatchToSample(_) => TaskId::MatchToSample,
            Behavior::DelayedMatchToSample(_) => TaskId::DelayedMatchToSample,
            Behavior::LearningSet(_) => TaskId::LearningSet,
        }
    }

    /// One-shot trial setup: instantiate stimuli/target, reset the pointer,
    /// start the response clock.
    pub fn setup(&mut self, ctx: &mut TrialContext<'_>) -> Result<()> {
        match self {
            Behavior::Side(task) => task.setup(ctx),
            Behavior::Chase(task) => task.setup(ctx),
            Behavior::Pursuit(task) => task.setup(ctx),
            Behavior::MatchToSample(task) => task.setup(ctx),
            Behavior::DelayedMatchToSample(task) => task.setup(ctx),
            Behavior::LearningSet(task) => task.setup(ctx),
        }
    }

    /// Per-tick success/failure/timeout test while the trial is Active.
    pub fn evaluate(&mut self, ctx: &mut TrialContext<'_>) -> Option<Outcome> {
        match self {
            Behavior::Side(task) => task.evaluate(ctx),
            Behavior::Chase(task) => task.evaluate(ctx),
            Behavior::Pursuit(task) => task.evaluate(ctx),
            Behavior::MatchToSample(task) => task.evaluate(ctx),
            Behavior::DelayedMatchToSample(task) => task.evaluate(ctx),
            Behavior::LearningSet(task) => task.evaluate(ctx),
        }
    }

    /// Applies the task's criterion-advancement rule after the outcome has
    /// been counted and logged.
    pub fn register_outcome(&mut self, outcome: Outcome, counters: &Counters) -> Progress {
        match self {
            Behavior::Side(task) => task.register_outcome(outcome, counters),
            Behavior::Chase(task) => task.register_outcome(outcome, counters),
            Behavior::Pursuit(task) => task.register_outcome(outcome, counters),
            Behavior::MatchToSample(task) => task.register_outcome(outcome, counters),
            Behavior::DelayedMatchToSample(task) => task.register_outcome(outcome, counters),
            Behavior::LearningSet(task) => task.register_outcome(outcome, counters),
        }
    }

    /// Ordered task-specific fields for the result-log line.
    pub fn log_fields(
        &self,
        counters: &Counters,
        outcome: Outcome,
        reaction_secs: f32,
        library: &StimulusLibrary,
    ) -> String {
        match self {
            Behavior::Side(task) => task.log_fields(counters, reaction_secs),
            Behavior::Chase(task) => task.log_fields(counters, reaction_secs),
            Behavior::Pursuit(task) => task.log_fields(counters, reaction_secs),
            Behavior::MatchToSample(task) => {
                task.log_fields(counters, outcome, reaction_secs, library)
            }
            Behavior::DelayedMatchToSample(task) => {
                task.log_fields(counters, outcome, reaction_secs, library)
            }
            Behavior::LearningSet(task) => {
                task.log_fields(counters, outcome, reaction_secs, library)
            }
        }
    }

    pub fn reaction_secs(&self, now: Tick) -> f32 {
        match self {
            Behavior::Side(task) => task.clock.reaction_secs(now),
            Behavior::Chase(task) => task.clock.reaction_secs(now),
            Behavior::Pursuit(task) => task.clock.reaction_secs(now),
            Behavior::MatchToSample(task) => task.clock.reaction_secs(now),
            Behavior::DelayedMatchToSample(task) => task.clock.reaction_secs(now),
            Behavior::LearningSet(task) => task.clock.reaction_secs(now),
        }
    }

    /// Blank-screen sub-states (DMTS delay) suspend pointer motion.
    pub fn pointer_frozen(&self) -> bool {
        match self {
            Behavior::DelayedMatchToSample(task) => task.pointer_frozen(),
            _ => false,
        }
    }

    pub fn populate_scene(&self, scene: &mut Scene) {
        match self {
            Behavior::Side(task) => task.populate_scene(scene),
            Behavior::Chase(task) => task.populate_scene(scene),
            Behavior::Pursuit(task) => task.populate_scene(scene),
            Behavior::MatchToSample(task) => task.populate_scene(scene),
            Behavior::DelayedMatchToSample(task) => task.populate_scene(scene),
            Behavior::LearningSet(task) => task.populate_scene(scene),
        }
    }

    /// Blank-screen duration applied after an incorrect or timed-out trial.
    pub fn fail_timeout_secs(&self) -> f32 {
        match self {
            Behavior::Side(task) => task.params.fail_timeout_secs,
            Behavior::Chase(task) => task.params.fail_timeout_secs,
            Behavior::Pursuit(task) => task.params.fail_timeout_secs,
            Behavior::MatchToSample(task) => task.params.fail_timeout_secs,
            Behavior::DelayedMatchToSample(task) => task.params.fail_timeout_secs,
            Behavior::LearningSet(task) => task.params.fail_timeout_secs,
        }
    }
}
