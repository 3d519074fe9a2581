use std::io::Write;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::info;

use crate::config::{SessionConfig, TaskOrder};
use crate::error::{BatteryError, Result};
use crate::geometry::{Pointer, RectPx};
use crate::input::AxisSample;
use crate::outcome::{Outcome, OutcomeResolver};
use crate::scene::{Scene, SceneItem};
use crate::stimulus::StimulusLibrary;
use crate::tasks::{Behavior, Progress, TaskId, TrialContext};
use crate::timer::Tick;

/// Trial and criterion counters. The window counters reset on every
/// criterion advance and task switch; the total is session-monotonic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub total_trials: u32,
    pub trials_in_window: u32,
    pub correct_in_window: u32,
}

impl Counters {
    pub fn record(&mut self, outcome: Outcome) {
        self.total_trials += 1;
        self.trials_in_window += 1;
        if outcome.is_correct() {
            self.correct_in_window += 1;
        }
    }

    pub fn reset_window(&mut self) {
        self.trials_in_window = 0;
        self.correct_in_window = 0;
    }

    /// Correct fraction of the current window, 0.0 while it is empty.
    pub fn window_ratio(&self) -> f32 {
        if self.trials_in_window == 0 {
            return 0.0;
        }
        self.correct_in_window as f32 / self.trials_in_window as f32
    }
}

/// Lifecycle of the single live trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrialPhase {
    /// Next tick instantiates the trial.
    Setup,
    /// Evaluating the behavior every tick.
    Active,
    /// Post-resolution hold. The loop ignores input until `until`, then the
    /// deferred scheduling decision is applied.
    Reinforcing {
        until: Tick,
        blank: bool,
        progress: Progress,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    /// Every task met its criterion; the host should flush and exit.
    Finished,
}

/// The whole mutable state of one session: the task queue, the live trial,
/// the shared pointer and stimulus pool, and the outcome plumbing. Driven by
/// `tick` once per frame; rendering reads `scene`.
pub struct SessionState<W: Write> {
    config: SessionConfig,
    queue: Vec<TaskId>,
    behavior: Behavior,
    counters: Counters,
    pointer: Pointer,
    screen: RectPx,
    rng: StdRng,
    library: StimulusLibrary,
    resolver: OutcomeResolver<W>,
    phase: TrialPhase,
    now: Tick,
    status: SessionStatus,
}

impl<W: Write> SessionState<W> {
    pub fn new(
        config: SessionConfig,
        screen: RectPx,
        library: StimulusLibrary,
        resolver: OutcomeResolver<W>,
        mut rng: StdRng,
    ) -> Result<Self> {
        if config.needs_stimulus_pairs() {
            library.require_pair_capable()?;
        }
        let queue = config.active_tasks();
        if queue.is_empty() {
            return Err(BatteryError::NoActiveTasks {
                file: config.file.clone(),
            });
        }
        let first = Self::pick(&queue, config.order, &mut rng);
        info!(task = first.label(), "session starting");
        let behavior = Behavior::for_task(first, &config);

        Ok(Self {
            config,
            queue,
            behavior,
            counters: Counters::default(),
            pointer: Pointer::new(),
            screen,
            rng,
            library,
            resolver,
            phase: TrialPhase::Setup,
            now: 0,
            status: SessionStatus::Running,
        })
    }

    fn pick(queue: &[TaskId], order: TaskOrder, rng: &mut StdRng) -> TaskId {
        match order {
            TaskOrder::Series => queue[0],
            TaskOrder::Random => *queue.choose(rng).expect("task queue drained early"),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn current_task(&self) -> TaskId {
        self.behavior.task_id()
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn library(&self) -> &StimulusLibrary {
        &self.library
    }

    pub fn resolver(&self) -> &OutcomeResolver<W> {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut OutcomeResolver<W> {
        &mut self.resolver
    }

    /// Advances the engine by one tick with the given analog sample.
    pub fn tick(&mut self, input: AxisSample) -> Result<SessionStatus> {
        if self.status == SessionStatus::Finished {
            return Ok(self.status);
        }
        self.now += 1;

        match self.phase {
            TrialPhase::Setup => {
                let mut ctx = TrialContext {
                    pointer: &mut self.pointer,
                    screen: self.screen,
                    rng: &mut self.rng,
                    library: &mut self.library,
                    input,
                    now: self.now,
                };
                self.behavior.setup(&mut ctx)?;
                self.phase = TrialPhase::Active;
            }
            TrialPhase::Active => {
                if !self.behavior.pointer_frozen() {
                    self.pointer.apply(input, self.screen);
                }
                let mut ctx = TrialContext {
                    pointer: &mut self.pointer,
                    screen: self.screen,
                    rng: &mut self.rng,
                    library: &mut self.library,
                    input,
                    now: self.now,
                };
                if let Some(outcome) = self.behavior.evaluate(&mut ctx) {
                    self.resolve(outcome)?;
                }
            }
            TrialPhase::Reinforcing { until, progress, .. } => {
                if self.now >= until {
                    self.advance(progress);
                }
            }
        }
        Ok(self.status)
    }

    fn resolve(&mut self, outcome: Outcome) -> Result<()> {
        let reaction = self.behavior.reaction_secs(self.now);
        self.counters.record(outcome);
        let fields = self
            .behavior
            .log_fields(&self.counters, outcome, reaction, &self.library);
        let reinforcement = self.resolver.resolve(
            self.behavior.task_id(),
            outcome,
            &fields,
            self.behavior.fail_timeout_secs(),
        )?;
        let progress = self.behavior.register_outcome(outcome, &self.counters);

        self.phase = TrialPhase::Reinforcing {
            until: self.now + reinforcement.hold_ticks,
            blank: reinforcement.blank,
            progress,
        };
        Ok(())
    }

    /// Applies the scheduling decision deferred across the reinforcement
    /// hold, then re-enters Setup for the next trial.
    fn advance(&mut self, progress: Progress) {
        match progress {
            Progress::Continue => {}
            Progress::AdvanceWindow => self.counters.reset_window(),
            Progress::TaskComplete => {
                let done = self.behavior.task_id();
                self.queue.retain(|id| *id != done);
                info!(task = done.label(), "task criterion met");
                if self.queue.is_empty() {
                    self.status = SessionStatus::Finished;
                    info!("all tasks complete");
                    return;
                }
                self.counters.reset_window();
                let next = Self::pick(&self.queue, self.config.order, &mut self.rng);
                self.behavior = Behavior::for_task(next, &self.config);
            }
        }
        self.phase = TrialPhase::Setup;
    }

    /// The frame to draw right now. Blank during a failure hold and during
    /// any behavior-declared blank sub-state; the pointer is painted on top
    /// of everything else.
    pub fn scene(&self) -> Scene {
        if let TrialPhase::Reinforcing { blank: true, .. } = self.phase {
            return Scene::blank();
        }
        let mut scene = Scene::default();
        self.behavior.populate_scene(&mut scene);
        if scene.blank {
            scene.items.clear();
            return scene;
        }
        scene.push(SceneItem::Pointer {
            rect: self.pointer.rect,
        });
        scene
    }
}
