use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::logging::TrialLog;
use crate::tasks::TaskId;
use crate::timer::secs_to_ticks;

/// How a trial resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    IncorrectChosen,
    Timeout,
}

impl Outcome {
    pub fn is_correct(self) -> bool {
        matches!(self, Outcome::Correct)
    }

    /// Label used in choice-task log lines; timeouts log as Incorrect, as
    /// they always have.
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Correct => "Correct",
            Outcome::IncorrectChosen | Outcome::Timeout => "Incorrect",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Correct,
    Incorrect,
}

/// Plays the reinforcement sound cue. Audio decoding and output live in the
/// host; the engine only says which cue to fire.
pub trait CuePlayer {
    fn play(&mut self, cue: Cue);
}

/// Cue sink for hosts without audio wired up.
#[derive(Debug, Default)]
pub struct LoggingCues;

impl CuePlayer for LoggingCues {
    fn play(&mut self, cue: Cue) {
        info!(?cue, "reinforcement cue");
    }
}

/// The single exclusive reward resource. The blocking reinforcement hold
/// guarantees pulses never overlap.
pub trait RewardActuator {
    /// Commands exactly one reward-delivery pulse.
    fn dispense_one(&mut self);
}

/// Stepper steps per dispensed pellet.
pub const PELLET_STEPS: u32 = 30;
/// Pellets dispensed in one direction before the motor reverses, so the
/// feed screw does not pack.
pub const PELLETS_PER_DIRECTION: u32 = 5;

/// Dispenser bookkeeping over a stepper motor. The step/microstep wire
/// protocol stays in the host; this tracks direction and run length.
#[derive(Debug)]
pub struct StepperDispenser {
    forward: bool,
    runs_in_direction: u32,
}

impl StepperDispenser {
    pub fn new() -> Self {
        Self {
            forward: true,
            runs_in_direction: 0,
        }
    }

    pub fn forward(&self) -> bool {
        self.forward
    }
}

impl Default for StepperDispenser {
    fn default() -> Self {
        Self::new()
    }
}

impl RewardActuator for StepperDispenser {
    fn dispense_one(&mut self) {
        info!(
            steps = PELLET_STEPS,
            forward = self.forward,
            "dispensing one pellet"
        );
        self.runs_in_direction += 1;
        if self.runs_in_direction > PELLETS_PER_DIRECTION {
            self.runs_in_direction = 0;
            self.forward = !self.forward;
        }
    }
}

/// Seconds the loop holds after a reward pulse so the cue finishes and the
/// pellet lands before the next trial.
pub const REWARD_SETTLE_SECS: f32 = 4.0;

/// How long the loop stays blocked after resolution, and whether the screen
/// is blanked for the duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reinforcement {
    pub hold_ticks: u64,
    pub blank: bool,
}

/// One resolved trial, kept for the end-of-session summary.
#[derive(Debug, Clone, Serialize)]
pub struct TrialRecord {
    pub task: String,
    pub outcome: String,
    pub detail: String,
    pub timestamp: String,
}

/// Converts a resolved trial into reinforcement plus exactly one result-log
/// record. Correct: reward cue, one pellet pulse, fixed settle hold.
/// Incorrect or timeout: punishment cue, blanked screen for the task's
/// failure timeout.
pub struct OutcomeResolver<W: Write> {
    log: TrialLog<W>,
    cues: Box<dyn CuePlayer>,
    actuator: Box<dyn RewardActuator>,
    records: Vec<TrialRecord>,
}

impl<W: Write> OutcomeResolver<W> {
    pub fn new(log: TrialLog<W>, cues: Box<dyn CuePlayer>, actuator: Box<dyn RewardActuator>) -> Self {
        Self {
            log,
            cues,
            actuator,
            records: Vec::new(),
        }
    }

    pub fn resolve(
        &mut self,
        task: TaskId,
        outcome: Outcome,
        fields: &str,
        fail_timeout_secs: f32,
    ) -> std::io::Result<Reinforcement> {
        let reinforcement = if outcome.is_correct() {
            self.cues.play(Cue::Correct);
            self.actuator.dispense_one();
            Reinforcement {
                hold_ticks: secs_to_ticks(REWARD_SETTLE_SECS),
                blank: false,
            }
        } else {
            self.cues.play(Cue::Incorrect);
            Reinforcement {
                hold_ticks: secs_to_ticks(fail_timeout_secs),
                blank: true,
            }
        };

        let timestamp = self.log.append(task.label(), fields)?;
        self.records.push(TrialRecord {
            task: task.label().to_owned(),
            outcome: outcome.label().to_owned(),
            detail: fields.to_owned(),
            timestamp,
        });
        Ok(reinforcement)
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.log.flush()
    }

    /// Writes the session summary next to the result log at normal
    /// completion.
    pub fn write_summary(&self, path: &Path) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &self.records)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::timer::TICK_HZ;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    pub(crate) struct RecordingCues(pub Rc<RefCell<Vec<Cue>>>);

    impl CuePlayer for RecordingCues {
        fn play(&mut self, cue: Cue) {
            self.0.borrow_mut().push(cue);
        }
    }

    #[derive(Default)]
    pub(crate) struct CountingActuator(pub Rc<RefCell<u32>>);

    impl RewardActuator for CountingActuator {
        fn dispense_one(&mut self) {
            *self.0.borrow_mut() += 1;
        }
    }

    fn resolver(
        cues: Rc<RefCell<Vec<Cue>>>,
        pulses: Rc<RefCell<u32>>,
    ) -> OutcomeResolver<Vec<u8>> {
        OutcomeResolver::new(
            TrialLog::new(Vec::new()),
            Box::new(RecordingCues(cues)),
            Box::new(CountingActuator(pulses)),
        )
    }

    #[test]
    fn correct_trial_rewards_once_and_holds() {
        let cues = Rc::new(RefCell::new(Vec::new()));
        let pulses = Rc::new(RefCell::new(0));
        let mut resolver = resolver(cues.clone(), pulses.clone());

        let reinforcement = resolver
            .resolve(TaskId::Chase, Outcome::Correct, "1  1  Medium  2.00", 5.0)
            .unwrap();

        assert_eq!(*pulses.borrow(), 1);
        assert_eq!(*cues.borrow(), vec![Cue::Correct]);
        assert_eq!(
            reinforcement,
            Reinforcement {
                hold_ticks: (REWARD_SETTLE_SECS * TICK_HZ as f32) as u64,
                blank: false,
            }
        );
        assert_eq!(resolver.records().len(), 1);
    }

    #[test]
    fn failed_trial_blanks_for_the_task_timeout() {
        let cues = Rc::new(RefCell::new(Vec::new()));
        let pulses = Rc::new(RefCell::new(0));
        let mut resolver = resolver(cues.clone(), pulses.clone());

        let reinforcement = resolver
            .resolve(TaskId::MatchToSample, Outcome::Timeout, "1  1  ...", 6.0)
            .unwrap();

        assert_eq!(*pulses.borrow(), 0);
        assert_eq!(*cues.borrow(), vec![Cue::Incorrect]);
        assert_eq!(
            reinforcement,
            Reinforcement {
                hold_ticks: 6 * TICK_HZ as u64,
                blank: true,
            }
        );
    }

    #[test]
    fn stepper_reverses_after_a_run_of_pellets() {
        let mut stepper = StepperDispenser::new();
        assert!(stepper.forward());
        for _ in 0..=PELLETS_PER_DIRECTION {
            stepper.dispense_one();
        }
        assert!(!stepper.forward());
    }
}
