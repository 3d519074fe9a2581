use std::fmt;
use std::path::Path;

use crate::error::{BatteryError, Result};
use crate::tasks::TaskId;

/// Flat key/value parameter file: a parameter name on one line, its value on
/// the next. Lookups match names case-insensitively by substring, the way the
/// on-disk format has always been read. The raw text is kept so an unmodified
/// store re-serializes byte for byte.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    raw: String,
    lines: Vec<String>,
    file: String,
}

impl ParameterStore {
    pub fn load(path: &Path) -> Result<Self> {
        let file = path.display().to_string();
        let raw = std::fs::read_to_string(path)
            .map_err(|_| BatteryError::UnreadableFile { file: file.clone() })?;
        Ok(Self::from_text(raw, file))
    }

    pub fn from_text(raw: String, file: impl Into<String>) -> Self {
        let lines = raw.lines().map(str::to_owned).collect();
        Self {
            raw,
            lines,
            file: file.into(),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// The original text, unchanged. Loading then serializing an unmodified
    /// store reproduces the input exactly.
    pub fn serialize(&self) -> &str {
        &self.raw
    }

    /// Finds the first line containing `key` (case-insensitive) and returns
    /// the line after it. A missing key is a fatal configuration error.
    pub fn value(&self, key: &str) -> Result<&str> {
        let needle = key.to_lowercase();
        for (i, line) in self.lines.iter().enumerate() {
            if line.to_lowercase().contains(&needle) {
                return self
                    .lines
                    .get(i + 1)
                    .map(|v| v.trim_end())
                    .ok_or_else(|| self.missing(key));
            }
        }
        Err(self.missing(key))
    }

    /// Yes/No values: anything containing "yes" (case-insensitive) is true.
    pub fn yes_no(&self, key: &str) -> Result<bool> {
        Ok(self.value(key)?.to_lowercase().contains("yes"))
    }

    pub fn float(&self, key: &str) -> Result<f32> {
        let value = self.value(key)?;
        value
            .trim()
            .parse()
            .map_err(|_| self.malformed(key, value))
    }

    pub fn int(&self, key: &str) -> Result<u32> {
        let value = self.value(key)?;
        value.trim().parse().map_err(|_| self.malformed(key, value))
    }

    fn missing(&self, key: &str) -> BatteryError {
        BatteryError::MissingParameter {
            key: key.to_owned(),
            file: self.file.clone(),
        }
    }

    fn malformed(&self, key: &str, value: &str) -> BatteryError {
        BatteryError::MalformedParameter {
            key: key.to_owned(),
            value: value.to_owned(),
            file: self.file.clone(),
        }
    }
}

/// Session-level ordering of the task queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOrder {
    /// Fixed declaration order.
    Series,
    /// Uniform draw among the remaining tasks each time one is retired.
    Random,
}

/// Target circle size for Chase and Pursuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircleSize {
    Small,
    Medium,
    Large,
}

impl CircleSize {
    pub fn diameter(self) -> f32 {
        match self {
            CircleSize::Small => 100.0,
            CircleSize::Medium => 200.0,
            CircleSize::Large => 300.0,
        }
    }

    fn parse(store: &ParameterStore, key: &str) -> Result<Self> {
        let value = store.value(key)?;
        let lower = value.to_lowercase();
        if lower.contains("small") {
            Ok(CircleSize::Small)
        } else if lower.contains("medium") {
            Ok(CircleSize::Medium)
        } else if lower.contains("large") {
            Ok(CircleSize::Large)
        } else {
            Err(BatteryError::MalformedParameter {
                key: key.to_owned(),
                value: value.to_owned(),
                file: store.file().to_owned(),
            })
        }
    }
}

impl fmt::Display for CircleSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CircleSize::Small => "Small",
            CircleSize::Medium => "Medium",
            CircleSize::Large => "Large",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct SideParams {
    pub trials_to_criterion: u32,
    pub start_level: u8,
    pub response_secs: f32,
    pub fail_timeout_secs: f32,
    /// Parsed and preserved; drives no behavior.
    pub titration: bool,
}

#[derive(Debug, Clone)]
pub struct ChaseParams {
    pub trials_to_criterion: u32,
    pub circle_size: CircleSize,
    pub response_secs: f32,
    pub fail_timeout_secs: f32,
    pub titration: bool,
}

#[derive(Debug, Clone)]
pub struct PursuitParams {
    pub trials_to_criterion: u32,
    pub circle_size: CircleSize,
    pub pursuit_secs: f32,
    pub response_secs: f32,
    pub fail_timeout_secs: f32,
    pub titration: bool,
}

#[derive(Debug, Clone)]
pub struct MatchParams {
    pub trials_to_criterion: u32,
    pub percent_correct: f32,
    pub response_secs: f32,
    pub fail_timeout_secs: f32,
    pub titration: bool,
}

#[derive(Debug, Clone)]
pub struct DelayedMatchParams {
    pub trials_to_criterion: u32,
    pub percent_correct: f32,
    pub delay_secs: f32,
    pub response_secs: f32,
    pub fail_timeout_secs: f32,
    pub titration: bool,
}

#[derive(Debug, Clone)]
pub struct LearningSetParams {
    pub trials_per_problem: u32,
    pub number_of_problems: u32,
    pub percent_correct: f32,
    pub response_secs: f32,
    pub fail_timeout_secs: f32,
    pub titration: bool,
}

/// Strongly typed session configuration, validated eagerly at load so that a
/// missing or malformed parameter can never surface mid-session. A task's
/// parameters are only read when that task is active.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Parameter file the configuration was loaded from, for error messages.
    pub file: String,
    pub order: TaskOrder,
    pub side: Option<SideParams>,
    pub chase: Option<ChaseParams>,
    pub pursuit: Option<PursuitParams>,
    pub match_to_sample: Option<MatchParams>,
    pub delayed_match: Option<DelayedMatchParams>,
    pub learning_set: Option<LearningSetParams>,
}

impl SessionConfig {
    pub fn from_store(store: &ParameterStore) -> Result<Self> {
        let order = if store
            .value("Task Order")?
            .to_lowercase()
            .contains("random")
        {
            TaskOrder::Random
        } else {
            TaskOrder::Series
        };

        let side = if store.yes_no("Side Task Active")? {
            let start_level = store.int("Side Start Level")? as u8;
            if !(1..=6).contains(&start_level) {
                return Err(BatteryError::MalformedParameter {
                    key: "Side Start Level".into(),
                    value: start_level.to_string(),
                    file: store.file().to_owned(),
                });
            }
            Some(SideParams {
                trials_to_criterion: store.int("Side Task Trials to Criterion")?,
                start_level,
                response_secs: store.float("Side Task Response Time")?,
                fail_timeout_secs: store.float("Side Task Timeout Time")?,
                titration: store.yes_no("Side Task Titration")?,
            })
        } else {
            None
        };

        let chase = if store.yes_no("Chase Task Active")? {
            Some(ChaseParams {
                trials_to_criterion: store.int("Chase Task Trials to Criterion")?,
                circle_size: CircleSize::parse(store, "Chase Circle Size")?,
                response_secs: store.float("Chase Task Response Time")?,
                fail_timeout_secs: store.float("Chase Task Timeout Time")?,
                titration: store.yes_no("Chase Task Titration")?,
            })
        } else {
            None
        };

        let pursuit = if store.yes_no("Pursuit Task Active")? {
            Some(PursuitParams {
                trials_to_criterion: store.int("Pursuit Task Trials to Criterion")?,
                circle_size: CircleSize::parse(store, "Pursuit Circle Size")?,
                pursuit_secs: store.float("Pursuit Task Pursuit Time")?,
                response_secs: store.float("Pursuit Task Response Time")?,
                fail_timeout_secs: store.float("Pursuit Task Timeout Time")?,
                titration: store.yes_no("Pursuit Task Titration")?,
            })
        } else {
            None
        };

        let match_to_sample = if store.yes_no("MTS Task Active")? {
            Some(MatchParams {
                trials_to_criterion: store.int("MTS Task Trials for Criterion")?,
                percent_correct: store.float("MTS Task % Correct for Criterion")?,
                response_secs: store.float("MTS Task Response Time")?,
                fail_timeout_secs: store.float("MTS Task Timeout Time")?,
                titration: store.yes_no("MTS Task Titration")?,
            })
        } else {
            None
        };

        let delayed_match = if store.yes_no("DMTS Task Active")? {
            Some(DelayedMatchParams {
                trials_to_criterion: store.int("DMTS Task Trials for Criterion")?,
                percent_correct: store.float("DMTS Task % Correct for Criterion")?,
                delay_secs: store.float("DMTS Delay Time")?,
                response_secs: store.float("DMTS Task Response Time")?,
                fail_timeout_secs: store.float("DMTS Task Timeout Time")?,
                titration: store.yes_no("DMTS Task Titration")?,
            })
        } else {
            None
        };

        let learning_set = if store.yes_no("Learning Set Task Active")? {
            Some(LearningSetParams {
                trials_per_problem: store.int("Learning Set Trials Per Problem")?,
                number_of_problems: store.int("Learning Set Number of Problems")?,
                percent_correct: store.float("Learning Set % Correct for Criterion")?,
                response_secs: store.float("Learning Set Response Time")?,
                fail_timeout_secs: store.float("Learning Set Timeout Time")?,
                titration: store.yes_no("Learning Set Titration")?,
            })
        } else {
            None
        };

        Ok(Self {
            file: store.file().to_owned(),
            order,
            side,
            chase,
            pursuit,
            match_to_sample,
            delayed_match,
            learning_set,
        })
    }

    /// Active task identifiers in declaration order.
    pub fn active_tasks(&self) -> Vec<TaskId> {
        let mut queue = Vec::new();
        if self.side.is_some() {
            queue.push(TaskId::Side);
        }
        if self.chase.is_some() {
            queue.push(TaskId::Chase);
        }
        if self.pursuit.is_some() {
            queue.push(TaskId::Pursuit);
        }
        if self.match_to_sample.is_some() {
            queue.push(TaskId::MatchToSample);
        }
        if self.delayed_match.is_some() {
            queue.push(TaskId::DelayedMatchToSample);
        }
        if self.learning_set.is_some() {
            queue.push(TaskId::LearningSet);
        }
        queue
    }

    /// True when any task drawing stimulus pairs is active; such sessions
    /// require an asset pool of at least two entries.
    pub fn needs_stimulus_pairs(&self) -> bool {
        self.match_to_sample.is_some()
            || self.delayed_match.is_some()
            || self.learning_set.is_some()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_text() -> String {
        [
            "Task Order",
            "Series",
            "Side Task Active",
            "Yes",
            "Side Task Trials to Criterion",
            "2",
            "Side Start Level",
            "1",
            "Side Task Response Time",
            "10.0",
            "Side Task Timeout Time",
            "5.0",
            "Side Task Titration",
            "No",
            "Chase Task Active",
            "Yes",
            "Chase Task Trials to Criterion",
            "3",
            "Chase Circle Size",
            "Medium",
            "Chase Task Response Time",
            "15.0",
            "Chase Task Timeout Time",
            "5.0",
            "Chase Task Titration",
            "No",
            "Pursuit Task Active",
            "No",
            "MTS Task Active",
            "Yes",
            "MTS Task Trials for Criterion",
            "10",
            "MTS Task % Correct for Criterion",
            "80.0",
            "MTS Task Response Time",
            "20.0",
            "MTS Task Timeout Time",
            "6.0",
            "MTS Task Titration",
            "Yes",
            "DMTS Task Active",
            "No",
            "Learning Set Task Active",
            "No",
        ]
        .join("\n")
    }

    pub(crate) fn sample_store() -> ParameterStore {
        ParameterStore::from_text(sample_text(), "parameters.txt")
    }

    #[test]
    fn lookup_is_case_insensitive_substring() {
        let store = sample_store();
        assert_eq!(store.value("task order").unwrap(), "Series");
        assert_eq!(store.value("CHASE CIRCLE").unwrap(), "Medium");
    }

    #[test]
    fn missing_key_names_key_and_file() {
        let store = sample_store();
        let err = store.value("Reward Magnitude").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Reward Magnitude"));
        assert!(msg.contains("parameters.txt"));
    }

    #[test]
    fn round_trip_preserves_text() {
        let text = sample_text();
        let store = ParameterStore::from_text(text.clone(), "parameters.txt");
        assert_eq!(store.serialize(), text);
    }

    #[test]
    fn active_tasks_in_declaration_order() {
        let config = SessionConfig::from_store(&sample_store()).unwrap();
        assert_eq!(
            config.active_tasks(),
            vec![TaskId::Side, TaskId::Chase, TaskId::MatchToSample]
        );
        assert_eq!(config.order, TaskOrder::Series);
        assert!(config.needs_stimulus_pairs());
    }

    #[test]
    fn titration_is_parsed_but_inert() {
        let config = SessionConfig::from_store(&sample_store()).unwrap();
        assert!(config.match_to_sample.unwrap().titration);
        assert!(!config.side.unwrap().titration);
    }

    #[test]
    fn inactive_task_skips_its_parameters() {
        // Pursuit is inactive and its remaining keys are absent; the load
        // must still succeed.
        let config = SessionConfig::from_store(&sample_store()).unwrap();
        assert!(config.pursuit.is_none());
    }

    #[test]
    fn start_level_out_of_range_is_rejected() {
        let text = sample_text().replace("Side Start Level\n1", "Side Start Level\n9");
        let store = ParameterStore::from_text(text, "parameters.txt");
        assert!(SessionConfig::from_store(&store).is_err());
    }

    #[test]
    fn malformed_number_is_rejected() {
        let text = sample_text().replace(
            "Chase Task Response Time\n15.0",
            "Chase Task Response Time\nfast",
        );
        let store = ParameterStore::from_text(text, "parameters.txt");
        let err = SessionConfig::from_store(&store).unwrap_err();
        assert!(err.to_string().contains("fast"));
    }
}
