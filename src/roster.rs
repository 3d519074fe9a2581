use std::path::Path;

use crate::error::{BatteryError, Result};

/// The subject roster: a newline-delimited list of subject identifiers,
/// read once at session start.
#[derive(Debug, Clone)]
pub struct Roster {
    file: String,
    subjects: Vec<String>,
}

impl Roster {
    pub fn load(path: &Path) -> Result<Self> {
        let file = path.display().to_string();
        let raw = std::fs::read_to_string(path)
            .map_err(|_| BatteryError::MalformedRoster { file: file.clone() })?;
        Self::from_text(&raw, file)
    }

    pub fn from_text(raw: &str, file: impl Into<String>) -> Result<Self> {
        let file = file.into();
        let subjects: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        if subjects.is_empty() {
            return Err(BatteryError::MalformedRoster { file });
        }
        Ok(Self { file, subjects })
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    /// Resolves the session subject: a requested identifier must be listed,
    /// no request defaults to the first roster entry.
    pub fn select(&self, requested: Option<&str>) -> Result<&str> {
        match requested {
            Some(subject) => self
                .subjects
                .iter()
                .find(|s| s.as_str() == subject)
                .map(String::as_str)
                .ok_or_else(|| BatteryError::UnknownSubject {
                    subject: subject.to_owned(),
                    file: self.file.clone(),
                }),
            None => Ok(&self.subjects[0]),
        }
    }
}
