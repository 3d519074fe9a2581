use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Append-only per-subject result log, one line per resolved trial. A trial
/// abandoned by the stop signal writes no line.
pub struct TrialLog<W: Write> {
    sink: W,
}

impl TrialLog<BufWriter<File>> {
    /// Opens (or creates) `<resultsDir>/<subjectId>Data.txt` for appending.
    pub fn for_subject(results_dir: &Path, subject: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(results_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(results_dir.join(format!("{subject}Data.txt")))?;
        Ok(Self {
            sink: BufWriter::new(file),
        })
    }
}

impl<W: Write> TrialLog<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Appends one record and returns the timestamp it was stamped with.
    pub fn append(&mut self, task: &str, value: &str) -> std::io::Result<String> {
        let now = Local::now();
        writeln!(self.sink, "{}", format_line(now, task, value))?;
        Ok(now.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.sink.flush()
    }

    pub fn into_sink(self) -> W {
        self.sink
    }
}

const TIMESTAMP_FORMAT: &str = "%m-%d-%Y %H:%M:%S";

/// Line layout: local timestamp, task identifier, task-specific fields,
/// two spaces between groups.
pub fn format_line(timestamp: DateTime<Local>, task: &str, value: &str) -> String {
    format!("{}  {}  {}", timestamp.format(TIMESTAMP_FORMAT), task, value)
}

/// Path of the per-subject session summary written at normal completion.
pub fn summary_path(results_dir: &Path, subject: &str) -> PathBuf {
    results_dir.join(format!("{subject}Summary.json"))
}
