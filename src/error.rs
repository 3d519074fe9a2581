use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the battery. Every variant is fatal at the point it is
/// detected: the session never retries or degrades, it reports and exits.
#[derive(Error, Debug)]
pub enum BatteryError {
    #[error("\"{key}\" parameter does not exist in input file \"{file}\"")]
    MissingParameter { key: String, file: String },

    #[error("malformed value \"{value}\" for parameter \"{key}\" in \"{file}\"")]
    MalformedParameter {
        key: String,
        value: String,
        file: String,
    },

    #[error("cannot load stimulus asset: {}", path.display())]
    InvalidAssetReference {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("no analog input device detected")]
    NoInputDeviceDetected,

    #[error("no task is marked active in \"{file}\"")]
    NoActiveTasks { file: String },

    #[error("malformed or unreadable roster file \"{file}\"")]
    MalformedRoster { file: String },

    #[error("cannot read input file \"{file}\"")]
    UnreadableFile { file: String },

    #[error("subject \"{subject}\" is not listed in the roster file \"{file}\"")]
    UnknownSubject { subject: String, file: String },

    #[error("stimulus directory \"{}\" holds {count} asset(s); choice tasks need at least 2", dir.display())]
    StimulusPoolTooSmall { dir: PathBuf, count: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BatteryError>;
