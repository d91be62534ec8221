use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the rnetprobe library.
#[derive(Error, Debug)]
pub enum RnetprobeError {
    /// Remote session could not be opened.
    #[error("session: {0}")]
    Session(String),
    /// Probe failed to run inside an open session.
    #[error("probe: {0}")]
    Probe(String),
    /// An operation did not complete in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// Destination of a file sink could not be created or written.
    #[error("cannot write to '{}': {source}", .path.display())]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Malformed record or command output.
    #[error("parse: {0}")]
    Parse(String),
    /// Invalid configuration value.
    #[error("config: {0}")]
    Config(String),
    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Other error cases.
    #[error("other: {0}")]
    Other(String),
}

impl RnetprobeError {
    pub(crate) fn sink(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RnetprobeError::Sink {
            path: path.into(),
            source,
        }
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for RnetprobeError {
    fn from(err: serde_json::Error) -> Self {
        RnetprobeError::Parse(err.to_string())
    }
}
