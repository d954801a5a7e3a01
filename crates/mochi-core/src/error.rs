use std::fmt;

/// Failures from a progress storage backend.
///
/// These never escape `ProgressStore`: the store logs them and falls back to
/// defaults, so gameplay is never interrupted by a bad save.
#[derive(Debug)]
pub enum ProgressError {
    /// Reading or writing the backing medium failed.
    Io(std::io::Error),
    /// Stored bytes were present but not a valid progress record.
    Decode(serde_json::Error),
    /// The record could not be encoded for writing.
    Encode(serde_json::Error),
}

impl fmt::Display for ProgressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "progress storage I/O failed: {e}"),
            Self::Decode(e) => write!(f, "progress record is malformed: {e}"),
            Self::Encode(e) => write!(f, "progress record could not be encoded: {e}"),
        }
    }
}

impl std::error::Error for ProgressError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Decode(e) | Self::Encode(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ProgressError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
