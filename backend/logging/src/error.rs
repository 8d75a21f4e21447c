use std::io;
use std::path::Path;

use thiserror::Error;

/// Errors raised by the logger's configuration-time and file operations.
///
/// Ordinary logging calls never return these; they surface only from
/// construction, sink toggles, direct writer access and bundling.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("log writer is closed")]
    WriterClosed,

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, LogError>;

impl LogError {
    pub(crate) fn io(action: &str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            context: format!("failed to {action} {}", path.display()),
            source,
        }
    }

    pub(crate) fn file_sink_missing() -> Self {
        Self::Config("logger is not configured to write logs to files".to_string())
    }
}
