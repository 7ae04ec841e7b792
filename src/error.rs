use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for devloop operations.
pub type DevLoopResult<T> = Result<T, DevLoopError>;

/// Main error type for devloop operations.
#[derive(Error, Debug)]
pub enum DevLoopError {
    /// The watch backend could not be created or a root could not be attached.
    /// Raised at `watch_path` time, never from the drain loop.
    #[error("watch backend error: {0}")]
    Watch(#[from] notify::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `watch_path` was called on a watcher that has already been closed.
    #[error("watcher is closed")]
    WatcherClosed,

    /// The command-line builder was given an empty executable path.
    #[error("executable path must not be empty")]
    MissingExecutable,

    /// `build()` was called without an output directory.
    #[error("output directory is required to build a dev mode command line")]
    MissingOutputDir,

    /// The `debug` parameter did not match `true|false|client|{port}`.
    #[error("invalid value for debug parameter: '{value}' must be true|false|client|{{port}}")]
    InvalidDebugValue { value: String },

    /// A watch root exists but is not a directory.
    #[error("watch root is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_debug_value_display() {
        let err = DevLoopError::InvalidDebugValue {
            value: "maybe".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for debug parameter: 'maybe' must be true|false|client|{port}"
        );
    }

    #[test]
    fn test_not_a_directory_display() {
        let err = DevLoopError::NotADirectory {
            path: PathBuf::from("/tmp/some-file"),
        };
        assert_eq!(err.to_string(), "watch root is not a directory: /tmp/some-file");
    }
}
