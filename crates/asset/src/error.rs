use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by asset loaders.
///
/// Loaders never abort the process; the caller picks between failing hard
/// (startup assets) and substituting a placeholder (editor scene switch).
#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("asset not found: {0}")]
    NotFound(PathBuf),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {path}: {message}")]
    Decode { path: PathBuf, message: String },
}

impl AssetLoadError {
    /// Parse error at a zero-based line index (reported one-based).
    pub(crate) fn parse(line_index: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line: line_index + 1,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }
}

pub type Result<T> = std::result::Result<T, AssetLoadError>;
