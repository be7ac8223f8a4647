use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchematicError {
    #[error("failed to read fragment {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported fragment format {path:?}: {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },
}

impl SchematicError {
    pub fn unsupported(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, Self::UnsupportedFormat { .. })
    }
}
