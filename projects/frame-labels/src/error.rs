use std::path::PathBuf;

/// Failures raised while loading inputs or building frame labels.
///
/// Every variant is fatal for the current run: the tools abort instead of
/// emitting a partial label set.
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("{source_name}:{line}: {message}")]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("{}: {message}", path.display())]
    InvalidPath { path: PathBuf, message: String },

    #[error("{source_name}: missing required column '{field}'")]
    MissingField {
        source_name: String,
        field: &'static str,
    },

    #[error("Unknown video '{0}': not present in the frame-rate table")]
    UnknownVideo(String),

    #[error("Unknown class '{0}': not present in the class mapping")]
    UnknownClass(String),

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    #[error("{source_name}: {source}")]
    Json {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write label container {}: {source}", path.display())]
    Npz {
        path: PathBuf,
        #[source]
        source: ndarray_npy::WriteNpzError,
    },

    #[error("Failed to probe {}: {message}", path.display())]
    Probe { path: PathBuf, message: String },

    #[error("Unsupported or disabled backend: {0}")]
    UnsupportedBackend(String),
}

pub type Result<T> = std::result::Result<T, LabelError>;

impl LabelError {
    pub fn parse(source_name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            line,
            message: message.into(),
        }
    }

    pub fn invalid_path(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
