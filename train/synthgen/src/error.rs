use std::path::PathBuf;

use thiserror::Error;

/// Failure rendering or composing a single sample. The batch skips the
/// sample and carries on.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot render an empty word")]
    EmptyWord,

    #[error("failed to read font {path}: {source}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a usable font")]
    InvalidFont { path: PathBuf },

    #[error("failed to load background {path}: {source}")]
    Background {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Pack(#[from] packer::PackError),
}

/// Missing inputs. Raised before any worker starts.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{0} does not exist")]
    Missing(PathBuf),

    #[error("no {exts} files in {dir}")]
    NoMatches { dir: PathBuf, exts: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corpus {0} has no lines longer than the minimum length")]
    EmptyCorpus(PathBuf),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write labels: {0}")]
    Json(#[from] serde_json::Error),
}
