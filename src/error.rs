use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not determine the home directory")]
    NoHome,

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("profile not found: {}", .0.display())]
    ProfileNotFound(PathBuf),

    #[error("invalid profile name: {0:?}")]
    InvalidProfileName(String),

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("sensor frame on line {line}: {source}")]
    Frame {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read sensor frames: {0}")]
    Stream(#[from] std::io::Error),
}
