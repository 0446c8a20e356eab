use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiteprepError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed PDB record at line {line}: {reason}")]
    Pdb { line: usize, reason: String },

    #[error("Pocket file name {0:?} does not match <base>_v1_cavity_<N>.pdb")]
    PocketName(String),

    #[error("Structure {} has no records to attach a header to", .0.display())]
    EmptyStructure(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SiteprepError {
    /// Wraps an I/O error with the path that was being read or written.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SiteprepError::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, SiteprepError>;
