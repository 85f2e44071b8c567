// src/error.rs

//! Crate-wide error taxonomy.
//!
//! Every fallible library operation returns [`Result`]. The CLI layer wraps
//! these in `anyhow::Result` with `.context(..)` to add user-facing detail;
//! library code never reaches for `anyhow` itself so that callers can match
//! on a specific [`Error`] variant.

use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid recipe at {path}: {reason}")]
    InvalidRecipe { path: String, reason: String },

    #[error("dependency cycle: {detail}")]
    DependencyCycle { detail: String },

    #[error("chroot {name} failed to initialize: {reason}")]
    ChrootInitFailed { name: String, reason: String },

    #[error("chroot {name} is not active")]
    ChrootInactive { name: String },

    #[error("failed to mount {mount_source} at {destination}: {reason}")]
    MountFailed {
        mount_source: String,
        destination: String,
        reason: String,
    },

    #[error("chroot {name}: leaked mount at {path} (mounted on host but not tracked)")]
    LeakedMount { name: String, path: String },

    #[error("chroot {name}: ghost mount at {path} (tracked but not mounted on host)")]
    GhostMount { name: String, path: String },

    #[error("build failed for recipe {recipe}")]
    BuildFailed { recipe: String },

    #[error("failed to update repository index for bucket {bucket}: {reason}")]
    IndexFailed { bucket: String, reason: String },

    #[error("required external tool missing: {tool}")]
    ExternalToolMissing { tool: String },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
