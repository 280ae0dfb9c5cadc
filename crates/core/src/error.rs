//! Typed error kinds that callers may want to match on.
//! Everything else in the crate travels as `anyhow::Error`.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while reading subtitle content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SrtError {
    /// The bytes are neither valid UTF-8 nor valid UTF-16.
    #[error("invalid subtitle content: not decodable as UTF-8 or UTF-16")]
    Undecodable,
}

/// Errors raised by the project store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("project {0} not found")]
    ProjectNotFound(Uuid),

    #[error("project {project} has no sentence {order}")]
    SentenceNotFound { project: Uuid, order: usize },

    /// Only mp3 files are accepted as source audio.
    #[error("not an mp3 file: {}", .0.display())]
    NotMp3(PathBuf),

    #[error("subtitle file produced no segments")]
    MissingSegments,
}
