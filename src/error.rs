//! Error types for the playback core.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    /// The backend could not open the track.
    #[error("cannot load {}: {reason}", path.display())]
    UnloadableMedia { path: PathBuf, reason: String },

    /// A position or length read failed; callers retry on their next tick.
    #[error("backend read failed: {0}")]
    BackendRead(String),

    #[error("no track at index {0}")]
    IndexOutOfBounds(usize),
}

impl PlayerError {
    pub fn unloadable(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::UnloadableMedia {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
