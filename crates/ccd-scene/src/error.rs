//! Error type for scene loading.

use thiserror::Error;

use ccd_types::CcdError;

/// Errors that can occur while reading a scene.
#[derive(Debug, Error)]
pub enum SceneError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The scene content failed validation.
    #[error(transparent)]
    Ccd(#[from] CcdError),

    /// A mesh file could not be interpreted.
    #[error("invalid mesh: {reason}")]
    InvalidMesh {
        /// Description of the problem.
        reason: String,
    },
}

impl SceneError {
    /// Create an invalid mesh error.
    #[must_use]
    pub fn invalid_mesh(reason: impl Into<String>) -> Self {
        Self::InvalidMesh {
            reason: reason.into(),
        }
    }
}
