//! Error types for CCD operations.

use thiserror::Error;

/// Errors that can occur while detecting collisions or solving.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CcdError {
    /// A scene mixed 2D and 3D bodies.
    #[error("mixing 2D and 3D bodies in one scene is not supported")]
    MixedDimensions,

    /// A dimension outside {2, 3} was requested.
    #[error("unsupported dimension: {0} (expected 2 or 3)")]
    UnsupportedDimension(usize),

    /// Scene input failed validation.
    #[error("invalid scene: {reason}")]
    InvalidScene {
        /// Description of the validation failure.
        reason: String,
    },

    /// The hash grid domain does not contain an inserted item.
    #[error("hash grid capacity exceeded: {reason}")]
    GridCapacity {
        /// Description of the containment failure.
        reason: String,
    },

    /// A numerical operation failed after local recovery was exhausted.
    #[error("numerical failure: {reason}")]
    NumericalFailure {
        /// Description of what went wrong.
        reason: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },
}

impl CcdError {
    /// Create an invalid scene error.
    #[must_use]
    pub fn invalid_scene(reason: impl Into<String>) -> Self {
        Self::InvalidScene {
            reason: reason.into(),
        }
    }

    /// Create a grid capacity error.
    #[must_use]
    pub fn grid_capacity(reason: impl Into<String>) -> Self {
        Self::GridCapacity {
            reason: reason.into(),
        }
    }

    /// Create a numerical failure error.
    #[must_use]
    pub fn numerical(reason: impl Into<String>) -> Self {
        Self::NumericalFailure {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether this error came from scene/input validation.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::MixedDimensions | Self::InvalidScene { .. })
    }

    /// Whether this error is a numerical failure.
    #[must_use]
    pub fn is_numerical(&self) -> bool {
        matches!(self, Self::NumericalFailure { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CcdError::UnsupportedDimension(4);
        assert!(err.to_string().contains('4'));

        let err = CcdError::invalid_scene("no bodies");
        assert!(err.to_string().contains("no bodies"));
    }

    #[test]
    fn test_error_predicates() {
        assert!(CcdError::MixedDimensions.is_input_error());
        assert!(CcdError::numerical("Cholesky failed").is_numerical());
        assert!(!CcdError::numerical("x").is_input_error());
    }
}
