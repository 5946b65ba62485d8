//! Unified error system for the ballroom
//!
//! Under a correct protocol none of these fire at runtime. A liveness
//! timeout or an invariant violation means a partner or the floor never
//! materialised, so both are fatal to the actor that observes them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The blocking wait a dancer was stuck in when its liveness bound expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStage {
    /// Acquiring the floor lock
    Floor,
    /// Waiting in the queue for a partner
    Handshake,
    /// Waiting for the partner to finish the dance
    Rendezvous,
    /// Closing the floor
    Close,
}

impl fmt::Display for WaitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitStage::Floor => "floor",
            WaitStage::Handshake => "handshake",
            WaitStage::Rendezvous => "rendezvous",
            WaitStage::Close => "close",
        };
        f.pad(name)
    }
}

/// Unified error type for all ballroom operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum BallroomError {
    /// A bounded wait expired
    #[error("Liveness timeout: dancer {dancer} waited {timeout_ms}ms at {stage}")]
    LivenessTimeout {
        /// Label of the dancer that gave up
        dancer: String,
        /// Where it was waiting
        stage: WaitStage,
        /// The bound that expired
        timeout_ms: u64,
    },

    /// A protocol invariant was broken
    #[error("Invariant violation: {message}")]
    InvariantViolation {
        /// Error message describing the broken invariant
        message: String,
    },

    /// Invalid or unreadable configuration
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Internal runtime error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl BallroomError {
    /// Create a liveness timeout error
    pub fn liveness_timeout(dancer: impl Into<String>, stage: WaitStage, timeout_ms: u64) -> Self {
        Self::LivenessTimeout {
            dancer: dancer.into(),
            stage,
            timeout_ms,
        }
    }

    /// Create an invariant violation error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this is a liveness timeout.
    pub fn is_liveness_timeout(&self) -> bool {
        matches!(self, Self::LivenessTimeout { .. })
    }

    /// Whether this is an invariant violation.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

/// Standard Result type for ballroom operations
pub type Result<T> = std::result::Result<T, BallroomError>;

impl From<std::io::Error> for BallroomError {
    fn from(err: std::io::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<toml::de::Error> for BallroomError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Invalid TOML: {err}"))
    }
}

impl From<toml::ser::Error> for BallroomError {
    fn from(err: toml::ser::Error) -> Self {
        Self::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_honours_width() {
        assert_eq!(format!("{:<11}|", WaitStage::Handshake), "handshake  |");
    }

    #[test]
    fn test_error_creation() {
        let err = BallroomError::invariant("both queues non-empty");
        assert!(err.is_invariant_violation());
        assert_eq!(err.to_string(), "Invariant violation: both queues non-empty");
    }

    #[test]
    fn test_liveness_display() {
        let err = BallroomError::liveness_timeout("3", WaitStage::Handshake, 1500);
        assert!(err.is_liveness_timeout());
        assert_eq!(
            err.to_string(),
            "Liveness timeout: dancer 3 waited 1500ms at handshake"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.toml");
        let err = BallroomError::from(io_err);
        assert!(matches!(err, BallroomError::Config { .. }));
    }
}
