//! Sensor boundary errors

use std::error::Error;
use std::fmt;

/// Failure reported by a motion sensor capability probe.
///
/// Callers never see this as fatal: the source folds it into
/// "not available" and the host falls back to the manual trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// No accelerometer on this device
    Unavailable,
    /// The probe itself failed
    ProbeFailed(String),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Unavailable => write!(f, "accelerometer not available"),
            SensorError::ProbeFailed(reason) => {
                write!(f, "accelerometer probe failed: {reason}")
            }
        }
    }
}

impl Error for SensorError {}
