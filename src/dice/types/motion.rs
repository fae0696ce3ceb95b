//! Motion samples and shake classification
//!
//! A sample is one accelerometer reading in device units (1.0 is roughly one
//! g). Classification is a pure function of a single sample: no history, no
//! caching.

use serde::{Deserialize, Serialize};

/// Default shake threshold in acceleration units.
///
/// Tuning guide:
/// - 1.5 = very sensitive
/// - 1.78 = balanced (recommended)
/// - 2.0 = less sensitive
pub const SHAKE_THRESHOLD: f32 = 1.78;

/// One 3-axis accelerometer reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl MotionSample {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm of this sample
    pub fn magnitude(&self) -> f32 {
        magnitude(self)
    }
}

impl From<[f32; 3]> for MotionSample {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Euclidean norm: sqrt(x² + y² + z²)
pub fn magnitude(sample: &MotionSample) -> f32 {
    (sample.x * sample.x + sample.y * sample.y + sample.z * sample.z).sqrt()
}

/// Whether the sample is a shake against [`SHAKE_THRESHOLD`].
///
/// The comparison is strict: a sample exactly at the threshold is not a shake.
pub fn is_shaking(sample: &MotionSample) -> bool {
    is_shaking_with(sample, SHAKE_THRESHOLD)
}

/// Same as [`is_shaking`] with an explicit threshold.
pub fn is_shaking_with(sample: &MotionSample, threshold: f32) -> bool {
    magnitude(sample) > threshold
}
