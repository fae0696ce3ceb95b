//! Stateful components of the shake-to-roll pipeline
//!
//! sensor -> shake_detector (threshold + debounce) -> roll_arbiter -> sink

mod debounce;
mod roll_arbiter;
mod sensor;
mod shake_detector;

pub use debounce::*;
pub use roll_arbiter::*;
pub use sensor::*;
pub use shake_detector::*;
