//! Types module for the shake dice core
//!
//! Plain data: motion samples, die faces, roll snapshots, settings and the
//! sensor error type. Stateful components live in `systems`.

pub mod dice;
pub mod error;
pub mod motion;
pub mod settings;

pub use dice::*;
pub use error::*;
pub use motion::*;
pub use settings::*;
