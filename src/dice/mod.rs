pub mod systems;
pub mod types;

pub use systems::*;
pub use types::*;
