pub mod names;
pub mod snapshot;
pub mod terrain;
