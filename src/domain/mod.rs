pub mod prediction;
pub mod weather;

pub use prediction::*;
pub use weather::*;
