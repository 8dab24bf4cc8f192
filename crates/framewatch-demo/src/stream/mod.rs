pub mod generator;
pub mod patterns;

pub use generator::*;
pub use patterns::*;
