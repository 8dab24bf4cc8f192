pub mod cli;
pub mod stream;

pub use cli::*;
pub use stream::*;
