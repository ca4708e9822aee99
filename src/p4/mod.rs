pub mod command;
pub mod engine;
mod error;
pub mod exchange;
pub mod grammar;
pub mod numeric;
pub mod sequence;
pub mod template;
pub mod variables;

pub use error::*;
