//! CLI argument types and parsing helpers.
mod cli;
pub(crate) mod parsers;
mod types;


pub use cli::{BenchArgs, Command, EchoArgs};
pub use types::{ConcurrencyArg, ModeArg, PositiveUsize};
