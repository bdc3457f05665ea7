//! Command-line interface module.

mod args;
pub mod preprocess;
pub mod serve;

pub use args::{Cli, Commands, PreprocessArgs, ServeArgs};
