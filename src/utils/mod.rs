//! Utility modules for the compile broker.

pub mod exec;
pub mod git;
pub mod path;
