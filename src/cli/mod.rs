//! Command-line interface for stixtract.

mod commands;
pub mod helpers;

pub use commands::{is_verbose, run};
