//! CLI module
//!
//! `gitlab-gather [OPTIONS] <PATH>...` fetches every page of each listing
//! path and prints one JSON line per page.

mod commands;
mod runner;

pub use commands::{Cli, OutputFormat};
pub use runner::Runner;
