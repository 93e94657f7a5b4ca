//! CLI module: argument parsing for both binaries.
//!
//! - `clap_parser`: the `sql-extract` and `csv2xlsx` argument structs and their
//!   conversion into run configuration
//! - `args`: value parsers and default output names

pub mod args;
mod clap_parser;

pub use clap_parser::{Cli, ConvertCli};
