//! Command-line interface module
//!
//! This module handles CLI argument parsing using Clap.

pub mod args;

pub use args::{AnalyzeArgs, Cli, Commands, CreateArgs, FetchArgs, SubmitArgs};
