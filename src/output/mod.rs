//! Output formatting module
//!
//! Provides two output formats:
//! - Rich terminal output with colors
//! - JSON

pub mod json;
pub mod results;

pub use json::{print_json, JsonError};
pub use results::{
    format_summary, print_analyze_result, print_create_result, print_outcome, print_sweep_report,
};
