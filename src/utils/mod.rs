//! Utility modules for p12-convert
//!
//! This module contains the error types shared by every component.

pub mod error;

pub use error::{ConfigError, ConvertError, ErrorKind, Field, Result};
