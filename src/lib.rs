//! p12-convert library
//!
//! Converts between PEM material and PKCS#12 bundles:
//! - Assemble a certificate, its private key and CA certificates into a
//!   password-protected bundle, staged for download with a limited lifetime
//! - Open an existing bundle and recover its certificate, key and CA chain
//!
//! # Usage
//!
//! ```rust,ignore
//! use p12_convert::runner::{Converter, CreateRequest};
//! use p12_convert::Settings;
//!
//! let converter = Converter::new(&Settings::default());
//! let result = converter.create(&request)?;
//! println!("{}", result.artifact_url);
//! ```

pub mod cert_ops;
pub mod cli;
pub mod commands;
pub mod config;
pub mod export;
pub mod models;
pub mod output;
pub mod runner;
pub mod utils;

// Re-export commonly used types
pub use cli::Cli;
pub use config::Settings;
pub use models::{Artifact, BundleSummary, Outcome};
pub use runner::{AnalyzeRequest, Command, Converter, CreateRequest};
pub use utils::{ConvertError, ErrorKind, Result};
