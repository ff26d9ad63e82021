//! Data models for p12-convert
//!
//! This module contains the data structures passed between the conversion
//! components and handed back to callers.

pub mod bundle;
pub mod certificate;
pub mod material;

pub use bundle::{AnalyzeResult, Artifact, BundleSummary, CreateResult, KeyInfo, Outcome};
pub use certificate::{CertificateInfo, CertificateRole};
pub use material::{MaterialKind, Passphrase, UploadedMaterial};
