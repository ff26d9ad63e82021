//! Bundle summaries, staged artifacts and command outcomes

use crate::models::CertificateInfo;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Display-ready private key details
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    /// Key type, e.g. "RSA" or "EC P-256"
    pub key_type: String,
    /// Key size in bits
    pub bits: u32,
}

/// Contents of a bundle in display-ready form
#[derive(Debug, Clone, Serialize)]
pub struct BundleSummary {
    /// Friendly name stored with the key entry
    pub friendly_name: Option<String>,
    pub certificate: CertificateInfo,
    pub key: KeyInfo,
    /// CA certificates in bundle order
    pub chain: Vec<CertificateInfo>,
}

/// A bundle staged in the export directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// Generated file name, also the download handle
    pub name: String,
    pub path: PathBuf,
    /// Public download URL
    pub url: String,
    pub created_at: DateTime<Utc>,
    /// Instant after which the artifact is no longer served
    pub expires_at: DateTime<Utc>,
    /// Size of the stored envelope in bytes
    pub size: u64,
}

/// Result of the `create` command
#[derive(Debug, Clone, Serialize)]
pub struct CreateResult {
    pub artifact_url: String,
    pub artifact: Artifact,
    pub summary: BundleSummary,
}

/// Result of the `analyze` command
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResult {
    /// Declared name of the uploaded bundle
    pub source_name: String,
    /// Size of the uploaded bundle in bytes
    pub source_size: u64,
    pub summary: BundleSummary,
}

/// Outcome of a single invocation
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Outcome {
    Create(CreateResult),
    Analyze(AnalyzeResult),
}
