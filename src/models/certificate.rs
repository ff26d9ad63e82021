//! Certificate information types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Display-ready certificate details
#[derive(Debug, Clone, Serialize)]
pub struct CertificateInfo {
    /// Position of the certificate within the bundle
    pub role: CertificateRole,
    /// Certificate subject distinguished name
    pub subject: String,
    /// Certificate issuer distinguished name
    pub issuer: String,
    /// Serial number (hex string)
    pub serial: String,
    /// SHA-256 thumbprint
    pub thumbprint: String,
    /// Not valid before
    pub not_before: DateTime<Utc>,
    /// Not valid after
    pub not_after: DateTime<Utc>,
    /// Subject Alternative Names
    pub san: Vec<String>,
    /// Public key algorithm
    pub public_key_algorithm: String,
    /// Public key size in bits
    pub public_key_size: u32,
    /// Signature algorithm
    pub signature_algorithm: String,
    /// Whether this is a self-signed certificate
    pub is_self_signed: bool,
    /// Whether this is a CA certificate
    pub is_ca: bool,
    /// Certificate version
    pub version: u32,
    /// Key usage extensions
    pub key_usage: Vec<String>,
}

impl CertificateInfo {
    /// Calculate days until expiry (negative if expired)
    pub fn days_until_expiry(&self) -> i64 {
        let now = Utc::now();
        let duration = self.not_after.signed_duration_since(now);
        duration.num_days()
    }

    /// Check if the certificate is expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.not_after
    }

    /// Common name from the subject, or the full subject if it has none
    pub fn subject_cn(&self) -> String {
        extract_cn(&self.subject)
    }
}

/// Extract common name from a distinguished name string
fn extract_cn(dn: &str) -> String {
    // DN format: "C=US, O=Example Inc, CN=example.com"
    for part in dn.split(',') {
        let part = part.trim();
        if let Some(cn) = part.strip_prefix("CN=") {
            return cn.to_string();
        }
    }
    dn.to_string()
}

/// Role of a certificate inside a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CertificateRole {
    Leaf,
    Intermediate,
    Root,
}

impl fmt::Display for CertificateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertificateRole::Leaf => write!(f, "Server/System/Application Certificate"),
            CertificateRole::Intermediate => write!(f, "Intermediate CA"),
            CertificateRole::Root => write!(f, "Root CA"),
        }
    }
}
