//! Uploaded material and secrets handed to the conversion core

use crate::utils::Field;
use serde::Serialize;
use std::fmt;

/// What an uploaded buffer is expected to contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MaterialKind {
    Certificate,
    PrivateKey,
    CaList,
    Bundle,
}

impl MaterialKind {
    /// The request field this kind of material arrives in
    pub fn field(&self) -> Field {
        match self {
            MaterialKind::Certificate => Field::CertFile,
            MaterialKind::PrivateKey => Field::KeyFile,
            MaterialKind::CaList => Field::CaList,
            MaterialKind::Bundle => Field::P12File,
        }
    }
}

/// A raw upload as captured by the request layer
#[derive(Clone)]
pub struct UploadedMaterial {
    kind: MaterialKind,
    filename: String,
    declared_len: u64,
    data: Vec<u8>,
}

impl UploadedMaterial {
    /// Capture a buffer whose declared length is its actual length
    pub fn new(kind: MaterialKind, filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            kind,
            filename: filename.into(),
            declared_len: data.len() as u64,
            data,
        }
    }

    /// Capture a buffer with a length declared by the transport, which may
    /// differ from what was actually read
    pub fn with_declared_len(
        kind: MaterialKind,
        filename: impl Into<String>,
        declared_len: u64,
        data: Vec<u8>,
    ) -> Self {
        Self {
            kind,
            filename: filename.into(),
            declared_len,
            data,
        }
    }

    pub fn kind(&self) -> MaterialKind {
        self.kind
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn declared_len(&self) -> u64 {
        self.declared_len
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for UploadedMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // contents may be key material
        f.debug_struct("UploadedMaterial")
            .field("kind", &self.kind)
            .field("filename", &self.filename)
            .field("declared_len", &self.declared_len)
            .finish_non_exhaustive()
    }
}

/// Secret protecting a bundle. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
    /// Wrap a secret without checking its length; the input validator is
    /// responsible for enforcing the configured ceiling on request input
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}
