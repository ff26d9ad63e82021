//! Custom error types for p12-convert
//!
//! Every failure of the conversion pipeline is classified into one of a
//! small, fixed set of kinds. Messages name the offending request field
//! where one is known.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Request field a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Cmd,
    CertFile,
    KeyFile,
    CaList,
    P12File,
    P12Pass,
}

impl Field {
    /// Name of the field as submitted by the upload form
    pub fn form_name(&self) -> &'static str {
        match self {
            Field::Cmd => "cmd",
            Field::CertFile => "certfile",
            Field::KeyFile => "keyfile",
            Field::CaList => "calist",
            Field::P12File => "p12file",
            Field::P12Pass => "p12pass",
        }
    }

    /// Human readable description used in error messages
    pub fn description(&self) -> &'static str {
        match self {
            Field::Cmd => "command",
            Field::CertFile => "certificate file",
            Field::KeyFile => "private key file",
            Field::CaList => "CA list file",
            Field::P12File => "PKCS#12 file",
            Field::P12Pass => "PKCS#12 passphrase",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.form_name())
    }
}

/// Classification of a [`ConvertError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InputMissing,
    SizeExceeded,
    ParseFailure,
    CryptoFailure,
    IoFailure,
    NotFound,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InputMissing => "InputMissing",
            ErrorKind::SizeExceeded => "SizeExceeded",
            ErrorKind::ParseFailure => "ParseFailure",
            ErrorKind::CryptoFailure => "CryptoFailure",
            ErrorKind::IoFailure => "IOFailure",
            ErrorKind::NotFound => "NotFound",
        };
        f.write_str(name)
    }
}

/// Errors produced while validating, decoding, bundling or staging material
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("The {field} is missing or empty")]
    InputMissing { field: Field },

    #[error("Invalid {field} '{value}': expected create or analyze")]
    InvalidCommand { field: Field, value: String },

    #[error("The uploaded {field} is greater than {limit} bytes ({actual} bytes)")]
    SizeExceeded {
        field: Field,
        limit: usize,
        actual: usize,
    },

    #[error("Failed to parse the {field}: {message}")]
    ParseFailure { field: Field, message: String },

    #[error("PKCS#12 error: {message}")]
    CryptoFailure { message: String },

    #[error("Artifact I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact '{name}' does not exist or has expired")]
    NotFound { name: String },
}

impl ConvertError {
    pub(crate) fn parse(field: Field, message: impl Into<String>) -> Self {
        ConvertError::ParseFailure {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn crypto(message: impl Into<String>) -> Self {
        ConvertError::CryptoFailure {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// The category this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::InputMissing { .. } | ConvertError::InvalidCommand { .. } => {
                ErrorKind::InputMissing
            }
            ConvertError::SizeExceeded { .. } => ErrorKind::SizeExceeded,
            ConvertError::ParseFailure { .. } => ErrorKind::ParseFailure,
            ConvertError::CryptoFailure { .. } => ErrorKind::CryptoFailure,
            ConvertError::Io { .. } => ErrorKind::IoFailure,
            ConvertError::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// The request field this error names, if any
    pub fn field(&self) -> Option<Field> {
        match self {
            ConvertError::InputMissing { field }
            | ConvertError::InvalidCommand { field, .. }
            | ConvertError::SizeExceeded { field, .. }
            | ConvertError::ParseFailure { field, .. } => Some(*field),
            _ => None,
        }
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias using ConvertError
pub type Result<T> = std::result::Result<T, ConvertError>;
