//! Certificate material operations
//!
//! Validates uploads, decodes PEM material, and assembles or opens
//! PKCS#12 bundles.

pub mod bags;
pub mod convert;
pub mod info;
pub mod key_match;
pub mod reader;
pub mod validate;

pub use convert::{assemble, open, Bundle, BundleOptions, OpenedBundle};
pub use info::{summarize, CertificateInspector};
pub use key_match::ParsedPrivateKey;
pub use reader::{CertificateChain, MaterialDecoder, ParsedCertificate, PemDecoder};
pub use validate::{validate_material, validate_passphrase};
