//! Certificate, key, CA list and bundle decoding
//!
//! Turns validated upload buffers into structured objects. Certificates,
//! keys and CA lists arrive as PEM text; bundles arrive as PKCS#12 DER.

use crate::cert_ops::convert::Bundle;
use crate::cert_ops::key_match::{self, ParsedPrivateKey};
use crate::utils::{ConvertError, Field, Result};
use x509_parser::der_parser::ber::parse_ber;
use x509_parser::prelude::*;

/// OID of the PKCS#7 `data` content type wrapping a PFX auth-safe
const PKCS7_DATA_OID: &str = "1.2.840.113549.1.7.1";

/// A DER-encoded X.509 certificate known to parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCertificate {
    der: Vec<u8>,
}

impl ParsedCertificate {
    /// Check that `der` is an X.509 certificate and take ownership of it
    pub fn from_der(der: Vec<u8>) -> std::result::Result<Self, String> {
        X509Certificate::from_der(&der)
            .map_err(|e| format!("Not a valid X.509 certificate: {:?}", e))?;
        Ok(Self { der })
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name
    pub fn subject(&self) -> String {
        self.with_x509(|cert| cert.subject().to_string())
    }

    /// Issuer distinguished name
    pub fn issuer(&self) -> String {
        self.with_x509(|cert| cert.issuer().to_string())
    }

    /// PEM encoding as a `CERTIFICATE` block
    pub fn to_pem(&self) -> String {
        ::pem::encode(&::pem::Pem::new("CERTIFICATE", self.der.clone()))
    }

    fn with_x509<T: Default>(&self, f: impl FnOnce(&X509Certificate) -> T) -> T {
        // Parsing succeeded in from_der, so this only falls back on misuse
        X509Certificate::from_der(&self.der)
            .map(|(_, cert)| f(&cert))
            .unwrap_or_default()
    }
}

/// CA certificates in the order they were supplied
pub type CertificateChain = Vec<ParsedCertificate>;

/// Decodes validated upload buffers
pub trait MaterialDecoder {
    /// Decode the leaf certificate
    fn certificate(&self, data: &[u8]) -> Result<ParsedCertificate>;

    /// Decode the private key
    fn private_key(&self, data: &[u8]) -> Result<ParsedPrivateKey>;

    /// Decode every certificate in a CA list
    fn ca_chain(&self, data: &[u8]) -> Result<CertificateChain>;

    /// Check the outer structure of a PKCS#12 envelope
    fn bundle(&self, data: &[u8]) -> Result<Bundle>;
}

/// Decoder for PEM uploads and DER-encoded PKCS#12 bundles
#[derive(Debug, Clone, Copy, Default)]
pub struct PemDecoder;

impl MaterialDecoder for PemDecoder {
    fn certificate(&self, data: &[u8]) -> Result<ParsedCertificate> {
        let field = Field::CertFile;
        let cert_pem = parse_pem(data, field)?
            .into_iter()
            .find(|p| p.tag() == "CERTIFICATE")
            .ok_or_else(|| ConvertError::parse(field, "No CERTIFICATE block found"))?;

        ParsedCertificate::from_der(cert_pem.into_contents())
            .map_err(|message| ConvertError::parse(field, message))
    }

    fn private_key(&self, data: &[u8]) -> Result<ParsedPrivateKey> {
        key_match::parse_pem_private_key(data)
    }

    fn ca_chain(&self, data: &[u8]) -> Result<CertificateChain> {
        read_pem_certificates(data, Field::CaList)
    }

    fn bundle(&self, data: &[u8]) -> Result<Bundle> {
        check_pfx_structure(data).map_err(|message| ConvertError::parse(Field::P12File, message))?;
        Ok(Bundle::from_der(data.to_vec()))
    }
}

fn parse_pem(data: &[u8], field: Field) -> Result<Vec<::pem::Pem>> {
    ::pem::parse_many(data)
        .map_err(|e| ConvertError::parse(field, format!("Failed to parse PEM: {}", e)))
}

/// Read all CERTIFICATE blocks from PEM data, in order
fn read_pem_certificates(data: &[u8], field: Field) -> Result<CertificateChain> {
    let certs = parse_pem(data, field)?
        .into_iter()
        .filter(|p| p.tag() == "CERTIFICATE")
        .enumerate()
        .map(|(i, p)| {
            ParsedCertificate::from_der(p.into_contents()).map_err(|message| {
                ConvertError::parse(field, format!("certificate #{}: {}", i + 1, message))
            })
        })
        .collect::<Result<CertificateChain>>()?;

    if certs.is_empty() {
        return Err(ConvertError::parse(
            field,
            "No CERTIFICATE blocks found in CA list",
        ));
    }

    Ok(certs)
}

/// Check the PFX skeleton: SEQUENCE { version 3, ContentInfo { pkcs7-data, .. }, .. }
fn check_pfx_structure(data: &[u8]) -> std::result::Result<(), String> {
    let (_, pfx) = parse_ber(data).map_err(|e| format!("Not a DER structure: {:?}", e))?;

    let fields = pfx
        .as_sequence()
        .map_err(|_| "Outer structure is not a SEQUENCE".to_string())?;

    let version = fields
        .first()
        .and_then(|v| v.as_u32().ok())
        .ok_or("Missing PFX version")?;
    if version != 3 {
        return Err(format!("Unsupported PFX version {}", version));
    }

    let auth_safe = fields
        .get(1)
        .and_then(|a| a.as_sequence().ok())
        .ok_or("Missing authenticated safe")?;
    let content_type = auth_safe
        .first()
        .and_then(|o| o.as_oid().ok())
        .ok_or("Missing authenticated safe content type")?;
    if content_type.to_id_string() != PKCS7_DATA_OID {
        return Err(format!(
            "Unsupported authenticated safe content type {} (public-key integrity mode is not supported)",
            content_type
        ));
    }

    Ok(())
}
