//! Private key parsing and certificate/key pair matching
//!
//! Supports RSA, EC P-256, and EC P-384 keys in PKCS#8, PKCS#1, and SEC1
//! formats. Every key is normalised to PKCS#8, the only encoding a PKCS#12
//! key bag carries.

use crate::cert_ops::reader::ParsedCertificate;
use crate::models::KeyInfo;
use crate::utils::{ConvertError, Field, Result};
use std::fmt;
use x509_parser::prelude::*;

/// A decoded private key
#[derive(Clone, PartialEq, Eq)]
pub struct ParsedPrivateKey {
    pkcs8_der: Vec<u8>,
    /// The SubjectPublicKeyInfo bytes derived from the private key
    public_key_spki: Vec<u8>,
    key_type: &'static str,
    bits: u32,
}

impl ParsedPrivateKey {
    /// PKCS#8 `PrivateKeyInfo` DER encoding of the key
    pub fn pkcs8_der(&self) -> &[u8] {
        &self.pkcs8_der
    }

    pub fn public_key_spki(&self) -> &[u8] {
        &self.public_key_spki
    }

    pub fn key_type(&self) -> &'static str {
        self.key_type
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn info(&self) -> KeyInfo {
        KeyInfo {
            key_type: self.key_type.to_string(),
            bits: self.bits,
        }
    }

    /// PEM encoding of the key as an unencrypted PKCS#8 `PRIVATE KEY` block
    pub fn to_pem(&self) -> String {
        ::pem::encode(&::pem::Pem::new("PRIVATE KEY", self.pkcs8_der.clone()))
    }
}

impl fmt::Debug for ParsedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedPrivateKey")
            .field("key_type", &self.key_type)
            .field("bits", &self.bits)
            .finish_non_exhaustive()
    }
}

/// Decode the first private key block found in PEM text
pub fn parse_pem_private_key(data: &[u8]) -> Result<ParsedPrivateKey> {
    let field = Field::KeyFile;
    let pems = ::pem::parse_many(data)
        .map_err(|e| ConvertError::parse(field, format!("Failed to parse PEM: {}", e)))?;

    for p in &pems {
        let parsed = match p.tag() {
            // PKCS#8 format
            "PRIVATE KEY" => parse_pkcs8_der(p.contents()),
            // PKCS#1 RSA format
            "RSA PRIVATE KEY" => parse_pkcs1_rsa(p.contents()),
            // SEC1 EC format
            "EC PRIVATE KEY" => parse_sec1_ec(p.contents()),
            "ENCRYPTED PRIVATE KEY" => Err(
                "Encrypted private keys are not supported, upload the key unencrypted"
                    .to_string(),
            ),
            _ => continue,
        };
        return parsed.map_err(|message| ConvertError::parse(field, message));
    }

    Err(ConvertError::parse(
        field,
        "No recognized private key block found",
    ))
}

/// Parse a PKCS#8 DER-encoded private key and extract SPKI
pub fn parse_pkcs8_der(der: &[u8]) -> std::result::Result<ParsedPrivateKey, String> {
    use pkcs8::DecodePrivateKey;

    // Try RSA first
    if let Ok(rsa_key) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        return rsa_key_info(&rsa_key, der.to_vec());
    }

    // Try EC P-256
    if let Ok(ec_key) = p256::SecretKey::from_pkcs8_der(der) {
        use p256::pkcs8::EncodePublicKey;
        let spki = ec_key
            .public_key()
            .to_public_key_der()
            .map_err(|e| format!("Failed to encode EC P-256 public key: {}", e))?;
        return Ok(ParsedPrivateKey {
            pkcs8_der: der.to_vec(),
            public_key_spki: spki.as_ref().to_vec(),
            key_type: "EC P-256",
            bits: 256,
        });
    }

    // Try EC P-384
    if let Ok(ec_key) = p384::SecretKey::from_pkcs8_der(der) {
        use p384::pkcs8::EncodePublicKey;
        let spki = ec_key
            .public_key()
            .to_public_key_der()
            .map_err(|e| format!("Failed to encode EC P-384 public key: {}", e))?;
        return Ok(ParsedPrivateKey {
            pkcs8_der: der.to_vec(),
            public_key_spki: spki.as_ref().to_vec(),
            key_type: "EC P-384",
            bits: 384,
        });
    }

    Err("Unsupported key type in PKCS#8 container".to_string())
}

/// Parse a PKCS#1 RSA private key
fn parse_pkcs1_rsa(der: &[u8]) -> std::result::Result<ParsedPrivateKey, String> {
    use rsa::pkcs1::DecodeRsaPrivateKey;
    use rsa::pkcs8::EncodePrivateKey;

    let rsa_key = rsa::RsaPrivateKey::from_pkcs1_der(der)
        .map_err(|e| format!("Failed to parse PKCS#1 RSA key: {}", e))?;
    let pkcs8 = rsa_key
        .to_pkcs8_der()
        .map_err(|e| format!("Failed to convert RSA key to PKCS#8: {}", e))?;

    rsa_key_info(&rsa_key, pkcs8.as_bytes().to_vec())
}

fn rsa_key_info(
    rsa_key: &rsa::RsaPrivateKey,
    pkcs8_der: Vec<u8>,
) -> std::result::Result<ParsedPrivateKey, String> {
    use rsa::pkcs8::EncodePublicKey;
    use rsa::traits::PublicKeyParts;

    let public_key = rsa::RsaPublicKey::from(rsa_key);
    let spki = public_key
        .to_public_key_der()
        .map_err(|e| format!("Failed to encode RSA public key: {}", e))?;

    Ok(ParsedPrivateKey {
        pkcs8_der,
        public_key_spki: spki.as_ref().to_vec(),
        key_type: "RSA",
        bits: (rsa_key.size() * 8) as u32,
    })
}

/// Parse a SEC1 EC private key
fn parse_sec1_ec(der: &[u8]) -> std::result::Result<ParsedPrivateKey, String> {
    // Try P-256 first
    if let Ok(ec_key) = p256::SecretKey::from_sec1_der(der) {
        use p256::pkcs8::{EncodePrivateKey, EncodePublicKey};
        let spki = ec_key
            .public_key()
            .to_public_key_der()
            .map_err(|e| format!("Failed to encode EC P-256 public key: {}", e))?;
        let pkcs8 = ec_key
            .to_pkcs8_der()
            .map_err(|e| format!("Failed to convert EC P-256 key to PKCS#8: {}", e))?;
        return Ok(ParsedPrivateKey {
            pkcs8_der: pkcs8.as_bytes().to_vec(),
            public_key_spki: spki.as_ref().to_vec(),
            key_type: "EC P-256",
            bits: 256,
        });
    }

    // Try P-384
    if let Ok(ec_key) = p384::SecretKey::from_sec1_der(der) {
        use p384::pkcs8::{EncodePrivateKey, EncodePublicKey};
        let spki = ec_key
            .public_key()
            .to_public_key_der()
            .map_err(|e| format!("Failed to encode EC P-384 public key: {}", e))?;
        let pkcs8 = ec_key
            .to_pkcs8_der()
            .map_err(|e| format!("Failed to convert EC P-384 key to PKCS#8: {}", e))?;
        return Ok(ParsedPrivateKey {
            pkcs8_der: pkcs8.as_bytes().to_vec(),
            public_key_spki: spki.as_ref().to_vec(),
            key_type: "EC P-384",
            bits: 384,
        });
    }

    Err("Unsupported EC curve (only P-256 and P-384 are supported)".to_string())
}

/// Check if a private key matches a certificate by comparing SubjectPublicKeyInfo
pub fn keys_match(cert: &ParsedCertificate, key: &ParsedPrivateKey) -> Result<bool> {
    let (_, x509) = X509Certificate::from_der(cert.as_der()).map_err(|e| {
        ConvertError::parse(
            Field::CertFile,
            format!("Failed to parse certificate: {:?}", e),
        )
    })?;

    // Extract the raw SPKI bytes from the certificate
    let cert_spki = x509.public_key().raw;

    Ok(cert_spki == key.public_key_spki.as_slice())
}
