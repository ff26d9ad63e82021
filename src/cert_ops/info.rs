//! Display-ready certificate and bundle details
//!
//! Analyzes X.509 certificates using x509-parser.

use crate::cert_ops::key_match::ParsedPrivateKey;
use crate::cert_ops::reader::ParsedCertificate;
use crate::models::{BundleSummary, CertificateInfo, CertificateRole};
use crate::utils::{ConvertError, Field, Result};
use chrono::{DateTime, TimeZone, Utc};
use sha2::Digest;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

/// Certificate parser producing [`CertificateInfo`]
#[derive(Debug, Clone, Copy, Default)]
pub struct CertificateInspector;

impl CertificateInspector {
    pub fn new() -> Self {
        Self
    }

    /// Parse a single DER-encoded certificate
    pub fn inspect(
        &self,
        der: &[u8],
        role: CertificateRole,
    ) -> std::result::Result<CertificateInfo, String> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| format!("Failed to parse certificate: {:?}", e))?;

        let serial = colon_hex(&cert.serial.to_bytes_be());
        let thumbprint = colon_hex(&sha2::Sha256::digest(der));

        let not_before = asn1_time_to_datetime(cert.validity().not_before)?;
        let not_after = asn1_time_to_datetime(cert.validity().not_after)?;

        let (public_key_algorithm, public_key_size) = self.extract_public_key_info(&cert);

        let is_ca = cert
            .basic_constraints()
            .map(|bc| bc.map(|ext| ext.value.ca).unwrap_or(false))
            .unwrap_or(false);

        Ok(CertificateInfo {
            role,
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial,
            thumbprint,
            not_before,
            not_after,
            san: self.extract_san(&cert),
            public_key_algorithm,
            public_key_size,
            signature_algorithm: signature_algorithm_name(&cert),
            is_self_signed: cert.subject() == cert.issuer(),
            is_ca,
            version: cert.version().0 + 1, // X.509 version is 0-indexed
            key_usage: self.extract_key_usage(&cert),
        })
    }

    fn extract_san(&self, cert: &X509Certificate) -> Vec<String> {
        let mut sans = Vec::new();

        if let Ok(Some(san_ext)) = cert.subject_alternative_name() {
            for name in &san_ext.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => sans.push(dns.to_string()),
                    GeneralName::RFC822Name(email) => sans.push(format!("email:{}", email)),
                    GeneralName::IPAddress(ip) => {
                        if ip.len() == 4 {
                            sans.push(format!("{}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]));
                        } else if ip.len() == 16 {
                            let parts: Vec<String> = ip
                                .chunks(2)
                                .map(|c| format!("{:02x}{:02x}", c[0], c[1]))
                                .collect();
                            sans.push(parts.join(":"));
                        }
                    }
                    _ => {}
                }
            }
        }

        sans
    }

    fn extract_public_key_info(&self, cert: &X509Certificate) -> (String, u32) {
        let pk = cert.public_key();

        match pk.parsed() {
            // key_size() already reports bits
            Ok(PublicKey::RSA(rsa)) => ("RSA".to_string(), rsa.key_size() as u32),
            Ok(PublicKey::EC(ec)) => {
                let bits = ec.key_size() as u32;
                (format!("EC P-{}", bits), bits)
            }
            _ => (pk.algorithm.algorithm.to_string(), 0),
        }
    }

    fn extract_key_usage(&self, cert: &X509Certificate) -> Vec<String> {
        let mut usages = Vec::new();

        if let Ok(Some(ku)) = cert.key_usage() {
            let flags = ku.value;
            if flags.digital_signature() {
                usages.push("Digital Signature".to_string());
            }
            if flags.non_repudiation() {
                usages.push("Non-Repudiation".to_string());
            }
            if flags.key_encipherment() {
                usages.push("Key Encipherment".to_string());
            }
            if flags.data_encipherment() {
                usages.push("Data Encipherment".to_string());
            }
            if flags.key_agreement() {
                usages.push("Key Agreement".to_string());
            }
            if flags.key_cert_sign() {
                usages.push("Certificate Sign".to_string());
            }
            if flags.crl_sign() {
                usages.push("CRL Sign".to_string());
            }
        }

        usages
    }
}

fn signature_algorithm_name(cert: &X509Certificate) -> String {
    let oid = cert.signature_algorithm.algorithm.to_id_string();
    let name = match oid.as_str() {
        "1.2.840.113549.1.1.5" => "sha1WithRSAEncryption",
        "1.2.840.113549.1.1.11" => "sha256WithRSAEncryption",
        "1.2.840.113549.1.1.12" => "sha384WithRSAEncryption",
        "1.2.840.113549.1.1.13" => "sha512WithRSAEncryption",
        "1.2.840.113549.1.1.10" => "rsassaPss",
        "1.2.840.10045.4.3.2" => "ecdsa-with-SHA256",
        "1.2.840.10045.4.3.3" => "ecdsa-with-SHA384",
        "1.2.840.10045.4.3.4" => "ecdsa-with-SHA512",
        "1.3.101.112" => "Ed25519",
        _ => return oid,
    };
    name.to_string()
}

fn colon_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Convert ASN.1 time to chrono DateTime
fn asn1_time_to_datetime(time: ASN1Time) -> std::result::Result<DateTime<Utc>, String> {
    Utc.timestamp_opt(time.timestamp(), 0)
        .single()
        .ok_or_else(|| "Invalid timestamp in certificate".to_string())
}

/// Build the display summary for a leaf certificate, its key and CA chain.
///
/// CA certificates are labelled Root when self-signed and Intermediate
/// otherwise. `field` names the upload the certificates came from.
pub fn summarize(
    friendly_name: Option<String>,
    certificate: &ParsedCertificate,
    private_key: &ParsedPrivateKey,
    chain: &[ParsedCertificate],
    field: Field,
) -> Result<BundleSummary> {
    let inspector = CertificateInspector::new();

    let certificate = inspector
        .inspect(certificate.as_der(), CertificateRole::Leaf)
        .map_err(|message| ConvertError::parse(field, message))?;

    let chain = chain
        .iter()
        .map(|cert| {
            let info = inspector.inspect(cert.as_der(), CertificateRole::Intermediate)?;
            Ok(if info.is_self_signed {
                CertificateInfo {
                    role: CertificateRole::Root,
                    ..info
                }
            } else {
                info
            })
        })
        .collect::<std::result::Result<Vec<_>, String>>()
        .map_err(|message| ConvertError::parse(field, message))?;

    Ok(BundleSummary {
        friendly_name,
        certificate,
        key: private_key.info(),
        chain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colon_hex() {
        assert_eq!(colon_hex(&[0x01, 0xab, 0xff]), "01:AB:FF");
        assert_eq!(colon_hex(&[]), "");
    }

    #[test]
    fn test_inspect_rejects_garbage() {
        let err = CertificateInspector::new()
            .inspect(b"not der", CertificateRole::Leaf)
            .unwrap_err();
        assert!(err.contains("Failed to parse certificate"));
    }
}
