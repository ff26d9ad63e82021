//! PKCS#12 bundle assembly and extraction
//!
//! Envelope cryptography is delegated to `p12-keystore`; this module owns
//! the parameter defaults and the mapping of failures.

use crate::cert_ops::bags;
use crate::cert_ops::key_match::{self, ParsedPrivateKey};
use crate::cert_ops::reader::{CertificateChain, ParsedCertificate};
use crate::config::{BundleCipher, BundleMac, BundleSettings};
use crate::models::Passphrase;
use crate::utils::{ConvertError, Result};
use p12_keystore::{Certificate, EncryptionAlgorithm, KeyStore, KeyStoreEntry, MacAlgorithm};
use sha2::Digest;

/// Alias used when no friendly name is supplied
pub const DEFAULT_FRIENDLY_NAME: &str = "certificate";

/// The only message an extraction failure carries, whatever went wrong
const EXTRACT_FAILURE: &str = "could not extract certificate, key or CA data from the bundle";

/// An encrypted PKCS#12 envelope
#[derive(Clone, PartialEq, Eq)]
pub struct Bundle {
    der: Vec<u8>,
}

impl Bundle {
    pub(crate) fn from_der(der: Vec<u8>) -> Self {
        Self { der }
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    pub fn len(&self) -> usize {
        self.der.len()
    }

    pub fn is_empty(&self) -> bool {
        self.der.is_empty()
    }
}

impl std::fmt::Debug for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bundle({} bytes)", self.der.len())
    }
}

/// Parameters for building a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleOptions {
    /// Friendly name stored with the key entry
    pub friendly_name: Option<String>,
    /// Cipher for both the key bag and the certificate bags
    pub encryption: BundleCipher,
    pub kdf_iterations: u32,
    pub mac: BundleMac,
    pub mac_iterations: u32,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self::from_settings(&BundleSettings::default())
    }
}

impl BundleOptions {
    pub fn from_settings(settings: &BundleSettings) -> Self {
        Self {
            friendly_name: None,
            encryption: settings.encryption,
            kdf_iterations: settings.kdf_iterations,
            mac: settings.mac,
            mac_iterations: settings.mac_iterations,
        }
    }

    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }
}

fn encryption_algorithm(cipher: BundleCipher) -> EncryptionAlgorithm {
    match cipher {
        BundleCipher::Aes256 => EncryptionAlgorithm::PbeWithHmacSha256AndAes256,
        BundleCipher::TripleDes => EncryptionAlgorithm::PbeWithShaAnd3KeyTripleDesCbc,
    }
}

fn mac_algorithm(mac: BundleMac) -> MacAlgorithm {
    match mac {
        BundleMac::Sha256 => MacAlgorithm::HmacSha256,
        BundleMac::Sha1 => MacAlgorithm::HmacSha1,
    }
}

/// Build a bundle from a leaf certificate, its private key and CA chain
pub fn assemble(
    certificate: &ParsedCertificate,
    private_key: &ParsedPrivateKey,
    chain: &[ParsedCertificate],
    passphrase: &Passphrase,
    options: &BundleOptions,
) -> Result<Bundle> {
    if !key_match::keys_match(certificate, private_key)? {
        return Err(ConvertError::crypto(
            "The private key does not match the certificate",
        ));
    }

    // Leaf first, then the CA certificates in the order supplied
    let certs = std::iter::once(certificate)
        .chain(chain.iter())
        .map(|cert| Certificate::from_der(cert.as_der()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            ConvertError::crypto(format!("Failed to prepare certificate for PKCS#12: {}", e))
        })?;

    // Local key ID ties the key bag to the leaf certificate bag
    let local_key_id = sha2::Sha256::digest(certificate.as_der()).to_vec();

    let key_chain = p12_keystore::PrivateKeyChain::new(
        private_key.pkcs8_der().to_vec(),
        &local_key_id,
        certs,
    );

    let alias = options
        .friendly_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_FRIENDLY_NAME);

    let mut keystore = KeyStore::new();
    keystore.add_entry(alias, KeyStoreEntry::PrivateKeyChain(key_chain));

    let der = keystore
        .writer(passphrase.expose())
        .encryption_algorithm(encryption_algorithm(options.encryption))
        .encryption_iterations(options.kdf_iterations.into())
        .mac_algorithm(mac_algorithm(options.mac))
        .mac_iterations(options.mac_iterations.into())
        .write()
        .map_err(|e| ConvertError::crypto(format!("Failed to serialize PKCS#12: {}", e)))?;

    tracing::debug!(
        "Assembled PKCS#12 bundle '{}' with {} CA certificate(s), {} bytes",
        alias,
        chain.len(),
        der.len()
    );

    Ok(Bundle::from_der(der))
}

/// Contents recovered from a bundle
#[derive(Debug, Clone)]
pub struct OpenedBundle {
    pub friendly_name: Option<String>,
    pub certificate: ParsedCertificate,
    pub private_key: ParsedPrivateKey,
    pub chain: CertificateChain,
}

impl OpenedBundle {
    /// PEM text holding the key, the leaf certificate and the CA chain
    pub fn to_pem(&self) -> String {
        let mut pem_output = self.private_key.to_pem();
        pem_output.push_str(&self.certificate.to_pem());
        for cert in &self.chain {
            pem_output.push_str(&cert.to_pem());
        }
        pem_output
    }
}

fn extract_failure() -> ConvertError {
    ConvertError::crypto(EXTRACT_FAILURE)
}

/// Decrypt a bundle and recover its certificate, key and CA chain.
///
/// The leaf is the certificate bag whose local key ID matches the key bag.
/// Every other certificate bag becomes the chain, in stored order.
///
/// Every failure, whether a wrong passphrase, a MAC mismatch or a damaged
/// structure, produces the same message.
pub fn open(bundle: &Bundle, passphrase: &Passphrase) -> Result<OpenedBundle> {
    let keystore = KeyStore::from_pkcs12(bundle.as_der(), passphrase.expose()).map_err(|e| {
        tracing::debug!("PKCS#12 extraction failed: {}", e);
        extract_failure()
    })?;

    let mut key_entry = None;

    for (alias, entry) in keystore.entries() {
        if let KeyStoreEntry::PrivateKeyChain(chain) = entry {
            if key_entry.is_some() {
                tracing::debug!("PKCS#12 bundle holds more than one private key");
                return Err(extract_failure());
            }
            key_entry = Some((alias.to_string(), chain));
        }
    }

    let (alias, key_chain) = key_entry.ok_or_else(|| {
        tracing::debug!("PKCS#12 bundle holds no private key");
        extract_failure()
    })?;

    let private_key = key_match::parse_pkcs8_der(key_chain.key()).map_err(|e| {
        tracing::debug!("PKCS#12 key bag rejected: {}", e);
        extract_failure()
    })?;

    // The keystore keeps only the issuer path; every CA bag is read back in
    // stored order instead
    let mut cert_bags =
        bags::certificate_bags(bundle.as_der(), passphrase.expose()).map_err(|e| {
            tracing::debug!("PKCS#12 certificate bags unreadable: {}", e);
            extract_failure()
        })?;

    let leaf_position = cert_bags
        .iter()
        .position(|bag| bag.local_key_id.as_deref() == Some(key_chain.local_key_id()))
        .or_else(|| {
            let leaf = key_chain.chain().first()?;
            cert_bags.iter().position(|bag| bag.der == leaf.as_der())
        })
        .ok_or_else(|| {
            tracing::debug!("PKCS#12 bundle holds no certificate for its key");
            extract_failure()
        })?;

    let certificate = ParsedCertificate::from_der(cert_bags.remove(leaf_position).der)
        .map_err(|_| extract_failure())?;
    let chain = cert_bags
        .into_iter()
        .map(|bag| ParsedCertificate::from_der(bag.der))
        .collect::<std::result::Result<CertificateChain, _>>()
        .map_err(|_| extract_failure())?;

    Ok(OpenedBundle {
        friendly_name: Some(alias).filter(|name| !name.is_empty()),
        certificate,
        private_key,
        chain,
    })
}
