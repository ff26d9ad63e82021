//! Ordered walk over the certificate bags of a PKCS#12 envelope
//!
//! `p12-keystore` rebuilds chains by issuer and drops certificates that are
//! not on the key's issuer path. This walker lists every certificate bag in
//! the order it appears in the envelope. It expects the MAC to have been
//! checked already and does not verify it again.

use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use cms::cert::x509::spki::AlgorithmIdentifierOwned;
use cms::content_info::{CmsVersion, ContentInfo};
use cms::encrypted_data::EncryptedData;
use pkcs12::cert_type::CertBag;
use pkcs12::kdf::{derive_key_utf8, Pkcs12KeyType};
use pkcs12::pfx::{Pfx, Version};
use pkcs12::safe_bag::{SafeBag, SafeContents};
use pkcs8::der::asn1::{ContextSpecific, ObjectIdentifier, OctetString, OctetStringRef};
use pkcs8::der::{Decode, Encode, Reader, SliceReader};
use pkcs8::pkcs5::pbes2;

const DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
const ENCRYPTED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.6");
const PBES2: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.13");
const PBE_SHA1_3DES: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.3");
const X509_CERTIFICATE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.22.1");
const LOCAL_KEY_ID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.21");

/// A certificate bag as stored in the envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBag {
    pub der: Vec<u8>,
    pub local_key_id: Option<Vec<u8>>,
}

/// List every X.509 certificate bag in envelope order.
///
/// Safes are visited in authenticated-safe order and bags in safe order.
/// Certificate types other than X.509 are skipped.
pub fn certificate_bags(
    pfx_der: &[u8],
    password: &str,
) -> std::result::Result<Vec<CertificateBag>, String> {
    let pfx = Pfx::from_der(pfx_der).map_err(|e| format!("Invalid PFX: {}", e))?;
    if pfx.version != Version::V3 {
        return Err("Unsupported PFX version".to_string());
    }
    if pfx.auth_safe.content_type != DATA {
        return Err(format!(
            "Unsupported authenticated safe type {}",
            pfx.auth_safe.content_type
        ));
    }

    let auth_safe = octet_string_content(&pfx.auth_safe)?;
    let safes = Vec::<ContentInfo>::from_der(&auth_safe)
        .map_err(|e| format!("Invalid authenticated safe: {}", e))?;

    let mut bags = Vec::new();
    for safe in &safes {
        let contents = match safe.content_type {
            DATA => octet_string_content(safe)?,
            ENCRYPTED_DATA => decrypt_safe(safe, password)?,
            other => return Err(format!("Unsupported safe content type {}", other)),
        };
        let contents = SafeContents::from_der(&contents)
            .map_err(|e| format!("Invalid safe contents: {}", e))?;

        for bag in contents
            .iter()
            .filter(|bag| bag.bag_id == pkcs12::PKCS_12_CERT_BAG_OID)
        {
            if let Some(cert) = certificate_bag(bag)? {
                bags.push(cert);
            }
        }
    }

    Ok(bags)
}

fn octet_string_content(info: &ContentInfo) -> std::result::Result<Vec<u8>, String> {
    let encoded = info.content.to_der().map_err(|e| e.to_string())?;
    OctetString::from_der(&encoded)
        .map(OctetString::into_bytes)
        .map_err(|e| format!("Invalid data content: {}", e))
}

fn decrypt_safe(info: &ContentInfo, password: &str) -> std::result::Result<Vec<u8>, String> {
    let encoded = info.content.to_der().map_err(|e| e.to_string())?;
    let encrypted = EncryptedData::from_der(&encoded)
        .map_err(|e| format!("Invalid encrypted data: {}", e))?;
    if encrypted.version != CmsVersion::V0 {
        return Err("Unsupported encrypted data version".to_string());
    }

    match encrypted.enc_content_info.encrypted_content.as_ref() {
        Some(content) => decrypt(
            &encrypted.enc_content_info.content_enc_alg,
            content.as_bytes(),
            password,
        ),
        None => Ok(Vec::new()),
    }
}

fn decrypt(
    alg: &AlgorithmIdentifierOwned,
    data: &[u8],
    password: &str,
) -> std::result::Result<Vec<u8>, String> {
    let params = alg
        .parameters
        .as_ref()
        .ok_or("Missing cipher parameters")?
        .to_der()
        .map_err(|e| e.to_string())?;

    match alg.oid {
        PBES2 => pbes2::Parameters::from_der(&params)
            .map_err(|e| format!("Invalid PBES2 parameters: {}", e))?
            .decrypt(password.as_bytes(), data)
            .map_err(|e| format!("PBES2 decryption failed: {}", e)),
        PBE_SHA1_3DES => decrypt_triple_des(&params, data, password),
        other => Err(format!("Unsupported cipher {}", other)),
    }
}

/// pbeWithSHAAnd3-KeyTripleDES-CBC with the PKCS#12 key derivation
fn decrypt_triple_des(
    params: &[u8],
    data: &[u8],
    password: &str,
) -> std::result::Result<Vec<u8>, String> {
    let (salt, iterations) = SliceReader::new(params)
        .and_then(|mut reader| {
            reader.sequence(|reader| {
                let salt = OctetStringRef::decode(reader)?.as_bytes().to_vec();
                let iterations: u64 = reader.decode()?;
                Ok((salt, iterations))
            })
        })
        .map_err(|e| format!("Invalid PBE parameters: {}", e))?;

    let rounds = i32::try_from(iterations).map_err(|_| "PBE iteration count out of range")?;
    let key = derive_key_utf8::<sha1::Sha1>(
        password,
        &salt,
        Pkcs12KeyType::EncryptionKey,
        rounds,
        24,
    )
    .map_err(|e| e.to_string())?;
    let iv = derive_key_utf8::<sha1::Sha1>(password, &salt, Pkcs12KeyType::Iv, rounds, 8)
        .map_err(|e| e.to_string())?;

    cbc::Decryptor::<des::TdesEde3>::new_from_slices(&key, &iv)
        .map_err(|e| e.to_string())?
        .decrypt_padded_vec_mut::<Pkcs7>(data)
        .map_err(|_| "3DES decryption failed".to_string())
}

fn certificate_bag(bag: &SafeBag) -> std::result::Result<Option<CertificateBag>, String> {
    let value = ContextSpecific::<CertBag>::from_der(&bag.bag_value)
        .map_err(|e| format!("Invalid certificate bag: {}", e))?
        .value;
    if value.cert_id != X509_CERTIFICATE {
        tracing::debug!("Skipping certificate bag of type {}", value.cert_id);
        return Ok(None);
    }

    Ok(Some(CertificateBag {
        der: value.cert_value.as_bytes().to_vec(),
        local_key_id: local_key_id(bag),
    }))
}

fn local_key_id(bag: &SafeBag) -> Option<Vec<u8>> {
    bag.bag_attributes
        .as_ref()?
        .iter()
        .find(|attr| attr.oid == LOCAL_KEY_ID)?
        .values
        .iter()
        .next()
        .and_then(|value| value.to_der().ok())
        .and_then(|der| OctetString::from_der(&der).ok())
        .map(OctetString::into_bytes)
}
