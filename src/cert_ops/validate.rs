//! Upload presence and size checks
//!
//! Runs before any decoding: a buffer that fails here is never handed to
//! a parser.

use crate::config::LimitSettings;
use crate::models::{MaterialKind, Passphrase, UploadedMaterial};
use crate::utils::{ConvertError, Field, Result};

/// Check that a required upload is present, non-empty and within the
/// ceiling for its kind, returning the validated bytes.
///
/// `slot` names the field being filled and is reported when nothing was
/// uploaded. A present upload is checked against its own kind, and an
/// upload labelled for a different field is rejected.
pub fn validate_material<'a>(
    slot: MaterialKind,
    material: Option<&'a UploadedMaterial>,
    limits: &LimitSettings,
) -> Result<&'a [u8]> {
    let material = material.ok_or(ConvertError::InputMissing {
        field: slot.field(),
    })?;

    let kind = material.kind();
    if kind != slot {
        return Err(ConvertError::parse(
            slot.field(),
            format!("received an upload for {}", kind.field()),
        ));
    }
    let field = kind.field();

    if material.declared_len() == 0 || material.data().is_empty() {
        return Err(ConvertError::InputMissing { field });
    }

    let limit = limits.ceiling(kind);
    // Either length may be the larger one if the transport lied
    let actual = material
        .declared_len()
        .max(material.data().len() as u64);
    if actual > limit as u64 {
        return Err(ConvertError::SizeExceeded {
            field,
            limit,
            actual: usize::try_from(actual).unwrap_or(usize::MAX),
        });
    }

    Ok(material.data())
}

/// Check that the passphrase is present and within its ceiling
pub fn validate_passphrase(value: Option<&str>, limits: &LimitSettings) -> Result<Passphrase> {
    let field = Field::P12Pass;
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return Err(ConvertError::InputMissing { field }),
    };

    if value.len() > limits.passphrase_max_bytes {
        return Err(ConvertError::SizeExceeded {
            field,
            limit: limits.passphrase_max_bytes,
            actual: value.len(),
        });
    }

    Ok(Passphrase::new(value))
}
