//! Command implementations for p12-convert

pub mod analyze;
pub mod artifacts;
pub mod create;
pub mod submit;

pub use analyze::run_analyze;
pub use artifacts::{run_fetch, run_sweep};
pub use create::run_create;
pub use submit::run_submit;

use crate::cli::Cli;
use crate::config::{self, LimitSettings, Settings};
use crate::models::{MaterialKind, UploadedMaterial};
use anyhow::Context;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Load settings and apply the command-line overrides
pub fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = config::load_config(cli.config.as_deref())?;

    if let Some(dir) = &cli.export_dir {
        settings.export.export_dir = dir.clone();
    }
    if let Some(url) = &cli.base_url {
        settings.export.base_url = url.clone();
    }

    settings.validate()?;
    Ok(settings)
}

/// Read an upload from disk.
///
/// At most one byte past the ceiling for `kind` is read, so an oversize
/// file is still rejected by the validator without being loaded whole.
/// The declared length comes from the file metadata.
pub fn read_upload(
    path: &Path,
    kind: MaterialKind,
    limits: &LimitSettings,
) -> anyhow::Result<UploadedMaterial> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let declared_len = file
        .metadata()
        .with_context(|| format!("Failed to read metadata of {}", path.display()))?
        .len();

    let mut data = Vec::new();
    file.take(limits.ceiling(kind) as u64 + 1)
        .read_to_end(&mut data)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(UploadedMaterial::with_declared_len(
        kind,
        filename,
        declared_len,
        data,
    ))
}

/// Resolve the bundle password.
///
/// An explicit password wins. Otherwise prompt if we have a terminal; with
/// no terminal the password stays missing and the converter reports it.
pub fn resolve_password(
    password: Option<String>,
    prompt: &str,
    confirm: bool,
) -> anyhow::Result<Option<String>> {
    if password.is_some() {
        return Ok(password);
    }

    if !console::Term::stderr().is_term() {
        return Ok(None);
    }

    let mut input = dialoguer::Password::new().with_prompt(prompt);
    if confirm {
        input = input.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(Some(input.interact()?))
}
