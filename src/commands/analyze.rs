//! Analyze command implementation

use crate::cli::AnalyzeArgs;
use crate::commands::{read_upload, resolve_password};
use crate::config::Settings;
use crate::models::MaterialKind;
use crate::output;
use crate::runner::{AnalyzeRequest, Converter};
use anyhow::Context;
use std::path::Path;

/// Open a PKCS#12 file and print what it holds
pub fn run_analyze(args: AnalyzeArgs, settings: &Settings, json: bool) -> anyhow::Result<()> {
    let bundle = read_upload(&args.file, MaterialKind::Bundle, &settings.limits)?;

    let prompt = format!("Password for {}", bundle.filename());
    let passphrase = resolve_password(args.password, &prompt, false)?;

    let request = AnalyzeRequest {
        bundle: Some(bundle),
        passphrase,
    };

    let (result, opened) = Converter::new(settings).analyze_with_contents(&request)?;

    if let Some(path) = &args.export_pem {
        write_secret_file(path, opened.to_pem().as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Wrote PEM contents to {}", path.display());
    }

    if json {
        output::print_json(&result)?;
    } else {
        output::print_analyze_result(&result);
        if let Some(path) = &args.export_pem {
            println!(
                "\n  {} Key, certificate and CA chain written to {}",
                console::style("✓").green(),
                path.display()
            );
        }
    }

    Ok(())
}

/// Write a file readable by the owner only, since it holds a private key
#[cfg(unix)]
fn write_secret_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_secret_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}
