//! Staging of assembled bundles for download
//!
//! Bundles are written to `<export_dir>/tmp/` under a name that starts with
//! the creation time in Unix seconds. The name is the only record of an
//! artifact: its age is read back from it, and once that age exceeds the
//! TTL the artifact is no longer served and is deleted on sight.

use crate::cert_ops::Bundle;
use crate::config::ExportSettings;
use crate::models::Artifact;
use crate::utils::{ConvertError, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Subdirectory of the export root holding staged artifacts
pub const ARTIFACT_SUBDIR: &str = "tmp";

const ARTIFACT_EXTENSION: &str = ".p12";

/// Prefix of in-flight temporary files, as created by `tempfile`
const TEMP_PREFIX: &str = ".tmp";

/// Hex digits in the disambiguator: 8 random, 4 counter
const DISAMBIGUATOR_LEN: usize = 12;

const MAX_NAME_ATTEMPTS: usize = 8;

static NAME_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Source of the current time
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Outcome of a sweep over the artifact directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Expired artifacts and stale temporary files deleted
    pub removed: usize,
    /// Artifacts still within their TTL
    pub retained: usize,
}

/// Artifact directory with TTL enforcement
#[derive(Debug, Clone)]
pub struct ArtifactStore<C = SystemClock> {
    dir: PathBuf,
    url_prefix: String,
    ttl: Duration,
    clock: C,
}

impl ArtifactStore<SystemClock> {
    pub fn new(settings: &ExportSettings) -> Self {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> ArtifactStore<C> {
    pub fn with_clock(settings: &ExportSettings, clock: C) -> Self {
        let ttl = i64::try_from(settings.ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);

        Self {
            dir: settings.export_dir.join(ARTIFACT_SUBDIR),
            url_prefix: url_prefix(&settings.base_url, &settings.export_path),
            ttl,
            clock,
        }
    }

    /// Directory artifacts are written to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Public download URL for an artifact name
    pub fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.url_prefix, name)
    }

    /// Write a bundle under a fresh name and return its artifact record
    pub fn store(&self, bundle: &Bundle) -> Result<Artifact> {
        fs::create_dir_all(&self.dir).map_err(|e| ConvertError::io(&self.dir, e))?;

        // Stage in the same directory so the final link stays on one filesystem
        let mut staged =
            NamedTempFile::new_in(&self.dir).map_err(|e| ConvertError::io(&self.dir, e))?;
        staged
            .write_all(bundle.as_der())
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|e| ConvertError::io(staged.path(), e))?;

        // Names carry whole seconds, so the record must too
        let created_at = whole_seconds(self.clock.now());

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = generate_name(created_at);
            let path = self.dir.join(&name);

            match staged.persist_noclobber(&path) {
                Ok(_) => {
                    tracing::info!("Stored artifact {} ({} bytes)", name, bundle.len());
                    return Ok(self.artifact(name, path, created_at, bundle.len() as u64));
                }
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::debug!("Artifact name {} already taken, retrying", name);
                    staged = e.file;
                }
                Err(e) => return Err(ConvertError::io(&path, e.error)),
            }
        }

        Err(ConvertError::io(
            &self.dir,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                "could not claim a unique artifact name",
            ),
        ))
    }

    /// Look up a live artifact by name.
    ///
    /// Unknown, malformed, vanished and expired names are all `NotFound`.
    /// An expired artifact is deleted as a side effect.
    pub fn resolve(&self, name: &str) -> Result<Artifact> {
        let not_found = || ConvertError::NotFound {
            name: name.to_string(),
        };

        let created_at = parse_name(name).ok_or_else(not_found)?;
        let path = self.dir.join(name);

        if self.is_expired(created_at) {
            match remove_if_present(&path) {
                Ok(true) => tracing::info!("Removed expired artifact {}", name),
                Ok(false) => {}
                Err(e) => tracing::warn!("Failed to remove expired artifact {}: {}", name, e),
            }
            return Err(not_found());
        }

        let metadata = match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(not_found()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(ConvertError::io(&path, e)),
        };

        Ok(self.artifact(name.to_string(), path, created_at, metadata.len()))
    }

    /// Resolve an artifact and read its bytes
    pub fn fetch(&self, name: &str) -> Result<(Artifact, Vec<u8>)> {
        let mut artifact = self.resolve(name)?;

        let bytes = fs::read(&artifact.path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ConvertError::NotFound {
                    name: name.to_string(),
                }
            } else {
                ConvertError::io(&artifact.path, e)
            }
        })?;

        artifact.size = bytes.len() as u64;
        Ok((artifact, bytes))
    }

    /// Delete every expired artifact and every temporary file older than
    /// the TTL. Files that do not look like ours are left alone.
    pub fn sweep(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(ConvertError::io(&self.dir, e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| ConvertError::io(&self.dir, e))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let path = entry.path();

            let expired = if let Some(created_at) = parse_name(name) {
                let expired = self.is_expired(created_at);
                if !expired {
                    report.retained += 1;
                }
                expired
            } else if name.starts_with(TEMP_PREFIX) {
                // Leftovers of interrupted writes carry no timestamp in the name
                match entry.metadata().and_then(|m| m.modified()) {
                    Ok(modified) => self.is_expired(DateTime::<Utc>::from(modified)),
                    Err(_) => false,
                }
            } else {
                false
            };

            if expired && remove_if_present(&path).map_err(|e| ConvertError::io(&path, e))? {
                tracing::debug!("Swept {}", name);
                report.removed += 1;
            }
        }

        if report.removed > 0 {
            tracing::info!(
                "Sweep removed {} file(s), {} artifact(s) retained",
                report.removed,
                report.retained
            );
        }

        Ok(report)
    }

    /// Age is counted in whole seconds on both sides
    fn is_expired(&self, created_at: DateTime<Utc>) -> bool {
        let age = self
            .clock
            .now()
            .timestamp()
            .saturating_sub(created_at.timestamp());
        age > self.ttl.num_seconds()
    }

    fn artifact(
        &self,
        name: String,
        path: PathBuf,
        created_at: DateTime<Utc>,
        size: u64,
    ) -> Artifact {
        let expires_at = created_at
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Artifact {
            url: self.url_for(&name),
            name,
            path,
            created_at,
            expires_at,
            size,
        }
    }
}

/// `<base_url><export_path>/tmp`, with the slashes between parts normalised
fn url_prefix(base_url: &str, export_path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = export_path.trim_matches('/');
    if path.is_empty() {
        format!("{}/{}", base, ARTIFACT_SUBDIR)
    } else {
        format!("{}/{}/{}", base, path, ARTIFACT_SUBDIR)
    }
}

fn whole_seconds(instant: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(instant.timestamp(), 0)
        .single()
        .unwrap_or(instant)
}

/// `<unix-seconds>-<8 hex random><4 hex counter>.p12`
fn generate_name(created_at: DateTime<Utc>) -> String {
    let random: u32 = rand::Rng::random(&mut rand::rng());
    let counter = NAME_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xffff;
    format!(
        "{}-{:08x}{:04x}{}",
        created_at.timestamp(),
        random,
        counter,
        ARTIFACT_EXTENSION
    )
}

/// Creation time encoded in an artifact name, or `None` if the name was
/// not produced by [`generate_name`]
fn parse_name(name: &str) -> Option<DateTime<Utc>> {
    let stem = name.strip_suffix(ARTIFACT_EXTENSION)?;
    let (secs, disambiguator) = stem.split_once('-')?;

    if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if disambiguator.len() != DISAMBIGUATOR_LEN
        || !disambiguator
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return None;
    }

    let secs: i64 = secs.parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

/// Delete a file, treating an already missing file as done
fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_names_parse_back() {
        let created = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let name = generate_name(created);
        assert!(name.starts_with("1700000000-"));
        assert!(name.ends_with(".p12"));
        assert_eq!(parse_name(&name), Some(created));
    }

    #[test]
    fn test_generated_names_differ_within_a_second() {
        let created = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_ne!(generate_name(created), generate_name(created));
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        for name in [
            "",
            "1700000000.p12",
            "1700000000-0123456789ab.pem",
            "1700000000-0123456789AB.p12",
            "1700000000-0123.p12",
            "abc-0123456789ab.p12",
            "-0123456789ab.p12",
            "../1700000000-0123456789ab.p12",
            "1700000000-0123456789ab.p12/..",
            ".tmpAbCdEf",
        ] {
            assert_eq!(parse_name(name), None, "{:?} should not parse", name);
        }
    }

    #[test]
    fn test_url_prefix_normalises_slashes() {
        assert_eq!(
            url_prefix("http://localhost", "/export"),
            "http://localhost/export/tmp"
        );
        assert_eq!(
            url_prefix("https://certs.example.org/", "export/"),
            "https://certs.example.org/export/tmp"
        );
        assert_eq!(url_prefix("http://localhost", ""), "http://localhost/tmp");
    }

    #[test]
    fn test_remove_if_present_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gone.p12");
        fs::write(&path, b"x").unwrap();
        assert!(remove_if_present(&path).unwrap());
        assert!(!remove_if_present(&path).unwrap());
    }
}
