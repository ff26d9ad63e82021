//! TTL and naming behaviour of the artifact store

use chrono::{DateTime, Duration, TimeZone, Utc};
use p12_convert::cert_ops::{Bundle, MaterialDecoder, PemDecoder};
use p12_convert::config::ExportSettings;
use p12_convert::export::{ArtifactStore, Clock};
use p12_convert::utils::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Clock that only moves when told to
struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn at(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(start)))
    }

    fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn sample_bundle() -> Bundle {
    let data = std::fs::read(fixtures_dir().join("openssl-bundle.p12")).unwrap();
    PemDecoder.bundle(&data).unwrap()
}

fn settings(dir: &TempDir) -> ExportSettings {
    ExportSettings {
        export_dir: dir.path().to_path_buf(),
        base_url: "http://certs.example.org".to_string(),
        export_path: "/export".to_string(),
        ttl_secs: 3600,
    }
}

/// A whole-second instant close to the real time, so file mtimes line up
fn start_time() -> DateTime<Utc> {
    Utc.timestamp_opt(Utc::now().timestamp(), 0).unwrap()
}

#[test]
fn test_store_writes_bundle_and_url() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(&settings(&dir));
    let bundle = sample_bundle();

    let artifact = store.store(&bundle).unwrap();

    assert_eq!(artifact.path, dir.path().join("tmp").join(&artifact.name));
    assert_eq!(std::fs::read(&artifact.path).unwrap(), bundle.as_der());
    assert_eq!(artifact.size, bundle.len() as u64);
    assert_eq!(
        artifact.url,
        format!("http://certs.example.org/export/tmp/{}", artifact.name)
    );
    assert_eq!(artifact.expires_at - artifact.created_at, Duration::seconds(3600));
    assert!(artifact.name.ends_with(".p12"));
    assert!(artifact
        .name
        .starts_with(&artifact.created_at.timestamp().to_string()));
}

#[test]
fn test_resolvable_until_ttl_then_not_found() {
    let dir = TempDir::new().unwrap();
    let start = start_time();
    let clock = ManualClock::at(start);
    let store = ArtifactStore::with_clock(&settings(&dir), clock.clone());

    let artifact = store.store(&sample_bundle()).unwrap();

    clock.set(start + Duration::seconds(3599));
    assert_eq!(store.resolve(&artifact.name).unwrap().name, artifact.name);

    // Age equal to the TTL is still live
    clock.set(start + Duration::seconds(3600));
    assert!(store.resolve(&artifact.name).is_ok());

    clock.set(start + Duration::seconds(3601));
    let err = store.resolve(&artifact.name).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // Expired files are deleted when seen
    assert!(!artifact.path.exists());
    assert_eq!(
        store.fetch(&artifact.name).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_sub_second_store_time_does_not_shorten_ttl() {
    let dir = TempDir::new().unwrap();
    let start = start_time() + Duration::milliseconds(900);
    let clock = ManualClock::at(start);
    let store = ArtifactStore::with_clock(&settings(&dir), clock.clone());

    let artifact = store.store(&sample_bundle()).unwrap();
    assert_eq!(artifact.created_at.timestamp_subsec_nanos(), 0);
    assert_eq!(artifact.created_at.timestamp(), start.timestamp());

    // 3599.5s after the store call
    clock.set(start + Duration::seconds(3599) + Duration::milliseconds(500));
    let resolved = store.resolve(&artifact.name).unwrap();
    assert_eq!(resolved.created_at, artifact.created_at);
    assert_eq!(resolved.expires_at, artifact.expires_at);
    assert!(artifact.path.exists());

    clock.set(artifact.created_at + Duration::seconds(3601));
    assert_eq!(
        store.resolve(&artifact.name).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_same_tick_names_are_distinct() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(start_time());
    let store = ArtifactStore::with_clock(&settings(&dir), clock);
    let bundle = sample_bundle();

    let first = store.store(&bundle).unwrap();
    let second = store.store(&bundle).unwrap();

    assert_eq!(first.created_at, second.created_at);
    assert_ne!(first.name, second.name);
    assert!(store.resolve(&first.name).is_ok());
    assert!(store.resolve(&second.name).is_ok());
}

#[test]
fn test_fetch_returns_bytes() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(&settings(&dir));
    let bundle = sample_bundle();

    let artifact = store.store(&bundle).unwrap();
    let (fetched, bytes) = store.fetch(&artifact.name).unwrap();

    assert_eq!(fetched.name, artifact.name);
    assert_eq!(bytes, bundle.as_der());
}

#[test]
fn test_vanished_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(&settings(&dir));

    let artifact = store.store(&sample_bundle()).unwrap();
    std::fs::remove_file(&artifact.path).unwrap();

    assert_eq!(
        store.resolve(&artifact.name).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        store.fetch(&artifact.name).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_foreign_names_are_not_found() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(&settings(&dir));
    std::fs::create_dir_all(dir.path().join("tmp")).unwrap();
    std::fs::write(dir.path().join("tmp").join("notes.p12"), b"x").unwrap();

    for name in ["notes.p12", "../tmp/notes.p12", "/etc/passwd", ""] {
        assert_eq!(
            store.resolve(name).unwrap_err().kind(),
            ErrorKind::NotFound,
            "{:?}",
            name
        );
    }
}

#[test]
fn test_sweep_removes_expired_and_stale_temp_files() {
    let dir = TempDir::new().unwrap();
    let start = start_time();
    let clock = ManualClock::at(start);
    let store = ArtifactStore::with_clock(&settings(&dir), clock.clone());
    let bundle = sample_bundle();

    let old = store.store(&bundle).unwrap();
    clock.set(start + Duration::seconds(3000));
    let fresh = store.store(&bundle).unwrap();

    let stale_temp = store.dir().join(".tmpAbC123");
    let unrelated = store.dir().join("README.txt");
    std::fs::write(&stale_temp, b"partial").unwrap();
    std::fs::write(&unrelated, b"keep me").unwrap();

    clock.set(start + Duration::seconds(3700));
    let report = store.sweep().unwrap();

    assert_eq!(report.removed, 2);
    assert_eq!(report.retained, 1);
    assert!(!old.path.exists());
    assert!(fresh.path.exists());
    assert!(!stale_temp.exists());
    assert!(unrelated.exists());

    // A second pass has nothing left to do
    let report = store.sweep().unwrap();
    assert_eq!(report.removed, 0);
    assert_eq!(report.retained, 1);
}

#[test]
fn test_sweep_without_directory() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(&settings(&dir));
    let report = store.sweep().unwrap();
    assert_eq!(report.removed, 0);
    assert_eq!(report.retained, 0);
}
