//! Application settings configuration
//!
//! Defines upload size ceilings, the export directory layout and the
//! default PKCS#12 parameters.

use crate::models::MaterialKind;
use crate::utils::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Upload size ceilings, in bytes
#[derive(Debug, Clone, Deserialize)]
pub struct LimitSettings {
    #[serde(default = "default_cert_max_bytes")]
    pub cert_max_bytes: usize,
    #[serde(default = "default_key_max_bytes")]
    pub key_max_bytes: usize,
    /// Applies to CA lists and PKCS#12 uploads alike
    #[serde(default = "default_bundle_max_bytes")]
    pub bundle_max_bytes: usize,
    #[serde(default = "default_passphrase_max_bytes")]
    pub passphrase_max_bytes: usize,
}

fn default_cert_max_bytes() -> usize {
    32 * 1024
}

fn default_key_max_bytes() -> usize {
    32 * 1024
}

fn default_bundle_max_bytes() -> usize {
    64 * 1024
}

fn default_passphrase_max_bytes() -> usize {
    40
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            cert_max_bytes: default_cert_max_bytes(),
            key_max_bytes: default_key_max_bytes(),
            bundle_max_bytes: default_bundle_max_bytes(),
            passphrase_max_bytes: default_passphrase_max_bytes(),
        }
    }
}

impl LimitSettings {
    /// Size ceiling for an uploaded buffer of the given kind
    pub fn ceiling(&self, kind: MaterialKind) -> usize {
        match kind {
            MaterialKind::Certificate => self.cert_max_bytes,
            MaterialKind::PrivateKey => self.key_max_bytes,
            MaterialKind::CaList | MaterialKind::Bundle => self.bundle_max_bytes,
        }
    }
}

/// Where assembled bundles are staged and how they are published
#[derive(Debug, Clone, Deserialize)]
pub struct ExportSettings {
    /// Export root; artifacts live in its `tmp` subdirectory
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    /// Scheme and host of the public download URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// URL path the export root is served under
    #[serde(default = "default_export_path")]
    pub export_path: String,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("export")
}

fn default_base_url() -> String {
    "http://localhost".to_string()
}

fn default_export_path() -> String {
    "/export".to_string()
}

fn default_ttl_secs() -> u64 {
    3600
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
            base_url: default_base_url(),
            export_path: default_export_path(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// Cipher protecting the key and certificate bags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleCipher {
    /// PBES2 with HMAC-SHA256 and AES-256-CBC
    Aes256,
    /// PKCS#12 PBE with SHA-1 and 3-key triple DES, readable by old importers
    #[serde(rename = "3des")]
    TripleDes,
}

/// MAC protecting the whole envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleMac {
    Sha256,
    Sha1,
}

/// Default PKCS#12 construction parameters
#[derive(Debug, Clone, Deserialize)]
pub struct BundleSettings {
    #[serde(default = "default_encryption")]
    pub encryption: BundleCipher,
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,
    #[serde(default = "default_mac")]
    pub mac: BundleMac,
    #[serde(default = "default_mac_iterations")]
    pub mac_iterations: u32,
}

fn default_encryption() -> BundleCipher {
    BundleCipher::TripleDes
}

fn default_kdf_iterations() -> u32 {
    2048
}

fn default_mac() -> BundleMac {
    BundleMac::Sha256
}

fn default_mac_iterations() -> u32 {
    1
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            encryption: default_encryption(),
            kdf_iterations: default_kdf_iterations(),
            mac: default_mac(),
            mac_iterations: default_mac_iterations(),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub limits: LimitSettings,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub bundle: BundleSettings,
}

impl Settings {
    /// Load settings from the default config file
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_path = Path::new("config/default.toml");
        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would make every request fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ceilings = [
            ("limits.cert_max_bytes", self.limits.cert_max_bytes),
            ("limits.key_max_bytes", self.limits.key_max_bytes),
            ("limits.bundle_max_bytes", self.limits.bundle_max_bytes),
            ("limits.passphrase_max_bytes", self.limits.passphrase_max_bytes),
        ];
        for (key, value) in ceilings {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        if self.export.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "export.ttl_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if !(self.export.base_url.starts_with("http://")
            || self.export.base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidValue {
                key: "export.base_url".to_string(),
                message: format!("'{}' is not an http(s) URL", self.export.base_url),
            });
        }

        if self.bundle.kdf_iterations == 0 || self.bundle.mac_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                key: "bundle".to_string(),
                message: "iteration counts must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.limits.passphrase_max_bytes, 40);
        assert_eq!(settings.export.ttl_secs, 3600);
        assert_eq!(settings.bundle.kdf_iterations, 2048);
        assert_eq!(settings.bundle.mac_iterations, 1);
        assert_eq!(settings.bundle.encryption, BundleCipher::TripleDes);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let settings = Settings::from_toml(
            r#"
            [limits]
            cert_max_bytes = 4096

            [export]
            export_dir = "/srv/www/export"
            base_url = "https://certs.example.org"

            [bundle]
            encryption = "aes256"
            mac = "sha1"
            "#,
        )
        .unwrap();

        assert_eq!(settings.limits.cert_max_bytes, 4096);
        assert_eq!(settings.limits.key_max_bytes, 32 * 1024);
        assert_eq!(settings.export.export_dir, PathBuf::from("/srv/www/export"));
        assert_eq!(settings.export.export_path, "/export");
        assert_eq!(settings.bundle.encryption, BundleCipher::Aes256);
        assert_eq!(settings.bundle.mac, BundleMac::Sha1);
    }

    #[test]
    fn test_ceiling_per_kind() {
        let limits = LimitSettings::default();
        assert_eq!(limits.ceiling(MaterialKind::Certificate), 32 * 1024);
        assert_eq!(limits.ceiling(MaterialKind::CaList), 64 * 1024);
        assert_eq!(limits.ceiling(MaterialKind::Bundle), 64 * 1024);
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let err = Settings::from_toml("[export]\nttl_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let err = Settings::from_toml("[export]\nbase_url = \"ftp://host\"\n").unwrap_err();
        assert!(err.to_string().contains("export.base_url"));
    }
}
