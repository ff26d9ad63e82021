//! Conversion orchestration engine
//!
//! Drives a single `create` or `analyze` request through validation,
//! decoding, bundle assembly or extraction, and artifact staging. Any
//! frontend (CLI, web handler, tests) builds a [`Command`] and hands it to
//! a [`Converter`].

use crate::cert_ops::{self, BundleOptions, MaterialDecoder, OpenedBundle, PemDecoder};
use crate::config::Settings;
use crate::export::{ArtifactStore, Clock, SystemClock};
use crate::models::{AnalyzeResult, CreateResult, MaterialKind, Outcome, UploadedMaterial};
use crate::utils::{ConvertError, Field, Result};
use std::fmt;
use std::str::FromStr;

/// Inputs of the `create` command
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    /// PEM certificate (certfile)
    pub certificate: Option<UploadedMaterial>,
    /// PEM private key (keyfile)
    pub private_key: Option<UploadedMaterial>,
    /// PEM CA certificates (calist), optional
    pub ca_list: Option<UploadedMaterial>,
    pub passphrase: Option<String>,
    /// Friendly name for the key entry; the certificate file name otherwise
    pub friendly_name: Option<String>,
}

/// Inputs of the `analyze` command
#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    /// PKCS#12 bundle (p12file)
    pub bundle: Option<UploadedMaterial>,
    pub passphrase: Option<String>,
}

/// A request with its command selector resolved
#[derive(Debug, Clone)]
pub enum Command {
    Create(CreateRequest),
    Analyze(AnalyzeRequest),
}

/// Fields of a form-style request, named as submitted
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    pub certfile: Option<UploadedMaterial>,
    pub keyfile: Option<UploadedMaterial>,
    pub calist: Option<UploadedMaterial>,
    pub p12file: Option<UploadedMaterial>,
    pub p12pass: Option<String>,
}

impl Command {
    /// Resolve the `cmd` selector and keep the fields that command reads.
    ///
    /// A missing or blank selector is `InputMissing`; an unknown one is
    /// `InvalidCommand`. Fields the selected command does not read are
    /// dropped.
    pub fn from_form(cmd: Option<&str>, form: FormFields) -> Result<Self> {
        let kind: CommandKind = cmd.unwrap_or_default().parse()?;

        Ok(match kind {
            CommandKind::Create => Command::Create(CreateRequest {
                certificate: form.certfile,
                private_key: form.keyfile,
                ca_list: form.calist,
                passphrase: form.p12pass,
                friendly_name: None,
            }),
            CommandKind::Analyze => Command::Analyze(AnalyzeRequest {
                bundle: form.p12file,
                passphrase: form.p12pass,
            }),
        })
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Create(_) => CommandKind::Create,
            Command::Analyze(_) => CommandKind::Analyze,
        }
    }
}

/// Command selector as submitted in the `cmd` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Create,
    Analyze,
}

impl FromStr for CommandKind {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Err(ConvertError::InputMissing { field: Field::Cmd }),
            "create" => Ok(CommandKind::Create),
            "analyze" => Ok(CommandKind::Analyze),
            other => Err(ConvertError::InvalidCommand {
                field: Field::Cmd,
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Create => write!(f, "create"),
            CommandKind::Analyze => write!(f, "analyze"),
        }
    }
}

/// Runs conversion requests against one configuration
pub struct Converter<D = PemDecoder, C = SystemClock> {
    settings: Settings,
    decoder: D,
    store: ArtifactStore<C>,
}

impl Converter<PemDecoder, SystemClock> {
    pub fn new(settings: &Settings) -> Self {
        Self::with_parts(settings, PemDecoder, SystemClock)
    }
}

impl<D: MaterialDecoder, C: Clock> Converter<D, C> {
    /// Build a converter with a specific decoder and clock
    pub fn with_parts(settings: &Settings, decoder: D, clock: C) -> Self {
        Self {
            store: ArtifactStore::with_clock(&settings.export, clock),
            settings: settings.clone(),
            decoder,
        }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Run one command to completion
    pub fn run(&self, command: &Command) -> Result<Outcome> {
        tracing::debug!("Running {} command", command.kind());
        match command {
            Command::Create(request) => self.create(request).map(Outcome::Create),
            Command::Analyze(request) => self.analyze(request).map(Outcome::Analyze),
        }
    }

    /// Assemble a bundle from PEM material and stage it for download
    pub fn create(&self, request: &CreateRequest) -> Result<CreateResult> {
        let limits = &self.settings.limits;

        // Every field is checked before anything is decoded
        let cert_data = cert_ops::validate_material(
            MaterialKind::Certificate,
            request.certificate.as_ref(),
            limits,
        )?;
        let key_data = cert_ops::validate_material(
            MaterialKind::PrivateKey,
            request.private_key.as_ref(),
            limits,
        )?;
        let ca_data = request
            .ca_list
            .as_ref()
            .map(|ca| cert_ops::validate_material(MaterialKind::CaList, Some(ca), limits))
            .transpose()?;
        let passphrase = cert_ops::validate_passphrase(request.passphrase.as_deref(), limits)?;

        let certificate = self.decoder.certificate(cert_data)?;
        let private_key = self.decoder.private_key(key_data)?;
        let chain = match ca_data {
            Some(data) => self.decoder.ca_chain(data)?,
            None => Vec::new(),
        };

        let friendly_name = request
            .friendly_name
            .clone()
            .or_else(|| request.certificate.as_ref().map(|c| c.filename().to_string()))
            .filter(|name| !name.is_empty());

        let mut options = BundleOptions::from_settings(&self.settings.bundle);
        options.friendly_name = friendly_name.clone();

        let bundle = cert_ops::assemble(&certificate, &private_key, &chain, &passphrase, &options)?;
        let summary = cert_ops::summarize(
            friendly_name,
            &certificate,
            &private_key,
            &chain,
            Field::CertFile,
        )?;

        // Expired artifacts go before a new one is added
        if let Err(e) = self.store.sweep() {
            tracing::warn!("Expiry sweep failed: {}", e);
        }

        let artifact = self.store.store(&bundle)?;
        tracing::info!(
            "Created PKCS#12 for {} with {} CA certificate(s)",
            summary.certificate.subject_cn(),
            summary.chain.len()
        );

        Ok(CreateResult {
            artifact_url: artifact.url.clone(),
            artifact,
            summary,
        })
    }

    /// Open an uploaded bundle and describe its contents
    pub fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResult> {
        self.analyze_with_contents(request).map(|(result, _)| result)
    }

    /// Like [`Converter::analyze`], also returning the recovered material
    pub fn analyze_with_contents(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<(AnalyzeResult, OpenedBundle)> {
        let limits = &self.settings.limits;

        let data = cert_ops::validate_material(
            MaterialKind::Bundle,
            request.bundle.as_ref(),
            limits,
        )?;
        let passphrase = cert_ops::validate_passphrase(request.passphrase.as_deref(), limits)?;

        let bundle = self.decoder.bundle(data)?;
        let opened = cert_ops::open(&bundle, &passphrase)?;
        let summary = cert_ops::summarize(
            opened.friendly_name.clone(),
            &opened.certificate,
            &opened.private_key,
            &opened.chain,
            Field::P12File,
        )?;

        let (source_name, source_size) = request
            .bundle
            .as_ref()
            .map(|b| (b.filename().to_string(), b.data().len() as u64))
            .unwrap_or_default();

        tracing::info!(
            "Analyzed {}: {} with {} CA certificate(s)",
            source_name,
            summary.certificate.subject_cn(),
            summary.chain.len()
        );

        Ok((
            AnalyzeResult {
                source_name,
                source_size,
                summary,
            },
            opened,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ErrorKind;

    #[test]
    fn test_command_kind_from_str() {
        assert_eq!("create".parse::<CommandKind>().unwrap(), CommandKind::Create);
        assert_eq!(" analyze ".parse::<CommandKind>().unwrap(), CommandKind::Analyze);

        let err = "convert".parse::<CommandKind>().unwrap_err();
        assert!(matches!(err, ConvertError::InvalidCommand { .. }));
        assert_eq!(err.kind(), ErrorKind::InputMissing);
        assert_eq!(err.field(), Some(Field::Cmd));

        let err = "".parse::<CommandKind>().unwrap_err();
        assert!(matches!(err, ConvertError::InputMissing { field: Field::Cmd }));
    }

    #[test]
    fn test_from_form_selects_fields() {
        let form = FormFields {
            certfile: Some(UploadedMaterial::new(
                MaterialKind::Certificate,
                "c.pem",
                b"cert".to_vec(),
            )),
            p12file: Some(UploadedMaterial::new(
                MaterialKind::Bundle,
                "b.p12",
                b"bundle".to_vec(),
            )),
            p12pass: Some("secret".to_string()),
            ..Default::default()
        };

        match Command::from_form(Some("create"), form.clone()).unwrap() {
            Command::Create(request) => {
                assert_eq!(request.certificate.unwrap().filename(), "c.pem");
                assert!(request.private_key.is_none());
                assert_eq!(request.passphrase.as_deref(), Some("secret"));
            }
            other => panic!("expected create, got {:?}", other),
        }

        let command = Command::from_form(Some("analyze"), form.clone()).unwrap();
        assert_eq!(command.kind(), CommandKind::Analyze);
        match command {
            Command::Analyze(request) => {
                assert_eq!(request.bundle.unwrap().filename(), "b.p12");
            }
            other => panic!("expected analyze, got {:?}", other),
        }

        let err = Command::from_form(None, form.clone()).unwrap_err();
        assert!(matches!(err, ConvertError::InputMissing { field: Field::Cmd }));
        let err = Command::from_form(Some("export"), form).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidCommand { .. }));
    }

    #[test]
    fn test_missing_passphrase_is_reported_before_decoding() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.export.export_dir = dir.path().to_path_buf();

        let request = CreateRequest {
            certificate: Some(UploadedMaterial::new(
                MaterialKind::Certificate,
                "c.pem",
                b"not pem".to_vec(),
            )),
            private_key: Some(UploadedMaterial::new(
                MaterialKind::PrivateKey,
                "k.pem",
                b"not pem".to_vec(),
            )),
            ..Default::default()
        };

        let err = Converter::new(&settings).create(&request).unwrap_err();
        assert!(matches!(err, ConvertError::InputMissing { field: Field::P12Pass }));
        assert!(!dir.path().join("tmp").exists());
    }
}
