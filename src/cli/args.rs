//! CLI argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "p12-convert")]
#[command(version)]
#[command(
    about = "Bundle a certificate, key and CA chain into PKCS#12, or inspect an existing bundle",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Emit JSON instead of formatted text
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (default: config/default.toml when present)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Export root; artifacts are staged in its tmp/ subdirectory
    #[arg(long, value_name = "DIR", global = true)]
    pub export_dir: Option<PathBuf>,

    /// Scheme and host used in download URLs
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a PKCS#12 bundle from PEM files
    Create(CreateArgs),

    /// Show the contents of a PKCS#12 bundle
    Analyze(AnalyzeArgs),

    /// Copy a staged bundle out of the export directory
    Fetch(FetchArgs),

    /// Delete expired bundles from the export directory
    Sweep,

    /// Run a form-style request chosen by its cmd field
    Submit(SubmitArgs),
}

#[derive(Args)]
pub struct CreateArgs {
    /// PEM certificate
    #[arg(long = "cert", value_name = "FILE")]
    pub cert: PathBuf,

    /// PEM private key (PKCS#8, PKCS#1 or SEC1, unencrypted)
    #[arg(long = "key", value_name = "FILE")]
    pub key: PathBuf,

    /// PEM file with CA certificates to include
    #[arg(long = "ca", value_name = "FILE")]
    pub ca: Option<PathBuf>,

    /// Bundle password (prompted when omitted)
    #[arg(short, long)]
    pub password: Option<String>,

    /// Friendly name for the key entry (default: certificate file name)
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// PKCS#12 file (.p12 or .pfx)
    #[arg(required = true)]
    pub file: PathBuf,

    /// Bundle password (prompted when omitted)
    #[arg(short, long)]
    pub password: Option<String>,

    /// Also write the key, certificate and CA chain as PEM to this file
    #[arg(long, value_name = "FILE")]
    pub export_pem: Option<PathBuf>,
}

#[derive(Args)]
pub struct FetchArgs {
    /// Artifact name, as printed by `create`
    #[arg(required = true)]
    pub name: String,

    /// Destination file (default: the artifact name in the current directory)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Form fields, named as an upload form submits them
#[derive(Args)]
pub struct SubmitArgs {
    /// Command selector: create or analyze
    #[arg(long, value_name = "CMD")]
    pub cmd: Option<String>,

    /// PEM certificate (create)
    #[arg(long, value_name = "FILE")]
    pub certfile: Option<PathBuf>,

    /// PEM private key (create)
    #[arg(long, value_name = "FILE")]
    pub keyfile: Option<PathBuf>,

    /// PEM CA certificates (create)
    #[arg(long, value_name = "FILE")]
    pub calist: Option<PathBuf>,

    /// PKCS#12 bundle (analyze)
    #[arg(long, value_name = "FILE")]
    pub p12file: Option<PathBuf>,

    /// Bundle password; never prompted
    #[arg(long, value_name = "PASS")]
    pub p12pass: Option<String>,
}
