//! Create command implementation

use crate::cli::CreateArgs;
use crate::commands::{read_upload, resolve_password};
use crate::config::Settings;
use crate::models::MaterialKind;
use crate::output;
use crate::runner::{Converter, CreateRequest};

/// Bundle the given PEM files and stage the result for download
pub fn run_create(args: CreateArgs, settings: &Settings, json: bool) -> anyhow::Result<()> {
    let limits = &settings.limits;

    let certificate = read_upload(&args.cert, MaterialKind::Certificate, limits)?;
    let private_key = read_upload(&args.key, MaterialKind::PrivateKey, limits)?;
    let ca_list = args
        .ca
        .as_deref()
        .map(|path| read_upload(path, MaterialKind::CaList, limits))
        .transpose()?;

    let passphrase = resolve_password(args.password, "Bundle password", true)?;

    let request = CreateRequest {
        certificate: Some(certificate),
        private_key: Some(private_key),
        ca_list,
        passphrase,
        friendly_name: args.name,
    };

    let result = Converter::new(settings).create(&request)?;

    if json {
        output::print_json(&result)?;
    } else {
        output::print_create_result(&result);
    }

    Ok(())
}
