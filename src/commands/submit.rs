//! Form-style submit command

use crate::cli::SubmitArgs;
use crate::commands::read_upload;
use crate::config::Settings;
use crate::models::MaterialKind;
use crate::output;
use crate::runner::{Command, Converter, FormFields};
use std::path::Path;

/// Resolve the `cmd` field, run the selected command and print its outcome
pub fn run_submit(args: SubmitArgs, settings: &Settings, json: bool) -> anyhow::Result<()> {
    let upload = |path: Option<&Path>, kind: MaterialKind| {
        path.map(|p| read_upload(p, kind, &settings.limits))
            .transpose()
    };

    let form = FormFields {
        certfile: upload(args.certfile.as_deref(), MaterialKind::Certificate)?,
        keyfile: upload(args.keyfile.as_deref(), MaterialKind::PrivateKey)?,
        calist: upload(args.calist.as_deref(), MaterialKind::CaList)?,
        p12file: upload(args.p12file.as_deref(), MaterialKind::Bundle)?,
        p12pass: args.p12pass,
    };

    let command = Command::from_form(args.cmd.as_deref(), form)?;
    let outcome = Converter::new(settings).run(&command)?;

    if json {
        output::print_json(&outcome)?;
    } else {
        output::print_outcome(&outcome);
    }

    Ok(())
}
