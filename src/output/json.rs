//! JSON output formatter

use serde::Serialize;

/// Print any serializable result as pretty JSON to stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// JSON error object written when `--json` is set and a command fails
#[derive(Debug, Serialize)]
pub struct JsonError {
    pub error: String,
    /// Error kind, when the failure came from the conversion pipeline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Form name of the offending field, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl JsonError {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let convert = err.downcast_ref::<crate::utils::ConvertError>();
        Self {
            error: err.to_string(),
            kind: convert.map(|e| e.kind().to_string()),
            field: convert.and_then(|e| e.field()).map(|f| f.form_name().to_string()),
        }
    }
}
