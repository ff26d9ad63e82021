//! Render bundle summaries and command results to the terminal

use crate::export::SweepReport;
use crate::models::{AnalyzeResult, BundleSummary, CertificateInfo, CreateResult, Outcome};
use console::style;

/// Print the result of a `create` run
pub fn print_create_result(result: &CreateResult) {
    print!("{}", format_create_result(result));
}

/// Print the result of an `analyze` run
pub fn print_analyze_result(result: &AnalyzeResult) {
    print!("{}", format_analyze_result(result));
}

/// Print whichever result a dispatched command produced
pub fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Create(result) => print_create_result(result),
        Outcome::Analyze(result) => print_analyze_result(result),
    }
}

pub fn print_sweep_report(report: &SweepReport) {
    println!(
        "  {} Removed {} expired file(s), {} artifact(s) still live",
        style("✓").green(),
        report.removed,
        report.retained
    );
}

pub fn format_create_result(result: &CreateResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {} {}\n",
        style("✓").green(),
        style("PKCS#12 bundle created").bold()
    ));
    out.push_str(&format_key_value(
        None,
        &[
            ("Download URL".to_string(), result.artifact_url.clone()),
            ("Artifact".to_string(), result.artifact.name.clone()),
            ("Size".to_string(), format!("{} bytes", result.artifact.size)),
            (
                "Expires".to_string(),
                result
                    .artifact
                    .expires_at
                    .format("%Y-%m-%d %H:%M:%S UTC")
                    .to_string(),
            ),
        ],
    ));
    out.push_str(&format_summary(&result.summary));
    out
}

pub fn format_analyze_result(result: &AnalyzeResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {} {} {}\n",
        style("✓").green(),
        style(&result.source_name).bold(),
        style(format!("({} bytes)", result.source_size)).dim()
    ));
    out.push_str(&format_summary(&result.summary));
    out
}

/// Certificate, key and chain details of a bundle
pub fn format_summary(summary: &BundleSummary) -> String {
    let mut out = String::new();

    if let Some(name) = &summary.friendly_name {
        out.push_str(&format_key_value(
            None,
            &[("Friendly Name".to_string(), name.clone())],
        ));
    }

    out.push_str(&format_certificate(&summary.certificate));

    out.push_str(&format_key_value(
        Some("Private Key"),
        &[
            ("Type".to_string(), summary.key.key_type.clone()),
            ("Size".to_string(), format!("{} bits", summary.key.bits)),
        ],
    ));

    if summary.chain.is_empty() {
        out.push_str(&format!(
            "\n    {}\n    {}\n",
            style("CA Certificates").bold(),
            style("none").dim()
        ));
    } else {
        out.push_str(&format!("\n    {}\n", style("CA Certificates").bold()));
        for (i, cert) in summary.chain.iter().enumerate() {
            out.push_str(&format!(
                "    {} {} {}\n",
                style(format!("{}.", i + 1)).dim(),
                style(cert.subject_cn()).cyan(),
                style(format!("({})", cert.role)).dim()
            ));
            out.push_str(&format!(
                "       {} {}\n",
                style("Issuer:").dim(),
                cert.issuer
            ));
            out.push_str(&format!(
                "       {} {} to {}\n",
                style("Valid:").dim(),
                cert.not_before.format("%Y-%m-%d"),
                cert.not_after.format("%Y-%m-%d")
            ));
        }
    }

    out
}

fn format_certificate(info: &CertificateInfo) -> String {
    let mut out = format_key_value(
        Some(&info.role.to_string()),
        &[
            ("Subject".to_string(), info.subject.clone()),
            ("Issuer".to_string(), info.issuer.clone()),
            ("Serial".to_string(), info.serial.clone()),
            ("Version".to_string(), format!("v{}", info.version)),
            (
                "Valid From".to_string(),
                info.not_before.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ),
            (
                "Valid Until".to_string(),
                info.not_after.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ),
            (
                "Days Until Expiry".to_string(),
                if info.is_expired() {
                    style("EXPIRED").red().to_string()
                } else {
                    info.days_until_expiry().to_string()
                },
            ),
            (
                "Public Key".to_string(),
                format!("{} ({} bits)", info.public_key_algorithm, info.public_key_size),
            ),
            (
                "Signature Algorithm".to_string(),
                info.signature_algorithm.clone(),
            ),
            ("SHA-256 Fingerprint".to_string(), info.thumbprint.clone()),
            (
                "Self-Signed".to_string(),
                if info.is_self_signed { "Yes" } else { "No" }.to_string(),
            ),
            (
                "CA Certificate".to_string(),
                if info.is_ca { "Yes" } else { "No" }.to_string(),
            ),
        ],
    );

    if !info.san.is_empty() {
        out.push_str(&format!(
            "\n    {}\n",
            style("Subject Alternative Names").bold()
        ));
        for san in &info.san {
            out.push_str(&format!("    • {}\n", san));
        }
    }

    if !info.key_usage.is_empty() {
        out.push_str(&format!("\n    {}\n", style("Key Usage").bold()));
        for usage in &info.key_usage {
            out.push_str(&format!("    • {}\n", usage));
        }
    }

    out
}

fn format_key_value(title: Option<&str>, pairs: &[(String, String)]) -> String {
    let mut out = String::new();
    if let Some(t) = title {
        out.push('\n');
        out.push_str(&format!("    {}\n", style(t).bold()));
    }
    let max_key_len = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in pairs {
        let dots = ".".repeat(max_key_len.saturating_sub(key.len()) + 2);
        out.push_str(&format!(
            "    {} {} {}\n",
            style(key).dim(),
            style(dots).dim(),
            value
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_alignment() {
        console::set_colors_enabled(false);
        let out = format_key_value(
            Some("Private Key"),
            &[
                ("Type".to_string(), "RSA".to_string()),
                ("Size".to_string(), "2048 bits".to_string()),
                ("Long Label".to_string(), "x".to_string()),
            ],
        );
        assert!(out.contains("Private Key"));
        assert!(out.contains("    Type ........ RSA\n"));
        assert!(out.contains("    Long Label .. x\n"));
    }
}
