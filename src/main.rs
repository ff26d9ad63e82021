//! p12-convert - PEM to PKCS#12 bundling and bundle inspection

use clap::Parser;
use console::style;
use p12_convert::cli::{Cli, Commands};
use p12_convert::{commands, output};
use tracing_subscriber::EnvFilter;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            let _ = output::print_json(&output::JsonError::from_anyhow(&e));
        }
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // Handle color preference
    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let settings = commands::load_settings(&cli)?;

    match cli.command {
        Commands::Create(args) => commands::run_create(args, &settings, cli.json),
        Commands::Analyze(args) => commands::run_analyze(args, &settings, cli.json),
        Commands::Fetch(args) => commands::run_fetch(args, &settings, cli.json),
        Commands::Sweep => commands::run_sweep(&settings, cli.json),
        Commands::Submit(args) => commands::run_submit(args, &settings, cli.json),
    }
}
