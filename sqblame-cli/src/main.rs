//! sqblame CLI - Export SonarQube issues enriched with SCM blame
//!
//! Paste the issues page URL from the browser, get a CSV or JSON file with
//! who last touched each flagged line.

mod commands;

use clap::{Parser, Subcommand};
use sqblame_core::{Config, ConfigOverrides};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{CheckArgs, ExportArgs, SecretsArgs};

/// sqblame: SonarQube issues with per-line blame
#[derive(Parser, Debug)]
#[command(name = "sqblame")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Export issues matching a browser URL, enriched with blame
    #[command(visible_alias = "x")]
    Export(ExportArgs),

    /// Check that the server is reachable and accepts the credentials
    Check(CheckArgs),

    /// Show current configuration
    Config,

    /// Manage the secrets file
    Secrets(SecretsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for exported records
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Some(Commands::Version) => {
            println!("sqblame {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Export(args)) => {
            args.execute(cli.verbose).await?;
        }
        Some(Commands::Check(args)) => {
            args.execute(cli.verbose).await?;
        }
        Some(Commands::Config) => {
            let config = Config::load_with_overrides(&ConfigOverrides::default())?;

            println!("sqblame Configuration");
            println!("=====================");
            println!();
            println!("Server Settings:");
            println!("  page_size: {}", config.effective_page_size());
            println!(
                "  timeout: {}",
                humantime_serde::re::humantime::format_duration(config.server.timeout)
            );
            println!("  insecure: {}", config.server.insecure);
            println!("  project_param: {}", config.server.project_param);
            println!();
            println!("Output Settings:");
            println!(
                "  format: {}",
                config
                    .output
                    .format
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "(from output path)".to_string())
            );
            println!("  summary: {}", config.output.summary);
            println!();
            println!("Blame Settings:");
            println!("  enabled: {}", config.blame.enabled);
            println!();
            if let Some(path) = Config::default_config_path() {
                println!("Config file: {}", path.display());
                if path.exists() {
                    println!("  (exists)");
                } else {
                    println!("  (not found - using defaults)");
                }
            }
        }
        Some(Commands::Secrets(args)) => {
            args.execute()?;
        }
        None => {
            println!("sqblame - SonarQube issues with SCM blame");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
