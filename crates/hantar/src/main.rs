// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Binary entry point for the Hantar multi-tenant WhatsApp gateway.

use clap::{Parser, Subcommand};

use hantar_config::HantarConfig;

mod serve;

/// Hantar, a multi-tenant WhatsApp messaging gateway.
#[derive(Parser, Debug)]
#[command(name = "hantar", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the XDG lookup.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway server.
    Serve,
    /// Print the effective configuration after file and env merging.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config_or_exit(cli.config.as_deref());

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("hantar serve failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => print_config(&config),
        None => println!("hantar: use --help for available commands"),
    }
}

/// Configuration problems are fatal before any subcommand runs; render
/// the diagnostics and bail.
fn load_config_or_exit(path: Option<&std::path::Path>) -> HantarConfig {
    let loaded = match path {
        Some(path) => hantar_config::load_and_validate_path(path),
        None => hantar_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            hantar_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

fn print_config(config: &HantarConfig) {
    match toml::to_string_pretty(config) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => {
            eprintln!("failed to render configuration: {e}");
            std::process::exit(1);
        }
    }
}
