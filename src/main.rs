//! GameWav CLI - Audio Converter
//!
//! Command-line interface for the GameWav converter.

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use gamewav::cli::{commands, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("GameWav Converter v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Some(Commands::Convert { inputs, out_dir }) => {
            commands::convert(&inputs, &out_dir, &cli.settings)
        }
        Some(Commands::Export {
            categories,
            out_dir,
        }) => commands::export(&categories, &out_dir, &cli.settings),
        Some(Commands::Formats) => commands::formats(),
        None => {
            println!("GameWav Converter v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("[{}] {}", e.error_code(), e);
        println!("{}", e.status_message());
        std::process::exit(1);
    }
}
