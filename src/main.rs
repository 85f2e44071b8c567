// src/main.rs

use anyhow::Result;
use clap::Parser;
use kupferbootstrap::cli::{Cli, Commands, PackagesCommand};
use kupferbootstrap::commands;
use kupferbootstrap::Config;

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Packages(PackagesCommand::Build {
            paths,
            force,
            arch,
            clean_chroot,
        }) => {
            let target_arch = arch.unwrap_or_else(|| commands::host_arch().to_string());
            commands::run_build(&config, &paths, &target_arch, force, clean_chroot)
        }
        Commands::Packages(PackagesCommand::Update) => {
            commands::run_update(&config, commands::host_arch())
        }
        Commands::Packages(PackagesCommand::Check { paths }) => {
            commands::run_check(&config, &paths, commands::host_arch())
        }
        Commands::Packages(PackagesCommand::Clean) => commands::run_clean(&config),
        Commands::Chroot { kind, arch } => commands::run_chroot(&config, &kind, &arch),
    }
}
