// src/cli.rs

// Command-line surface: thin `clap` derive over the library. Dispatch
// lives in `commands/`; this module only defines the grammar.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kupferbootstrap")]
#[command(author, version, about = "Cross-architecture bootstrap tool for an aarch64 Linux distribution", long_about = None)]
pub struct Cli {
    /// Raise the log level; repeat for more detail (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the TOML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Named profile to resolve from the config's `[profiles.*]` tables.
    #[arg(long, global = true, default_value = "default")]
    pub profile: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build, update, check, or clean package recipes.
    #[command(subcommand)]
    Packages(PackagesCommand),
    /// Create or enter a chroot directly, without running a build.
    Chroot {
        /// base, build, or device
        kind: String,
        arch: String,
    },
}

#[derive(Subcommand)]
pub enum PackagesCommand {
    /// Build one or more recipe paths and their unbuilt local dependencies.
    Build {
        paths: Vec<String>,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        arch: Option<String>,
        #[arg(long)]
        clean_chroot: bool,
    },
    /// Re-discover recipes and rebuild anything the cache gate reports stale.
    Update,
    /// Report which of the given recipes are already built, without building.
    Check { paths: Vec<String> },
    /// Remove build chroots, forcing the next build to reprovision them.
    Clean,
}
