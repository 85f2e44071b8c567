// src/lib.rs

//! Kupferbootstrap build-orchestration engine.
//!
//! Parses PKGBUILD-style recipe directories into a package graph,
//! provisions layered chroot build environments for a native/foreign
//! architecture pair, schedules builds in dependency order while picking a
//! per-package compilation strategy (native, cross, or QEMU-emulated via
//! crossdirect), and publishes artifacts into versioned pacman
//! repositories.
//!
//! The CLI (`cli`, `commands`) is a thin shell over this library: library
//! code returns [`error::Result`] and never depends on `anyhow`, so callers
//! can match on a specific [`error::Error`] variant; the command layer is
//! where domain errors become user-facing `anyhow::Error`s.

pub mod chroot;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod progress;
pub mod recipe;
pub mod repository;
pub mod scheduler;
pub mod solver;

pub use config::Config;
pub use error::{Error, Result};
pub use progress::{LogProgress, ProgressTracker, SilentProgress};
pub use recipe::{discover_packages, BuildMode, PackageGraph, Recipe};
pub use repository::RepositoryIndex;
pub use solver::build_levels;
