// src/commands/mod.rs

//! Command handlers: thin `anyhow::Context`-wrapped shells over the
//! library. Library code (`crate::error::Result`) never depends on
//! `anyhow`; this boundary is where domain errors become user-facing ones.

mod build;
mod chroot_cmd;
mod clean;
mod packages_builder;

pub use build::{run_build, run_check, run_update};
pub use chroot_cmd::run_chroot;
pub use clean::run_clean;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::chroot::{self, ChrootKind};
use crate::config::Config;
use crate::recipe::PackageGraph;

/// Arch the tool is running on, taken from `uname -m` mapped onto the
/// closed `{x86_64, aarch64}` set this tool understands.
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "aarch64" => "aarch64",
        _ => "x86_64",
    }
}

/// Get (creating if needed) the native build chroot used for recipe
/// discovery and the cache gate, and make sure it is active.
pub fn native_build_chroot(config: &Config) -> Result<Arc<chroot::Chroot>> {
    let arch = host_arch();
    let name = format!("build-{arch}");
    let path = config.paths.chroots.join(&name);
    let c = chroot::get_chroot(chroot::ChrootSpec {
        name: &name,
        arch,
        kind: ChrootKind::Build,
        path: &path,
        copy_base: None,
        extra_repos: Vec::new(),
        base_packages: chroot::default_base_packages(),
        pacman_cache_root: config.paths.pacman.clone(),
        packages_root: config.paths.packages.clone(),
    });
    c.initialize(config.build.clean_mode)
        .context("initializing native build chroot")?;
    if !c.is_active() {
        c.activate().context("activating native build chroot")?;
    }
    Ok(c)
}

/// Discover every recipe under the configured pkgbuilds root.
pub fn discover(config: &Config, native: &chroot::Chroot) -> Result<PackageGraph> {
    crate::recipe::discover_packages(&config.paths.pkgbuilds, config.threads(), native)
        .context("discovering recipes")
}

/// Resolve a list of recipe path arguments (e.g. `main/hello`) to canonical
/// package names in `graph`.
pub fn resolve_requested(graph: &PackageGraph, paths: &[String]) -> Result<HashSet<String>> {
    let mut names = HashSet::new();
    for path in paths {
        let pkg_name = path.rsplit('/').next().unwrap_or(path);
        if !graph.contains_identity(pkg_name) {
            anyhow::bail!("no recipe found for {path} (looked up as {pkg_name})");
        }
        names.insert(graph.resolve(pkg_name).unwrap().to_string());
    }
    Ok(names)
}
