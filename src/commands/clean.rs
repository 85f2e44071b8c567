// src/commands/clean.rs

//! `packages clean` — remove build chroots so the next build reprovisions
//! them from scratch.

use anyhow::{Context, Result};

use crate::config::Config;

const KNOWN_ARCHES: &[&str] = &["x86_64", "aarch64"];

pub fn run_clean(config: &Config) -> Result<()> {
    for arch in KNOWN_ARCHES {
        let name = format!("build-{arch}");
        let path = config.paths.chroots.join(&name);
        if !path.exists() {
            continue;
        }
        crate::chroot::forget_chroot(&name);
        std::fs::remove_dir_all(&path)
            .with_context(|| format!("removing chroot directory {}", path.display()))?;
        println!("Removed {name}");
    }
    Ok(())
}
