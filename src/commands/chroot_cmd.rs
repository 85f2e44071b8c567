// src/commands/chroot_cmd.rs

//! `chroot <kind> <arch>` — provision (or reuse) and activate a chroot
//! directly, without running a build. Useful for debugging a build root by
//! hand.

use anyhow::{Context, Result};

use crate::chroot::{self, ChrootKind};
use crate::config::Config;

pub fn run_chroot(config: &Config, kind: &str, arch: &str) -> Result<()> {
    let kind = match kind {
        "base" => ChrootKind::Base,
        "build" => ChrootKind::Build,
        "device" => ChrootKind::Device,
        other => anyhow::bail!("unknown chroot kind: {other} (expected base, build, or device)"),
    };

    let name = match kind {
        ChrootKind::Base => chroot::base_chroot_name(arch),
        ChrootKind::Build => format!("build-{arch}"),
        ChrootKind::Device => format!("rootfs-{arch}"),
    };
    let path = config.paths.chroots.join(&name);

    let c = chroot::get_chroot(chroot::ChrootSpec {
        name: &name,
        arch,
        kind,
        path: &path,
        copy_base: None,
        extra_repos: Vec::new(),
        base_packages: chroot::default_base_packages(),
        pacman_cache_root: config.paths.pacman.clone(),
        packages_root: config.paths.packages.clone(),
    });
    c.initialize(config.build.clean_mode).context("initializing chroot")?;
    c.activate().context("activating chroot")?;

    println!("{} is active at {}", c.name, c.path.display());
    Ok(())
}
