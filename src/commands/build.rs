// src/commands/build.rs

//! `packages build/update/check` handlers.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::chroot::Chroot;
use crate::commands::packages_builder::ChrootRecipeBuilder;
use crate::config::Config;
use crate::progress::LogProgress;
use crate::repository::RepositoryIndex;
use crate::scheduler::{self, gate, BuildOptions};

use super::{discover, host_arch, native_build_chroot, resolve_requested};

pub fn run_build(
    config: &Config,
    paths: &[String],
    target_arch: &str,
    force: bool,
    clean_chroot: bool,
) -> Result<()> {
    let native = native_build_chroot(config)?;
    let graph = discover(config, &native)?;
    let requested = resolve_requested(&graph, paths)?;

    let opts = BuildOptions {
        force,
        enable_crosscompile: config.build.crosscompile,
        enable_crossdirect: config.build.crossdirect,
        enable_ccache: config.build.ccache,
        threads: config.threads() as usize,
    };

    let index = RepositoryIndex::new(&config.paths.packages, &config.paths.pacman);
    index.init_index(target_arch).context("initializing repository index")?;

    let builder = ChrootRecipeBuilder {
        config: config.clone(),
        host_arch: host_arch().to_string(),
        native_chroot: Arc::clone(&native),
        clean_chroot: clean_chroot || config.build.clean_mode,
    };

    let is_built = make_cache_gate(&native, &index, target_arch);
    let progress = LogProgress::new("packages build", 0);

    let built = scheduler::build_packages_with_progress(
        &graph,
        &requested,
        host_arch(),
        target_arch,
        &opts,
        &builder,
        &index,
        is_built,
        &progress,
    )
    .context("running build scheduler")?;

    if built.is_empty() {
        println!("Nothing to build; everything up to date.");
    } else {
        println!("Built: {}", built.join(", "));
    }
    Ok(())
}

pub fn run_update(config: &Config, target_arch: &str) -> Result<()> {
    let native = native_build_chroot(config)?;
    let graph = discover(config, &native)?;
    let requested: HashSet<String> = graph.recipes().map(|r| r.name.clone()).collect();

    let opts = BuildOptions {
        force: false,
        enable_crosscompile: config.build.crosscompile,
        enable_crossdirect: config.build.crossdirect,
        enable_ccache: config.build.ccache,
        threads: config.threads() as usize,
    };

    let index = RepositoryIndex::new(&config.paths.packages, &config.paths.pacman);
    index.init_index(target_arch)?;

    let builder = ChrootRecipeBuilder {
        config: config.clone(),
        host_arch: host_arch().to_string(),
        native_chroot: Arc::clone(&native),
        clean_chroot: config.build.clean_mode,
    };

    let is_built = make_cache_gate(&native, &index, target_arch);
    let progress = LogProgress::new("packages update", 0);

    let built = scheduler::build_packages_with_progress(
        &graph, &requested, host_arch(), target_arch, &opts, &builder, &index, is_built, &progress,
    )
    .context("updating all recipes")?;

    println!("Rebuilt {} package(s)", built.len());
    Ok(())
}

pub fn run_check(config: &Config, paths: &[String], target_arch: &str) -> Result<()> {
    let native = native_build_chroot(config)?;
    let graph = discover(config, &native)?;
    let requested = resolve_requested(&graph, paths)?;
    let index = RepositoryIndex::new(&config.paths.packages, &config.paths.pacman);

    let mut is_built = make_cache_gate(&native, &index, target_arch);
    for name in &requested {
        let recipe = graph.get(name).expect("resolved name must be in graph");
        let built = is_built(recipe)?;
        println!("{}: {}", recipe.name, if built { "built" } else { "needs build" });
    }
    Ok(())
}

fn make_cache_gate<'a>(
    native: &'a Chroot,
    index: &'a RepositoryIndex,
    target_arch: &str,
) -> impl FnMut(&crate::recipe::model::Recipe) -> crate::error::Result<bool> + 'a {
    let config_path = format!(
        "/etc/{}",
        crate::chroot::config::makepkg_conf_filename(Some(target_arch))
    );
    let target_arch = target_arch.to_string();
    move |recipe| gate::check_built(recipe, &target_arch, native, &config_path, index)
}
