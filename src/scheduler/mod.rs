// src/scheduler/mod.rs

//! Build scheduler: walks solver levels leaves-first, decides per recipe
//! whether a rebuild is needed, picks a compilation strategy, drives the
//! build, and publishes artifacts.
//!
//! Grounded on `original_source/packages.py::build_packages`/`build_package`.

pub mod gate;

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::progress::{ProgressTracker, SilentProgress};
use crate::recipe::model::{BuildMode, PackageGraph, Recipe};
use crate::repository::RepositoryIndex;
use crate::solver;

/// Per-recipe compilation strategy, chosen per §4.5.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Native build inside the target arch's own chroot (optionally wired
    /// with crossdirect or ccache when the host and target differ).
    Host,
    /// Cross-compiled from a native build chroot, with the target build
    /// chroot mounted read/write underneath it.
    Cross,
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub force: bool,
    pub enable_crosscompile: bool,
    pub enable_crossdirect: bool,
    pub enable_ccache: bool,
    pub threads: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            force: false,
            enable_crosscompile: true,
            enable_crossdirect: true,
            enable_ccache: false,
            threads: 0,
        }
    }
}

/// Packages that are themselves part of the crossdirect/qemu-user
/// infrastructure never get crossdirect wired into their own build, per
/// §4.5.3 ("the recipe is not one of the crossdirect/qemu-user
/// infrastructure packages themselves").
pub fn select_strategy(recipe: &Recipe, host_arch: &str, target_arch: &str, opts: &BuildOptions) -> Strategy {
    let foreign = host_arch != target_arch;
    let cross = foreign && recipe.mode == BuildMode::Cross && opts.enable_crosscompile;
    if cross {
        Strategy::Cross
    } else {
        Strategy::Host
    }
}

pub fn wants_crossdirect(recipe_name: &str, host_arch: &str, target_arch: &str, opts: &BuildOptions) -> bool {
    let foreign = host_arch != target_arch;
    foreign
        && opts.enable_crossdirect
        && !crate::chroot::crossdirect::CROSSDIRECT_PKGS.contains(&recipe_name)
}

/// Drives the build of one recipe once the scheduler has decided to build
/// it: runs the actual build tool invocation and returns the absolute paths
/// of emitted artifacts (not yet published to the index).
pub trait RecipeBuilder {
    fn build(
        &self,
        recipe: &Recipe,
        target_arch: &str,
        strategy: Strategy,
        opts: &BuildOptions,
    ) -> Result<Vec<PathBuf>>;
}

/// Compute the build-level ordering per §4.5.2: walk solver levels
/// leaves-first, including a recipe iff its outputs aren't all built, a
/// scheduled dependency forces a rebuild, or it's explicitly requested with
/// `force`. Drops empty levels.
pub fn select_build_levels(
    levels: &[HashSet<String>],
    graph: &PackageGraph,
    requested: &HashSet<String>,
    target_arch: &str,
    opts: &BuildOptions,
    mut is_built: impl FnMut(&Recipe) -> Result<bool>,
) -> Result<Vec<HashSet<String>>> {
    let _ = target_arch;
    let mut scheduled: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(levels.len());

    for level in levels {
        let mut this_level = HashSet::new();
        for name in level {
            let Some(recipe) = graph.get(name) else { continue };

            let dep_forces_rebuild = recipe
                .depends
                .iter()
                .filter_map(|d| graph.resolve(d))
                .any(|owner| scheduled.contains(owner));
            let explicitly_requested_and_forced = opts.force && requested.contains(name);

            let needs_build = dep_forces_rebuild || explicitly_requested_and_forced || !is_built(recipe)?;

            if needs_build {
                this_level.insert(name.clone());
                scheduled.insert(name.clone());
            }
        }
        if !this_level.is_empty() {
            out.push(this_level);
        }
    }
    Ok(out)
}

/// Environment variables every build invocation gets, per §4.5.3: a fixed
/// locale, a parallelism hint, and the emulation loader prefix.
pub fn build_env(threads: usize, qemu_ld_prefix: &str) -> Vec<(String, String)> {
    let threads = if threads == 0 {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    } else {
        threads
    };
    vec![
        ("LANG".to_string(), "C".to_string()),
        ("MAKEFLAGS".to_string(), format!("-j{threads}")),
        ("QEMU_LD_PREFIX".to_string(), qemu_ld_prefix.to_string()),
    ]
}

/// `build-tool` flags for a given strategy, per §4.5.3.
pub fn build_flags(strategy: Strategy) -> &'static [&'static str] {
    match strategy {
        Strategy::Cross => &["--nodeps", "--holdver"],
        Strategy::Host => &["--syncdeps", "--holdver"],
    }
}

/// Top-level entry point: resolve levels via the solver, apply the cache
/// gate, build each scheduled recipe in order, and publish artifacts.
/// A failure aborts the run with already-published artifacts left in the
/// index (§4.5.5/§4.6).
pub fn build_packages(
    graph: &PackageGraph,
    requested: &HashSet<String>,
    host_arch: &str,
    target_arch: &str,
    opts: &BuildOptions,
    builder: &dyn RecipeBuilder,
    index: &RepositoryIndex,
    is_built: impl FnMut(&Recipe) -> Result<bool>,
) -> Result<Vec<String>> {
    build_packages_with_progress(
        graph,
        requested,
        host_arch,
        target_arch,
        opts,
        builder,
        index,
        is_built,
        &SilentProgress::new(),
    )
}

/// As [`build_packages`], but reports per-recipe progress to `progress`
/// (message set before each build, incremented by one on success).
pub fn build_packages_with_progress(
    graph: &PackageGraph,
    requested: &HashSet<String>,
    host_arch: &str,
    target_arch: &str,
    opts: &BuildOptions,
    builder: &dyn RecipeBuilder,
    index: &RepositoryIndex,
    mut is_built: impl FnMut(&Recipe) -> Result<bool>,
    progress: &dyn ProgressTracker,
) -> Result<Vec<String>> {
    let levels = solver::build_levels(graph, requested)?;
    let scheduled_levels =
        select_build_levels(&levels, graph, requested, target_arch, opts, &mut is_built)?;

    let total: u64 = scheduled_levels.iter().map(|l| l.len() as u64).sum();
    progress.set_length(total);

    let mut built = Vec::new();
    for level in &scheduled_levels {
        for name in level {
            let recipe = graph.get(name).ok_or_else(|| Error::InvalidRecipe {
                path: name.clone(),
                reason: "scheduled recipe vanished from graph".to_string(),
            })?;
            progress.set_message(&format!("building {}", recipe.name));
            let strategy = select_strategy(recipe, host_arch, target_arch, opts);
            let artifacts = builder.build(recipe, target_arch, strategy, opts).inspect_err(|e| {
                progress.finish_with_error(&format!("{} failed: {e}", recipe.name));
            })?;
            for artifact in artifacts {
                index.add_file(&artifact, &recipe.repo, target_arch)?;
            }
            built.push(recipe.name.clone());
            progress.increment(1);
        }
    }
    progress.finish_with_message(&format!("built {} package(s)", built.len()));
    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::model::BuildMode;

    fn recipe(name: &str, mode: BuildMode, depends: &[&str]) -> Recipe {
        Recipe {
            path: format!("main/{name}"),
            repo: "main".to_string(),
            name: name.to_string(),
            version: "1-1".to_string(),
            provides: vec![],
            replaces: vec![],
            depends: depends.iter().map(|s| s.to_string()).collect(),
            mode,
        }
    }

    #[test]
    fn cross_strategy_only_when_foreign_and_cross_mode_and_enabled() {
        let r = recipe("a", BuildMode::Cross, &[]);
        let opts = BuildOptions::default();
        assert_eq!(select_strategy(&r, "x86_64", "aarch64", &opts), Strategy::Cross);
        assert_eq!(select_strategy(&r, "x86_64", "x86_64", &opts), Strategy::Host);

        let host_mode = recipe("b", BuildMode::Host, &[]);
        assert_eq!(select_strategy(&host_mode, "x86_64", "aarch64", &opts), Strategy::Host);

        let mut disabled = opts.clone();
        disabled.enable_crosscompile = false;
        assert_eq!(select_strategy(&r, "x86_64", "aarch64", &disabled), Strategy::Host);
    }

    #[test]
    fn crossdirect_infra_packages_never_wire_themselves() {
        let opts = BuildOptions::default();
        assert!(!wants_crossdirect("crossdirect", "x86_64", "aarch64", &opts));
        assert!(wants_crossdirect("hello", "x86_64", "aarch64", &opts));
        assert!(!wants_crossdirect("hello", "x86_64", "x86_64", &opts));
    }

    #[test]
    fn select_build_levels_skips_already_built_leaf() {
        let graph = PackageGraph::build(vec![recipe("a", BuildMode::Host, &["b"]), recipe("b", BuildMode::Host, &[])]);
        let requested: HashSet<String> = ["a".to_string()].into_iter().collect();
        let levels = solver::build_levels(&graph, &requested).unwrap();
        let opts = BuildOptions::default();

        let scheduled = select_build_levels(&levels, &graph, &requested, "x86_64", &opts, |r| {
            Ok(r.name == "b") // b already built, a is not
        })
        .unwrap();

        let all: HashSet<String> = scheduled.into_iter().flatten().collect();
        assert!(all.contains("a"));
        assert!(!all.contains("b"));
    }

    #[test]
    fn rebuilding_dependency_forces_dependent_rebuild_even_if_cached() {
        let graph = PackageGraph::build(vec![recipe("a", BuildMode::Host, &["b"]), recipe("b", BuildMode::Host, &[])]);
        let requested: HashSet<String> = ["a".to_string()].into_iter().collect();
        let levels = solver::build_levels(&graph, &requested).unwrap();
        let opts = BuildOptions::default();

        // Both report as already built, but b is in the requested-and-forced
        // path isn't used here; instead simulate: nothing is built so b gets
        // scheduled, forcing a's rebuild even if a's gate reports built.
        let scheduled = select_build_levels(&levels, &graph, &requested, "x86_64", &opts, |r| {
            Ok(r.name == "a") // a reports built, b reports not built
        })
        .unwrap();

        let all: HashSet<String> = scheduled.into_iter().flatten().collect();
        assert!(all.contains("b"));
        assert!(all.contains("a"), "a must rebuild because its dependency b rebuilt");
    }
}
