// src/solver.rs

//! Turns the package graph into build levels: leaves first, each later
//! level depending only on earlier ones.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::recipe::model::PackageGraph;

const MAX_STALL_PASSES: usize = 10;
const MAX_LEVELS: usize = 100;

/// Compute `[set]` such that level 0 holds every requested recipe (plus its
/// transitive local dependencies) that has no local dependency elsewhere in
/// the seed set, and each later level's recipes depend only on recipes in
/// earlier levels. Two recipes in the same level are mutually independent.
pub fn build_levels(graph: &PackageGraph, requested: &HashSet<String>) -> Result<Vec<HashSet<String>>> {
    if requested.is_empty() {
        return Ok(Vec::new());
    }

    let mut seed: HashSet<String> = HashSet::new();
    for name in requested {
        let Some(canonical) = graph.resolve(name) else {
            return Err(Error::InvalidRecipe {
                path: name.clone(),
                reason: "requested recipe not found in graph".to_string(),
            });
        };
        seed.insert(canonical.to_string());
        seed.extend(graph.transitive_local_depends(canonical));
    }

    for name in &seed {
        let Some(recipe) = graph.get(name) else { continue };
        if recipe.depends.iter().any(|d| graph.resolve(d) == Some(name.as_str())) {
            return Err(Error::DependencyCycle {
                detail: format!("{name} depends on itself"),
            });
        }
    }

    let mut levels: Vec<HashSet<String>> = vec![seed];

    loop {
        if levels.len() > MAX_LEVELS {
            return Err(Error::DependencyCycle {
                detail: format!("exceeded {MAX_LEVELS} levels without converging"),
            });
        }

        let current_idx = levels.len() - 1;
        let mut stall_passes = 0;
        let mut last_snapshot: Option<HashSet<String>> = None;

        loop {
            let current = levels[current_idx].clone();
            let mut promote: HashSet<String> = HashSet::new();

            for name in &current {
                let Some(recipe) = graph.get(name) else { continue };
                for dep in &recipe.depends {
                    let Some(owner) = graph.resolve(dep) else { continue };
                    if owner != name && current.contains(owner) {
                        promote.insert(name.clone());
                        break;
                    }
                }
            }

            if promote.is_empty() {
                break;
            }

            for name in &promote {
                levels[current_idx].remove(name);
            }
            if levels.len() == current_idx + 1 {
                levels.push(HashSet::new());
            }
            levels[current_idx + 1].extend(promote);

            let snapshot = levels[current_idx].clone();
            if last_snapshot.as_ref() == Some(&snapshot) {
                stall_passes += 1;
            } else {
                stall_passes = 0;
            }
            last_snapshot = Some(snapshot);

            if stall_passes >= MAX_STALL_PASSES {
                return Err(Error::DependencyCycle {
                    detail: format!(
                        "level {} stalled after {MAX_STALL_PASSES} passes without progress: {:?}",
                        current_idx, levels[current_idx]
                    ),
                });
            }
        }

        if current_idx + 1 >= levels.len() || levels[current_idx + 1].is_empty() {
            break;
        }
    }

    levels.reverse();
    levels.retain(|level| !level.is_empty());
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::model::{BuildMode, Recipe};

    fn recipe(name: &str, depends: &[&str]) -> Recipe {
        Recipe {
            path: format!("main/{name}"),
            repo: "main".to_string(),
            name: name.to_string(),
            version: "1-1".to_string(),
            provides: vec![],
            replaces: vec![],
            depends: depends.iter().map(|s| s.to_string()).collect(),
            mode: BuildMode::Host,
        }
    }

    fn req(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn linear_chain_orders_leaves_first() {
        let graph = PackageGraph::build(vec![
            recipe("a", &["b"]),
            recipe("b", &["c"]),
            recipe("c", &[]),
        ]);
        let levels = build_levels(&graph, &req(&["a"])).unwrap();
        assert_eq!(levels.len(), 3);
        assert!(levels[0].contains("c"));
        assert!(levels[1].contains("b"));
        assert!(levels[2].contains("a"));
    }

    #[test]
    fn independent_pair_shares_a_level() {
        let graph = PackageGraph::build(vec![recipe("a", &[]), recipe("b", &[])]);
        let levels = build_levels(&graph, &req(&["a", "b"])).unwrap();
        assert_eq!(levels.len(), 1);
        assert!(levels[0].contains("a") && levels[0].contains("b"));
    }

    #[test]
    fn cycle_is_rejected() {
        let graph = PackageGraph::build(vec![recipe("a", &["b"]), recipe("b", &["a"])]);
        let err = build_levels(&graph, &req(&["a"])).unwrap_err();
        assert!(matches!(err, Error::DependencyCycle { .. }));
    }

    #[test]
    fn self_loop_is_rejected() {
        let graph = PackageGraph::build(vec![recipe("a", &["a"])]);
        let err = build_levels(&graph, &req(&["a"])).unwrap_err();
        assert!(matches!(err, Error::DependencyCycle { .. }));
    }

    #[test]
    fn empty_request_returns_no_levels() {
        let graph = PackageGraph::build(vec![recipe("a", &[])]);
        assert_eq!(build_levels(&graph, &HashSet::new()).unwrap(), Vec::new());
    }

    #[test]
    fn unknown_requested_recipe_is_an_error() {
        let graph = PackageGraph::build(vec![recipe("a", &[])]);
        assert!(build_levels(&graph, &req(&["nonexistent"])).is_err());
    }
}
