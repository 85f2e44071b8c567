// src/recipe/model.rs

//! The Recipe data model: one record per recipe directory, plus the global
//! package graph built by [`crate::recipe::discovery::discover_packages`].

use std::collections::{HashMap, HashSet};

/// Build strategy a recipe declares via `_mode=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildMode {
    Host,
    Cross,
}

impl BuildMode {
    pub fn parse(value: &str) -> Option<BuildMode> {
        match value {
            "host" => Some(BuildMode::Host),
            "cross" => Some(BuildMode::Cross),
            _ => None,
        }
    }
}

/// One output of a (possibly multi-output) recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    /// Path relative to the recipe root, e.g. `device/msm8916-bq-paella`.
    pub path: String,
    /// The bucket this recipe's output belongs to (first path segment).
    pub repo: String,
    /// Canonical package name (base name for multi-output recipes).
    pub name: String,
    /// `pkgver-pkgrel`.
    pub version: String,
    pub provides: Vec<String>,
    pub replaces: Vec<String>,
    /// Union of depends/makedepends/checkdepends/optdepends, deduplicated,
    /// with version constraints and descriptions stripped.
    pub depends: Vec<String>,
    pub mode: BuildMode,
}

impl Recipe {
    /// `name ∪ provides ∪ replaces` — the set of identifiers that satisfy a
    /// dependency on this recipe.
    pub fn identity_set(&self) -> HashSet<String> {
        let mut set: HashSet<String> = HashSet::new();
        set.insert(self.name.clone());
        set.extend(self.provides.iter().cloned());
        set.extend(self.replaces.iter().cloned());
        set
    }
}

/// All recipes discovered under a recipe root, keyed by identity.
pub struct PackageGraph {
    /// name/provides/replaces -> owning recipe's canonical name.
    identity_index: HashMap<String, String>,
    /// canonical name -> recipe, with `depends` already projected to
    /// `local_depends` (see [`PackageGraph::build`]).
    recipes: HashMap<String, Recipe>,
}

impl PackageGraph {
    /// Build the graph from raw recipes (whose `depends` still include
    /// external package names) by unioning identity sets and then
    /// projecting `depends` down to `local_depends`.
    pub fn build(raw: Vec<Recipe>) -> PackageGraph {
        let mut identity_index = HashMap::new();
        for r in &raw {
            for id in r.identity_set() {
                identity_index.insert(id, r.name.clone());
            }
        }

        let mut recipes = HashMap::new();
        for mut r in raw {
            r.depends.retain(|d| identity_index.contains_key(d));
            recipes.insert(r.name.clone(), r);
        }

        PackageGraph {
            identity_index,
            recipes,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    /// Resolve any identity-set member (name, provide, or replace) to the
    /// owning recipe's canonical name.
    pub fn resolve(&self, identity: &str) -> Option<&str> {
        self.identity_index.get(identity).map(|s| s.as_str())
    }

    pub fn contains_identity(&self, identity: &str) -> bool {
        self.identity_index.contains_key(identity)
    }

    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Every local dependency's canonical name, transitively, for `name`.
    pub fn transitive_local_depends(&self, name: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            let Some(recipe) = self.recipes.get(&current) else {
                continue;
            };
            for dep in &recipe.depends {
                let Some(owner) = self.resolve(dep) else {
                    continue;
                };
                if seen.insert(owner.to_string()) {
                    stack.push(owner.to_string());
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn local_depends_drops_external_packages() {
        let graph = PackageGraph::build(vec![
            recipe("a", &["b", "glibc-from-distro"]),
            recipe("b", &[]),
        ]);
        assert_eq!(graph.get("a").unwrap().depends, vec!["b".to_string()]);
    }

    #[test]
    fn identity_set_resolves_provides() {
        let mut b = recipe("libfoo", &[]);
        b.provides.push("foo".to_string());
        let graph = PackageGraph::build(vec![recipe("a", &["foo"]), b]);
        assert_eq!(graph.resolve("foo"), Some("libfoo"));
        assert_eq!(graph.get("a").unwrap().depends, vec!["foo".to_string()]);
    }

    #[test]
    fn transitive_local_depends_walks_chain() {
        let graph = PackageGraph::build(vec![
            recipe("a", &["b"]),
            recipe("b", &["c"]),
            recipe("c", &[]),
        ]);
        let deps = graph.transitive_local_depends("a");
        assert!(deps.contains("b"));
        assert!(deps.contains("c"));
    }
}
