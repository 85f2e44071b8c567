// src/recipe/discovery.rs

//! Walk a recipe root, parse every `<bucket>/<pkg>/PKGBUILD` in parallel,
//! and build the global [`PackageGraph`].

use std::path::Path;

use rayon::prelude::*;

use crate::chroot::ExecInChroot;
use crate::error::Result;
use crate::recipe::model::{PackageGraph, Recipe};
use crate::recipe::pkgbuild;

/// One directory found under the recipe root, relative to it
/// (`<bucket>/<pkg>`).
fn find_recipe_dirs(recipe_root: &Path) -> std::io::Result<Vec<String>> {
    let mut dirs = Vec::new();
    for bucket_entry in std::fs::read_dir(recipe_root)? {
        let bucket_entry = bucket_entry?;
        if !bucket_entry.file_type()?.is_dir() {
            continue;
        }
        let bucket_name = bucket_entry.file_name();
        for pkg_entry in std::fs::read_dir(bucket_entry.path())? {
            let pkg_entry = pkg_entry?;
            if !pkg_entry.file_type()?.is_dir() {
                continue;
            }
            if !pkg_entry.path().join("PKGBUILD").is_file() {
                continue;
            }
            dirs.push(format!(
                "{}/{}",
                bucket_name.to_string_lossy(),
                pkg_entry.file_name().to_string_lossy()
            ));
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Discover every recipe under `recipe_root`, parsing in parallel over a
/// worker pool sized by CPU count, then project `depends` down to
/// `local_depends` and build the global graph.
///
/// `executor` runs `makepkg --printsrcinfo` for a given relative recipe
/// path inside a native build chroot with the recipes tree mounted.
pub fn discover_packages(
    recipe_root: &Path,
    threads: usize,
    executor: &(dyn ExecInChroot + Sync),
) -> Result<PackageGraph> {
    let relative_dirs = find_recipe_dirs(recipe_root)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .expect("failed to build recipe discovery thread pool");

    let parsed: Vec<Result<Vec<Recipe>>> = pool.install(|| {
        relative_dirs
            .par_iter()
            .map(|rel| parse_one(recipe_root, rel, executor))
            .collect()
    });

    let mut all = Vec::new();
    for outcome in parsed {
        all.extend(outcome?);
    }

    Ok(PackageGraph::build(all))
}

fn parse_one(
    recipe_root: &Path,
    relative_path: &str,
    executor: &(dyn ExecInChroot + Sync),
) -> Result<Vec<Recipe>> {
    let pkgbuild_contents =
        std::fs::read_to_string(pkgbuild::pkgbuild_path(recipe_root, relative_path))?;
    let srcinfo = executor.printsrcinfo(relative_path)?;
    pkgbuild::parse_recipe(relative_path, &pkgbuild_contents, &srcinfo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FakeExecutor {
        srcinfo_by_path: Mutex<std::collections::HashMap<String, String>>,
    }

    impl ExecInChroot for FakeExecutor {
        fn printsrcinfo(&self, relative_path: &str) -> Result<String> {
            self.srcinfo_by_path
                .lock()
                .unwrap()
                .get(relative_path)
                .cloned()
                .ok_or_else(|| Error::InvalidRecipe {
                    path: relative_path.to_string(),
                    reason: "no fake srcinfo registered".to_string(),
                })
        }

        fn package_list(&self, _relative_path: &str, _config_path: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn run_build(
            &self,
            _relative_path: &str,
            _config_path: &str,
            _extra_flags: &[&str],
            _env: &[(&str, &str)],
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn discovers_two_independent_packages() {
        let root = tempdir().unwrap();
        for (bucket, pkg, srcinfo) in [
            ("main", "a", "pkgver = 1\npkgrel = 1\npkgname = a\ndepends = b\n"),
            ("main", "b", "pkgver = 1\npkgrel = 1\npkgname = b\n"),
        ] {
            let dir = root.path().join(bucket).join(pkg);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("PKGBUILD"), "_mode=host\n").unwrap();
            let mut map = std::collections::HashMap::new();
            map.insert(format!("{bucket}/{pkg}"), srcinfo.to_string());
            // merge into a single executor below
            let _ = map;
        }

        let mut all_srcinfo = std::collections::HashMap::new();
        all_srcinfo.insert(
            "main/a".to_string(),
            "pkgver = 1\npkgrel = 1\npkgname = a\ndepends = b\n".to_string(),
        );
        all_srcinfo.insert(
            "main/b".to_string(),
            "pkgver = 1\npkgrel = 1\npkgname = b\n".to_string(),
        );
        let executor = FakeExecutor {
            srcinfo_by_path: Mutex::new(all_srcinfo),
        };

        let graph = discover_packages(root.path(), 2, &executor).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.get("a").unwrap().depends, vec!["b".to_string()]);
    }
}
