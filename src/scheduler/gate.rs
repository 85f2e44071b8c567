// src/scheduler/gate.rs

//! Rebuild decision: is a recipe's expected output already published?
//!
//! Grounded on `original_source/packages.py::check_package_version_built`:
//! ask the build tool for the recipe's expected output filenames via
//! `--packagelist` against a cross-configured config, then probe the bucket
//! for each.

use crate::chroot::ExecInChroot;
use crate::error::Result;
use crate::recipe::model::Recipe;
use crate::repository::RepositoryIndex;

/// `true` iff every artifact `recipe` would emit already exists in its
/// bucket for `target_arch`. As a side effect, re-indexes every file found
/// present (`index.add_file`, idempotent `repo-add --remove`), mirroring
/// `check_package_version_built`'s unconditional re-add of already-present
/// files. Re-indexing is best-effort: a failure (e.g. `repo-add` missing)
/// is logged but does not turn an already-built package into a missing one.
pub fn check_built(
    recipe: &Recipe,
    target_arch: &str,
    native_chroot: &dyn ExecInChroot,
    cross_config_path: &str,
    index: &RepositoryIndex,
) -> Result<bool> {
    let expected = native_chroot.package_list(&recipe.path, cross_config_path)?;
    if expected.is_empty() {
        return Ok(false);
    }

    let mut all_present = true;
    for filename in &expected {
        let base_name = filename.rsplit('/').next().unwrap_or(filename);
        if !index.has_file(&recipe.repo, target_arch, base_name) {
            all_present = false;
            continue;
        }
        let file_path = index.file_path(&recipe.repo, target_arch, base_name);
        if let Err(err) = index.add_file(&file_path, &recipe.repo, target_arch) {
            tracing::warn!(
                recipe = %recipe.name,
                file = %base_name,
                error = %err,
                "failed to re-index already-built package"
            );
        }
    }
    Ok(all_present)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::model::BuildMode;
    use tempfile::tempdir;

    struct FakeExecutor {
        files: Vec<String>,
    }

    impl ExecInChroot for FakeExecutor {
        fn printsrcinfo(&self, _relative_path: &str) -> Result<String> {
            unimplemented!()
        }
        fn package_list(&self, _relative_path: &str, _config_path: &str) -> Result<Vec<String>> {
            Ok(self.files.clone())
        }
        fn run_build(
            &self,
            _relative_path: &str,
            _config_path: &str,
            _extra_flags: &[&str],
            _env: &[(&str, &str)],
        ) -> Result<()> {
            unimplemented!()
        }
    }

    fn recipe() -> Recipe {
        Recipe {
            path: "main/hello".to_string(),
            repo: "main".to_string(),
            name: "hello".to_string(),
            version: "1-1".to_string(),
            provides: vec![],
            replaces: vec![],
            depends: vec![],
            mode: BuildMode::Host,
        }
    }

    #[test]
    fn not_built_when_no_expected_files() {
        let root = tempdir().unwrap();
        let index = RepositoryIndex::new(root.path(), root.path().join("pacman"));
        let executor = FakeExecutor { files: vec![] };
        assert!(!check_built(&recipe(), "aarch64", &executor, "/etc/makepkg.conf", &index).unwrap());
    }

    #[test]
    fn not_built_when_file_missing_from_bucket() {
        let root = tempdir().unwrap();
        let index = RepositoryIndex::new(root.path(), root.path().join("pacman"));
        let executor = FakeExecutor {
            files: vec!["hello-1-1-aarch64.pkg.tar.zst".to_string()],
        };
        assert!(!check_built(&recipe(), "aarch64", &executor, "/etc/makepkg.conf", &index).unwrap());
    }

    #[test]
    fn built_when_file_already_in_bucket() {
        // Re-indexing via `repo-add` is best-effort (see `check_built`), so
        // this stays true even in a sandbox without the `repo-add` binary.
        let root = tempdir().unwrap();
        let index = RepositoryIndex::new(root.path(), root.path().join("pacman"));
        let bucket_dir = root.path().join("aarch64").join("main");
        std::fs::create_dir_all(&bucket_dir).unwrap();
        std::fs::write(bucket_dir.join("hello-1-1-aarch64.pkg.tar.zst"), b"").unwrap();
        let executor = FakeExecutor {
            files: vec!["hello-1-1-aarch64.pkg.tar.zst".to_string()],
        };
        assert!(check_built(&recipe(), "aarch64", &executor, "/etc/makepkg.conf", &index).unwrap());
    }
}
