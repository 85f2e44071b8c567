// src/repository/mod.rs

//! Per-`(arch, bucket)` binary package repository index.
//!
//! Grounded on `original_source/packages.py::add_file_to_repo`: wraps the
//! `repo-add` tool, which maintains `{bucket}.db.tar.xz`/
//! `{bucket}.files.tar.xz`, and re-derives the unsuffixed `{bucket}.db`/
//! `{bucket}.files` copies readers expect to find.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

pub const BUCKETS: &[&str] = &["boot", "device", "firmware", "linux", "main"];

pub struct RepositoryIndex {
    packages_root: PathBuf,
    pacman_cache_root: PathBuf,
}

impl RepositoryIndex {
    pub fn new(packages_root: impl Into<PathBuf>, pacman_cache_root: impl Into<PathBuf>) -> Self {
        RepositoryIndex {
            packages_root: packages_root.into(),
            pacman_cache_root: pacman_cache_root.into(),
        }
    }

    fn bucket_dir(&self, arch: &str, bucket: &str) -> PathBuf {
        self.packages_root.join(arch).join(bucket)
    }

    /// Ensure every known bucket directory exists under `arch`, each
    /// containing (possibly freshly-created empty) `.db.tar.xz`/
    /// `.files.tar.xz` archives.
    pub fn init_index(&self, arch: &str) -> Result<()> {
        for bucket in BUCKETS {
            let dir = self.bucket_dir(arch, bucket);
            std::fs::create_dir_all(&dir).map_err(|e| Error::IndexFailed {
                bucket: bucket.to_string(),
                reason: e.to_string(),
            })?;
            for ext in ["db", "files"] {
                let archive = dir.join(format!("{bucket}.{ext}.tar.xz"));
                if !archive.exists() {
                    create_empty_archive(&archive, bucket)?;
                }
            }
        }
        Ok(())
    }

    /// Move `file_path` into `(arch, bucket)`'s directory, re-run
    /// `repo-add --remove` against it, and refresh the unsuffixed `.db`/
    /// `.files` copies so a reader never observes a half-updated archive.
    /// No `--prevent-downgrade` flag is passed: a rebuild of an older
    /// version is expected to succeed and overwrite, matching upstream.
    pub fn add_file(&self, file_path: &Path, bucket: &str, arch: &str) -> Result<()> {
        let repo_dir = self.bucket_dir(arch, bucket);
        std::fs::create_dir_all(&repo_dir).map_err(|e| Error::IndexFailed {
            bucket: bucket.to_string(),
            reason: e.to_string(),
        })?;

        let file_name = file_path
            .file_name()
            .ok_or_else(|| Error::IndexFailed {
                bucket: bucket.to_string(),
                reason: format!("{} has no file name", file_path.display()),
            })?;
        let target_file = repo_dir.join(file_name);

        if file_path != target_file {
            std::fs::copy(file_path, &target_file).map_err(|e| Error::IndexFailed {
                bucket: bucket.to_string(),
                reason: e.to_string(),
            })?;
            std::fs::remove_file(file_path)?;
        }

        let cache_file = self.pacman_cache_root.join(arch).join(file_name);
        if cache_file.exists() {
            std::fs::remove_file(&cache_file)?;
        }

        let db_archive = repo_dir.join(format!("{bucket}.db.tar.xz"));
        let status = Command::new("repo-add")
            .arg("--remove")
            .arg(&db_archive)
            .arg(&target_file)
            .status()
            .map_err(|e| Error::IndexFailed {
                bucket: bucket.to_string(),
                reason: e.to_string(),
            })?;
        if !status.success() {
            return Err(Error::IndexFailed {
                bucket: bucket.to_string(),
                reason: format!("repo-add exited with {status} for {}", target_file.display()),
            });
        }

        for ext in ["db", "files"] {
            let unsuffixed = repo_dir.join(format!("{bucket}.{ext}"));
            let archive = repo_dir.join(format!("{bucket}.{ext}.tar.xz"));
            if archive.exists() {
                if unsuffixed.exists() {
                    std::fs::remove_file(&unsuffixed)?;
                }
                std::fs::copy(&archive, &unsuffixed)?;
            }
            let old = repo_dir.join(format!("{bucket}.{ext}.tar.xz.old"));
            if old.exists() {
                std::fs::remove_file(&old)?;
            }
        }

        Ok(())
    }

    /// Whether `bucket`/`arch` already has `file_name` published, without
    /// touching the index.
    pub fn has_file(&self, bucket: &str, arch: &str, file_name: &str) -> bool {
        self.bucket_dir(arch, bucket).join(file_name).exists()
    }

    /// Where `file_name` lives (or would live) under `bucket`/`arch`.
    pub fn file_path(&self, bucket: &str, arch: &str, file_name: &str) -> PathBuf {
        self.bucket_dir(arch, bucket).join(file_name)
    }
}

fn create_empty_archive(path: &Path, bucket: &str) -> Result<()> {
    let status = Command::new("repo-add")
        .arg(path)
        .status()
        .map_err(|e| Error::IndexFailed {
            bucket: bucket.to_string(),
            reason: e.to_string(),
        })?;
    if !status.success() {
        return Err(Error::IndexFailed {
            bucket: bucket.to_string(),
            reason: format!("repo-add exited with {status} creating empty archive"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bucket_dir_layout_is_arch_then_bucket() {
        let root = tempdir().unwrap();
        let index = RepositoryIndex::new(root.path(), root.path().join("pacman"));
        assert_eq!(
            index.bucket_dir("aarch64", "main"),
            root.path().join("aarch64").join("main")
        );
    }

    #[test]
    fn has_file_false_when_not_present() {
        let root = tempdir().unwrap();
        let index = RepositoryIndex::new(root.path(), root.path().join("pacman"));
        assert!(!index.has_file("main", "aarch64", "foo-1-1-aarch64.pkg.tar.zst"));
    }
}
