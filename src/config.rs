// src/config.rs

//! Fixed-schema configuration, loaded from `config.toml`.
//!
//! The original tool keeps a dynamic dict-of-dicts; here the schema is
//! fixed and unknown keys are rejected at load time rather than silently
//! accepted (`#[serde(deny_unknown_fields)]` on every struct).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct BuildConfig {
    pub crosscompile: bool,
    pub crossdirect: bool,
    pub ccache: bool,
    /// 0 means auto (all CPUs).
    pub threads: u32,
    /// Reset chroots before every run.
    pub clean_mode: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            crosscompile: true,
            crossdirect: true,
            ccache: true,
            threads: 0,
            clean_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct PkgbuildsConfig {
    pub git_repo: String,
    pub git_branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct PathsConfig {
    pub chroots: PathBuf,
    pub pacman: PathBuf,
    pub packages: PathBuf,
    pub pkgbuilds: PathBuf,
    pub images: PathBuf,
    pub jumpdrive: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let root = PathBuf::from("/var/lib/kupfer");
        Self {
            chroots: root.join("chroots"),
            pacman: root.join("pacman"),
            packages: root.join("packages"),
            pkgbuilds: root.join("pkgbuilds"),
            images: root.join("images"),
            jumpdrive: root.join("jumpdrive"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct Profile {
    /// Name of a profile to inherit unset fields from.
    pub parent: Option<String>,
    pub device: Option<String>,
    pub flavour: Option<String>,
    pub pkgs_include: Vec<String>,
    pub pkgs_exclude: Vec<String>,
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Profile {
    /// Overlay `self` onto `parent`: unset scalar fields and empty vecs are
    /// filled in from the parent. Does not recurse further; `Config::resolve_profile`
    /// walks the parent chain.
    fn inherit_from(&self, parent: &Profile) -> Profile {
        Profile {
            parent: self.parent.clone(),
            device: self.device.clone().or_else(|| parent.device.clone()),
            flavour: self.flavour.clone().or_else(|| parent.flavour.clone()),
            pkgs_include: if self.pkgs_include.is_empty() {
                parent.pkgs_include.clone()
            } else {
                self.pkgs_include.clone()
            },
            pkgs_exclude: if self.pkgs_exclude.is_empty() {
                parent.pkgs_exclude.clone()
            } else {
                self.pkgs_exclude.clone()
            },
            hostname: self.hostname.clone().or_else(|| parent.hostname.clone()),
            username: self.username.clone().or_else(|| parent.username.clone()),
            password: self.password.clone().or_else(|| parent.password.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub build: BuildConfig,
    pub pkgbuilds: PkgbuildsConfig,
    pub paths: PathsConfig,
    pub profiles: HashMap<String, Profile>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from `path` if given, else the default XDG location, else
    /// fall back to `Config::default()` if no file exists.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
        if let Some(p) = path {
            return Self::load(p);
        }
        let default_path = default_config_path();
        if default_path.is_file() {
            Self::load(&default_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Resolve a named profile, following `parent` links. Cycles are
    /// rejected rather than looping forever.
    pub fn resolve_profile(&self, name: &str) -> Result<Profile> {
        let mut chain = vec![name.to_string()];
        let mut current = self
            .profiles
            .get(name)
            .ok_or_else(|| Error::Config(format!("no such profile: {name}")))?
            .clone();

        while let Some(parent_name) = current.parent.clone() {
            if chain.contains(&parent_name) {
                return Err(Error::Config(format!(
                    "profile inheritance cycle at {parent_name}"
                )));
            }
            chain.push(parent_name.clone());
            let parent = self
                .profiles
                .get(&parent_name)
                .ok_or_else(|| Error::Config(format!("no such profile: {parent_name}")))?;
            current = current.inherit_from(parent);
            current.parent = parent.parent.clone();
        }
        Ok(current)
    }

    pub fn threads(&self) -> usize {
        if self.build.threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.build.threads as usize
        }
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kupferbootstrap")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_paths() {
        let cfg = Config::default();
        assert_eq!(cfg.paths.chroots, PathBuf::from("/var/lib/kupfer/chroots"));
        assert!(!cfg.build.crosscompile || cfg.build.crosscompile); // default is true
    }

    #[test]
    fn rejects_unknown_keys() {
        let toml = r#"
[build]
crosscompile = true
bogus_key = 1
"#;
        let err = toml::from_str::<Config>(toml).unwrap_err();
        assert!(err.to_string().contains("bogus_key"));
    }

    #[test]
    fn profile_inherits_unset_fields() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".to_string(),
            Profile {
                device: Some("bq-paella".to_string()),
                flavour: Some("barebone".to_string()),
                username: Some("kupfer".to_string()),
                ..Default::default()
            },
        );
        cfg.profiles.insert(
            "custom".to_string(),
            Profile {
                parent: Some("default".to_string()),
                flavour: Some("gnome".to_string()),
                ..Default::default()
            },
        );

        let resolved = cfg.resolve_profile("custom").unwrap();
        assert_eq!(resolved.device.as_deref(), Some("bq-paella"));
        assert_eq!(resolved.flavour.as_deref(), Some("gnome"));
        assert_eq!(resolved.username.as_deref(), Some("kupfer"));
    }

    #[test]
    fn profile_cycle_is_rejected() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "a".to_string(),
            Profile {
                parent: Some("b".to_string()),
                ..Default::default()
            },
        );
        cfg.profiles.insert(
            "b".to_string(),
            Profile {
                parent: Some("a".to_string()),
                ..Default::default()
            },
        );
        assert!(cfg.resolve_profile("a").is_err());
    }

    #[test]
    fn threads_zero_means_auto() {
        let cfg = Config::default();
        assert!(cfg.threads() >= 1);
    }
}
