// src/recipe/pkgbuild.rs

//! PKGBUILD metadata extraction.
//!
//! Two steps, matching the original tool's `distro/pkgbuild.py`:
//! 1. scan the raw `PKGBUILD` for a `_mode=host|cross` line without
//!    executing anything;
//! 2. run `makepkg --printsrcinfo` (via the caller-supplied executor, which
//!    is expected to run it inside a native build chroot) and parse the
//!    `key = value` stream into one [`Recipe`] per output.

use std::path::Path;

use regex::Regex;

use crate::error::{Error, Result};
use crate::recipe::model::{BuildMode, Recipe};

/// Scan a `PKGBUILD` file for its `_mode=` directive.
pub fn extract_mode(relative_path: &str, pkgbuild_contents: &str) -> Result<BuildMode> {
    let re = Regex::new(r"(?m)^_mode=(\S+)").unwrap();
    let value = re
        .captures(pkgbuild_contents)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());

    match value.and_then(BuildMode::parse) {
        Some(mode) => Ok(mode),
        None => Err(Error::InvalidRecipe {
            path: relative_path.to_string(),
            reason: match value {
                None => "missing _mode directive".to_string(),
                Some(v) => format!("invalid _mode value: {v}"),
            },
        }),
    }
}

/// Parse `makepkg --printsrcinfo` output into one or more [`Recipe`]s.
///
/// State machine: a `pkgbase` line names the shared base; each subsequent
/// `pkgname` line branches a new output, deep-copied from the base so it
/// inherits the base's dependency edges gathered so far. Dependency arrays
/// are unioned across `depends`/`makedepends`/`checkdepends`/`optdepends`,
/// stripped of version constraints (`foo>=1.0` -> `foo`) and descriptions
/// (`foo: does a thing` -> `foo`).
pub fn parse_srcinfo(relative_path: &str, srcinfo: &str) -> Result<Vec<Recipe>> {
    let repo = relative_path
        .split('/')
        .next()
        .unwrap_or(relative_path)
        .to_string();

    let new_output = |repo: &str| Recipe {
        path: relative_path.to_string(),
        repo: repo.to_string(),
        name: String::new(),
        version: String::new(),
        provides: Vec::new(),
        replaces: Vec::new(),
        depends: Vec::new(),
        mode: BuildMode::Host, // overwritten by caller before use
    };

    let mut pkgver = String::new();
    let mut pkgrel = String::new();
    let mut multi_pkgs = false;
    // Fields declared at the pkgbase level, before the first pkgname line;
    // each subpackage branch inherits a copy of these (mirrors the
    // original's `current = deepcopy(base_package)`).
    let mut base_depends: Vec<String> = Vec::new();
    let mut base_provides: Vec<String> = Vec::new();
    let mut base_replaces: Vec<String> = Vec::new();
    let mut subpackages: Vec<Recipe> = Vec::new();
    let mut current: Option<Recipe> = None;

    for raw_line in srcinfo.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(" = ") else {
            continue;
        };
        let key = key.trim();

        match key {
            "pkgbase" => multi_pkgs = true,
            "pkgname" => {
                if let Some(prev) = current.take() {
                    subpackages.push(prev);
                }
                let mut next = new_output(&repo);
                next.name = value.to_string();
                if multi_pkgs {
                    next.depends = base_depends.clone();
                    next.provides = base_provides.clone();
                    next.replaces = base_replaces.clone();
                }
                current = Some(next);
            }
            "pkgver" => pkgver = value.to_string(),
            "pkgrel" => pkgrel = value.to_string(),
            "provides" => {
                let v = strip_constraint(value);
                match &mut current {
                    Some(recipe) => recipe.provides.push(v),
                    None => base_provides.push(v),
                }
            }
            "replaces" => {
                let v = strip_constraint(value);
                match &mut current {
                    Some(recipe) => recipe.replaces.push(v),
                    None => base_replaces.push(v),
                }
            }
            "depends" | "makedepends" | "checkdepends" | "optdepends" => {
                let v = strip_constraint(value);
                match &mut current {
                    Some(recipe) => recipe.depends.push(v),
                    None => base_depends.push(v),
                }
            }
            _ => {}
        }
    }
    if let Some(last) = current.take() {
        subpackages.push(last);
    }

    if subpackages.is_empty() {
        return Err(Error::InvalidRecipe {
            path: relative_path.to_string(),
            reason: "srcinfo produced no package outputs".to_string(),
        });
    }

    let version = format!("{pkgver}-{pkgrel}");
    let mut results = Vec::with_capacity(subpackages.len());
    for mut pkg in subpackages {
        pkg.version = version.clone();
        dedup(&mut pkg.depends);
        if pkg.name.is_empty() {
            return Err(Error::InvalidRecipe {
                path: relative_path.to_string(),
                reason: "subpackage missing pkgname".to_string(),
            });
        }
        results.push(pkg);
    }

    // invariant: every subpackage shares the base's pkgver-pkgrel, which
    // holds trivially here since they all read the same `version` value,
    // but a malformed srcinfo with per-output pkgver lines would violate
    // it upstream — guard explicitly per spec invariant 1.
    for pkg in &results {
        if pkg.version != version {
            return Err(Error::InvalidRecipe {
                path: relative_path.to_string(),
                reason: format!("subpackage {} version {} differs from base {version}", pkg.name, pkg.version),
            });
        }
    }

    Ok(results)
}

fn strip_constraint(raw: &str) -> String {
    let without_desc = raw.split(':').next().unwrap_or(raw);
    let name_end = without_desc
        .find(|c: char| c == '<' || c == '>' || c == '=')
        .unwrap_or(without_desc.len());
    without_desc[..name_end].trim().to_string()
}

fn dedup(values: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    values.retain(|v| seen.insert(v.clone()));
}

/// Parse one recipe directory end-to-end given raw file contents and the
/// srcinfo text, attaching the resolved [`BuildMode`] to every output.
pub fn parse_recipe(
    relative_path: &str,
    pkgbuild_contents: &str,
    srcinfo: &str,
) -> Result<Vec<Recipe>> {
    let mode = extract_mode(relative_path, pkgbuild_contents)?;
    let mut outputs = parse_srcinfo(relative_path, srcinfo)?;
    for o in &mut outputs {
        o.mode = mode;
    }
    Ok(outputs)
}

pub fn pkgbuild_path(recipe_root: &Path, relative_path: &str) -> std::path::PathBuf {
    recipe_root.join(relative_path).join("PKGBUILD")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "\
pkgver = 1.2.3
pkgrel = 4
pkgname = hello
depends = libc.so
makedepends = gcc
";

    const MULTI: &str = "\
pkgbase = mesa
pkgver = 24.0
pkgrel = 1
pkgname = mesa
depends = libdrm>=2.4
pkgname = mesa-utils
depends = mesa
optdepends = glu: for glxgears
";

    #[test]
    fn mode_line_required() {
        assert!(extract_mode("x", "pkgname=x\n").is_err());
        assert!(matches!(
            extract_mode("x", "_mode=host\n").unwrap(),
            BuildMode::Host
        ));
        assert!(extract_mode("x", "_mode=bogus\n").is_err());
    }

    #[test]
    fn parses_single_output() {
        let outs = parse_srcinfo("main/hello", SIMPLE).unwrap();
        assert_eq!(outs.len(), 1);
        assert_eq!(outs[0].name, "hello");
        assert_eq!(outs[0].version, "1.2.3-4");
        assert_eq!(outs[0].depends, vec!["libc.so".to_string(), "gcc".to_string()]);
        assert_eq!(outs[0].repo, "main");
    }

    #[test]
    fn parses_multi_output_and_shares_version() {
        let outs = parse_srcinfo("main/mesa", MULTI).unwrap();
        assert_eq!(outs.len(), 2);
        assert_eq!(outs[0].name, "mesa");
        assert_eq!(outs[0].depends, vec!["libdrm".to_string()]);
        assert_eq!(outs[1].name, "mesa-utils");
        assert_eq!(outs[1].depends, vec!["mesa".to_string(), "glu".to_string()]);
        for o in &outs {
            assert_eq!(o.version, "24.0-1");
        }
    }

    #[test]
    fn strips_version_constraints_and_descriptions() {
        assert_eq!(strip_constraint("foo>=1.0"), "foo");
        assert_eq!(strip_constraint("foo: some description"), "foo");
        assert_eq!(strip_constraint("foo=1.0"), "foo");
        assert_eq!(strip_constraint("foo"), "foo");
    }
}
