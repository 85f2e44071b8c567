// src/chroot/config.rs

//! Renders the two config files the chroot manager writes into a chroot:
//! `etc/pacman.conf` and `etc/makepkg.conf` / `etc/makepkg_cross_<arch>.conf`.

use std::collections::BTreeMap;

/// A single `[repo]` section: `Server = <url>` with `$repo`/`$arch`
/// substituted.
#[derive(Debug, Clone)]
pub struct RepoSection {
    pub name: String,
    pub url_template: String,
}

impl RepoSection {
    pub fn resolve_url(&self, arch: &str) -> String {
        self.url_template
            .replace("$repo", &self.name)
            .replace("$arch", arch)
    }
}

/// Render `pacman.conf` for a chroot of the given `arch` with the given
/// enabled repositories (in the order given).
pub fn render_pacman_conf(arch: &str, repos: &[RepoSection]) -> String {
    let mut out = String::new();
    out.push_str("[options]\n");
    out.push_str(&format!("Architecture = {arch}\n"));
    out.push_str(&format!("CacheDir = /var/cache/pacman/{arch}\n"));
    out.push_str("SigLevel = Required DatabaseOptional\n");
    out.push_str("LocalFileSigLevel = Optional\n");
    out.push_str("ParallelDownloads = 5\n");
    out.push('\n');
    for repo in repos {
        out.push_str(&format!("[{}]\n", repo.name));
        out.push_str(&format!("Server = {}\n", repo.resolve_url(arch)));
        out.push('\n');
    }
    out
}

/// Cross-compilation parameters injected into `makepkg.conf` when
/// `cross=true`.
#[derive(Debug, Clone)]
pub struct CrossParams {
    pub target_arch: String,
    pub chost: String,
    pub cflags: String,
    pub ldflags: String,
}

/// Render a `makepkg.conf` body. When `cross` is `Some`, a `CARCH` override
/// and cross-compilation variables are injected; otherwise a plain native
/// config is produced.
pub fn render_makepkg_conf(native_arch: &str, cross: Option<&CrossParams>) -> String {
    let mut vars: BTreeMap<&str, String> = BTreeMap::new();
    match cross {
        Some(params) => {
            vars.insert("CARCH", params.target_arch.clone());
            vars.insert("CHOST", params.chost.clone());
            vars.insert("CFLAGS", params.cflags.clone());
            vars.insert("LDFLAGS", params.ldflags.clone());
        }
        None => {
            vars.insert("CARCH", native_arch.to_string());
        }
    }
    vars.insert("PKGEXT", ".pkg.tar.zst".to_string());
    vars.insert("COMPRESSZST", "(zstd -c -T0 -q -)".to_string());

    let mut out = String::new();
    for (key, value) in &vars {
        out.push_str(&format!("{key}=\"{value}\"\n"));
    }
    out
}

/// Filename for the makepkg config of a given mode, as referenced by
/// `etc/makepkg_cross_<arch>.conf` vs the default `etc/makepkg.conf`.
pub fn makepkg_conf_filename(cross_target_arch: Option<&str>) -> String {
    match cross_target_arch {
        Some(arch) => format!("makepkg_cross_{arch}.conf"),
        None => "makepkg.conf".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pacman_conf_substitutes_repo_and_arch() {
        let repos = vec![RepoSection {
            name: "core".to_string(),
            url_template: "http://mirror.example/$arch/$repo".to_string(),
        }];
        let conf = render_pacman_conf("aarch64", &repos);
        assert!(conf.contains("Architecture = aarch64"));
        assert!(conf.contains("[core]"));
        assert!(conf.contains("Server = http://mirror.example/aarch64/core"));
    }

    #[test]
    fn makepkg_conf_cross_injects_chost_and_carch() {
        let params = CrossParams {
            target_arch: "aarch64".to_string(),
            chost: "aarch64-linux-gnu".to_string(),
            cflags: "-O2".to_string(),
            ldflags: "".to_string(),
        };
        let conf = render_makepkg_conf("x86_64", Some(&params));
        assert!(conf.contains("CARCH=\"aarch64\""));
        assert!(conf.contains("CHOST=\"aarch64-linux-gnu\""));
    }

    #[test]
    fn makepkg_conf_filename_differs_by_mode() {
        assert_eq!(makepkg_conf_filename(None), "makepkg.conf");
        assert_eq!(makepkg_conf_filename(Some("aarch64")), "makepkg_cross_aarch64.conf");
    }
}
