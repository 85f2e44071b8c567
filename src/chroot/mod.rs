// src/chroot/mod.rs

//! Chroot lifecycle management: creation, activation (pseudo-filesystem
//! mounts), command execution, and teardown.
//!
//! Grounded on `original_source/chroot/abstract.py`. A process-wide registry
//! (`REGISTRY`) hands out the single live [`Chroot`] for a given name so
//! that two call sites never independently track the same mount set.

pub mod binfmt;
pub mod config;
pub mod crossdirect;
pub mod mount;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex, OnceLock};

use nix::mount::MsFlags;

use crate::error::{Error, Result};

/// What a chroot is used for. Mirrors the teacher's `BaseChroot`/
/// `BuildChroot` split plus the device-image variant named in the recipe
/// model's `device/` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChrootKind {
    Base,
    Build,
    Device,
}

/// Canonical name for the base chroot of an architecture, e.g.
/// `base-aarch64`.
pub fn base_chroot_name(arch: &str) -> String {
    format!("base-{arch}")
}

/// Default `base_packages` for a freshly-provisioned chroot, matching
/// `original_source/chroot/abstract.py`'s `Chroot.__init__` default.
pub fn default_base_packages() -> Vec<String> {
    ["base", "base-devel", "git"].iter().map(|s| s.to_string()).collect()
}

/// Relative bind-mount points that a build chroot's rootfs sync must not
/// clobber, since `activate`/the scheduler mount something there
/// afterwards. Matches spec's bind-mount-path table (`chroots`,
/// `jumpdrive`, `pacman`, `packages`, `pkgbuilds`, `images`).
const BIND_MOUNT_POINTS: &[&str] = &[
    "chroot",
    "var/cache/jumpdrive",
    "var/cache/pacman",
    "prebuilts",
    "pkgbuilds",
    "images",
];

/// Construction parameters for a not-yet-registered chroot, grouped because
/// `get_chroot` would otherwise need ten positional arguments.
pub struct ChrootSpec<'a> {
    pub name: &'a str,
    pub arch: &'a str,
    pub kind: ChrootKind,
    pub path: &'a Path,
    /// `None` means "copy from the base chroot of `arch`" unless `name`
    /// already IS that base chroot, in which case it has no base to copy
    /// from; `Some(explicit)` overrides that default.
    pub copy_base: Option<Option<String>>,
    /// Local repository names enabled in this chroot's `pacman.conf`
    /// beyond the base distro repos.
    pub extra_repos: Vec<String>,
    pub base_packages: Vec<String>,
    pub pacman_cache_root: PathBuf,
    pub packages_root: PathBuf,
}

/// A chroot environment rooted at `path`, tracking its own active mount set
/// so `deactivate` can reliably unwind exactly what `activate` set up.
pub struct Chroot {
    pub name: String,
    pub arch: String,
    pub kind: ChrootKind,
    pub path: PathBuf,
    /// Name of the base chroot this one was copied from via `rsync`, when
    /// `kind == Build`. Defaults to `base_chroot_name(arch)` when this
    /// chroot IS the base chroot, otherwise must be set explicitly.
    pub copy_base: Option<String>,
    pub extra_repos: Vec<String>,
    pub base_packages: Vec<String>,
    pub uuid: String,
    pacman_cache_root: PathBuf,
    packages_root: PathBuf,
    initialized: Mutex<bool>,
    active: Mutex<bool>,
    /// Mount points under `path`, in the order they were mounted.
    active_mounts: Mutex<Vec<PathBuf>>,
    /// Subset of `active_mounts` that `activate` set up (the fixed
    /// pseudo-filesystem set); `deactivate_core` only unwinds these, leaving
    /// e.g. a crossdirect `/native` mount intact.
    core_mounts: Mutex<Vec<PathBuf>>,
}

type Registry = Mutex<std::collections::HashMap<String, Arc<Chroot>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(std::collections::HashMap::new()))
}

/// Fetch the process-wide chroot for `spec.name`, creating it at
/// `spec.path` if this is the first lookup.
pub fn get_chroot(spec: ChrootSpec) -> Arc<Chroot> {
    let mut reg = registry().lock().unwrap();
    if let Some(existing) = reg.get(spec.name) {
        return Arc::clone(existing);
    }

    let resolved_copy_base = match spec.copy_base {
        Some(explicit) => explicit,
        None if spec.name == base_chroot_name(spec.arch) => None,
        None => Some(base_chroot_name(spec.arch)),
    };

    let chroot = Arc::new(Chroot {
        name: spec.name.to_string(),
        arch: spec.arch.to_string(),
        kind: spec.kind,
        path: spec.path.to_path_buf(),
        copy_base: resolved_copy_base,
        extra_repos: spec.extra_repos,
        base_packages: spec.base_packages,
        uuid: uuid_v4(),
        pacman_cache_root: spec.pacman_cache_root,
        packages_root: spec.packages_root,
        initialized: Mutex::new(spec.path.join("etc").is_dir()),
        active: Mutex::new(false),
        active_mounts: Mutex::new(Vec::new()),
        core_mounts: Mutex::new(Vec::new()),
    });
    reg.insert(spec.name.to_string(), Arc::clone(&chroot));
    chroot
}

/// Drop a chroot from the registry, e.g. after deleting its directory on
/// disk. Does not itself tear down mounts; call `deactivate` first.
pub fn forget_chroot(name: &str) {
    registry().lock().unwrap().remove(name);
}

fn uuid_v4() -> String {
    // Not a full RFC 4122 generator; sufficient for a process-local,
    // collision-resistant-enough tag used only for log correlation.
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{nanos:032x}")
}

impl Chroot {
    /// Bring the rootfs up to date: create it from scratch if it doesn't
    /// exist yet, or if `reset` is true. Mirrors
    /// `original_source/chroot/abstract.py::initialize` — the fixed
    /// pseudo-filesystem mounts are torn down before any rootfs surgery and
    /// restored afterwards if they were up beforehand, since pacstrap/rsync
    /// must not run against a live `/proc`, `/dev` etc.
    pub fn initialize(&self, reset: bool) -> Result<()> {
        let mut initialized = self.initialized.lock().unwrap();
        if *initialized && !reset {
            return Ok(());
        }

        let active_previously = self.is_active();
        self.deactivate_core()?;

        match &self.copy_base {
            None => {
                if reset && self.path.exists() {
                    std::fs::remove_dir_all(&self.path)?;
                }
                std::fs::create_dir_all(&self.path)?;
                self.create_base_rootfs()?;
            }
            Some(base_name) => {
                std::fs::create_dir_all(&self.path)?;
                self.create_build_rootfs(base_name, reset, active_previously)?;
            }
        }

        *initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        *self.initialized.lock().unwrap()
    }

    /// `pacstrap` a fresh base rootfs, matching
    /// `original_source/chroot/base.py::BaseChroot.create_rootfs`: write
    /// `pacman.conf` and mount the pacman cache before pacstrap runs so it
    /// resolves against the configured repos and a warm cache.
    fn create_base_rootfs(&self) -> Result<()> {
        self.write_pacman_conf()?;
        self.mount_pacman_cache()?;

        let status = Command::new("pacstrap")
            .arg("-C")
            .arg(self.path.join("etc/pacman.conf"))
            .arg("-c")
            .arg("-G")
            .arg(&self.path)
            .args(&self.base_packages)
            .arg("--needed")
            .arg("--overwrite=*")
            .arg("-yyuu")
            .status()
            .map_err(|e| Error::ChrootInitFailed {
                name: self.name.clone(),
                reason: e.to_string(),
            })?;
        if !status.success() {
            return Err(Error::ChrootInitFailed {
                name: self.name.clone(),
                reason: format!("pacstrap exited with {status}"),
            });
        }
        Ok(())
    }

    /// Sync a build chroot's rootfs from its base and bring its package set
    /// up to date, matching
    /// `original_source/chroot/build.py::BuildChroot.create_rootfs`.
    fn create_build_rootfs(&self, base_name: &str, reset: bool, active_previously: bool) -> Result<()> {
        let base = registry()
            .lock()
            .unwrap()
            .get(base_name)
            .cloned()
            .ok_or_else(|| Error::ChrootInitFailed {
                name: self.name.clone(),
                reason: format!("base chroot {base_name} not registered"),
            })?;

        if reset || !self.path.join("usr/bin").is_dir() {
            base.initialize(false)?;
            self.rsync_from_base(&base)?;
        }

        if !self.extra_repos.is_empty() {
            self.mount_packages()?;
        }
        self.mount_pacman_cache()?;
        self.write_pacman_conf()?;

        self.activate()?;
        self.try_install_packages(&self.base_packages, true, false)?;
        self.deactivate_core()?;

        self.patch_makepkg_euid()?;
        self.write_makepkg_conf(None)?;

        if active_previously {
            self.activate()?;
        }
        Ok(())
    }

    /// `rsync -a --delete` from the base chroot's rootfs, excluding the
    /// standard bind-mount points so a later `activate`/mount call never
    /// finds its mountpoint clobbered by a stale copy underneath.
    fn rsync_from_base(&self, base: &Chroot) -> Result<()> {
        let mut cmd = Command::new("rsync");
        cmd.arg("-a").arg("--delete").arg("-q").arg("-W").arg("-x");
        for excluded in BIND_MOUNT_POINTS {
            cmd.arg("--exclude").arg(excluded);
        }
        let mut src = base.path.to_string_lossy().to_string();
        if !src.ends_with('/') {
            src.push('/');
        }
        let mut dest = self.path.to_string_lossy().to_string();
        if !dest.ends_with('/') {
            dest.push('/');
        }
        cmd.arg(src).arg(dest);

        let status = cmd.status().map_err(|e| Error::ChrootInitFailed {
            name: self.name.clone(),
            reason: e.to_string(),
        })?;
        if !status.success() {
            return Err(Error::ChrootInitFailed {
                name: self.name.clone(),
                reason: format!("rsync from {} exited with {status}", base.name),
            });
        }
        Ok(())
    }

    /// `makepkg` refuses to run as root; build chroots run it under
    /// `fakeroot`-adjacent conditions where `EUID` still reads `0`, so the
    /// shipped check is patched the way upstream patches it.
    fn patch_makepkg_euid(&self) -> Result<()> {
        let makepkg_bin = self.path.join("usr/bin/makepkg");
        if !makepkg_bin.is_file() {
            return Ok(());
        }
        let data = std::fs::read_to_string(&makepkg_bin)?;
        let patched = data.replace("EUID == 0", "EUID == -1");
        if patched != data {
            std::fs::write(&makepkg_bin, patched)?;
        }
        Ok(())
    }

    fn write_pacman_conf(&self) -> Result<()> {
        let repos: Vec<config::RepoSection> = self
            .extra_repos
            .iter()
            .map(|name| config::RepoSection {
                name: name.clone(),
                url_template: format!("file://{}/$arch/$repo", self.packages_root.display()),
            })
            .collect();
        let contents = config::render_pacman_conf(&self.arch, &repos);
        std::fs::create_dir_all(self.path.join("etc"))?;
        std::fs::write(self.path.join("etc/pacman.conf"), contents)?;
        Ok(())
    }

    /// Write `makepkg.conf` (native) or `makepkg_cross_<arch>.conf` (cross),
    /// returning the written file's path relative to the chroot root.
    pub fn write_makepkg_conf(&self, cross: Option<&config::CrossParams>) -> Result<String> {
        let contents = config::render_makepkg_conf(&self.arch, cross);
        let filename = config::makepkg_conf_filename(cross.map(|c| c.target_arch.as_str()));
        std::fs::create_dir_all(self.path.join("etc"))?;
        std::fs::write(self.path.join("etc").join(&filename), contents)?;
        Ok(format!("etc/{filename}"))
    }

    fn mount_pacman_cache(&self) -> Result<()> {
        let dest = format!("var/cache/pacman/{}", self.arch);
        let src = self.pacman_cache_root.join(&self.arch);
        std::fs::create_dir_all(&src)?;
        self.mount(&src.to_string_lossy(), &dest, None, MsFlags::MS_BIND)
            .or_else(|err| match err {
                Error::LeakedMount { .. } => Ok(()),
                other => Err(other),
            })
    }

    fn mount_packages(&self) -> Result<()> {
        std::fs::create_dir_all(&self.packages_root)?;
        self.mount(&self.packages_root.to_string_lossy(), "prebuilts", None, MsFlags::MS_BIND)
            .or_else(|err| match err {
                Error::LeakedMount { .. } => Ok(()),
                other => Err(other),
            })
    }

    /// `pacman -S` the given packages into this (active) chroot, matching
    /// `original_source/chroot/abstract.py::try_install_packages`: refresh
    /// the sync databases first if asked, and on failure fall back to a
    /// serial per-package install when `allow_fail` is set.
    fn try_install_packages(&self, packages: &[String], refresh: bool, allow_fail: bool) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        if refresh {
            let output = self.run_cmd("pacman -Syy --noconfirm", &[], None)?;
            if !output.status.success() {
                return Err(Error::ChrootInitFailed {
                    name: self.name.clone(),
                    reason: format!("pacman -Syy failed: {}", String::from_utf8_lossy(&output.stderr)),
                });
            }
        }

        let script = format!("pacman -S --noconfirm --needed --overwrite=/* -y {}", packages.join(" "));
        let output = self.run_cmd(&script, &[], None)?;
        if output.status.success() {
            return Ok(());
        }
        if !allow_fail {
            return Err(Error::ChrootInitFailed {
                name: self.name.clone(),
                reason: format!("pacman -S failed: {}", String::from_utf8_lossy(&output.stderr)),
            });
        }
        for package in packages {
            let script = format!("pacman -S --noconfirm --needed --overwrite=/* -y {package}");
            let _ = self.run_cmd(&script, &[], None);
        }
        Ok(())
    }

    /// Mount the fixed pseudo-filesystem set. No-op if already active.
    pub fn activate(&self) -> Result<()> {
        let mut active = self.active.lock().unwrap();
        if *active {
            return Ok(());
        }
        let mut core_mounts = self.core_mounts.lock().unwrap();
        for basic in mount::basic_mounts() {
            let dest = self.path.join(basic.destination.trim_start_matches('/'));
            self.mount_at(&dest, basic.source, basic.fs_type, basic.flags)?;
            core_mounts.push(dest);
        }
        *active = true;
        Ok(())
    }

    /// Bind/pseudo-mount `source` at `relative_destination` (relative to
    /// this chroot's root) and track it for teardown. Detects the leaked-
    /// mount case (already mounted on the host under a path we don't track)
    /// up front, matching spec invariant on mount accounting.
    pub fn mount(
        &self,
        source: &str,
        relative_destination: &str,
        fs_type: Option<&str>,
        flags: MsFlags,
    ) -> Result<()> {
        let dest = self.path.join(relative_destination.trim_start_matches('/'));
        self.mount_at(&dest, source, fs_type, flags)
    }

    fn mount_at(
        &self,
        dest: &Path,
        source: &str,
        fs_type: Option<&str>,
        flags: MsFlags,
    ) -> Result<()> {
        let mut tracked = self.active_mounts.lock().unwrap();
        if mount::is_mounted(dest) && !tracked.contains(&dest.to_path_buf()) {
            return Err(Error::LeakedMount {
                name: self.name.clone(),
                path: dest.display().to_string(),
            });
        }
        mount::do_mount(source, dest, fs_type, flags)?;
        tracked.push(dest.to_path_buf());
        Ok(())
    }

    /// Unmount one tracked mount point.
    pub fn umount(&self, relative_destination: &str) -> Result<()> {
        let dest = self.path.join(relative_destination.trim_start_matches('/'));
        let mut tracked = self.active_mounts.lock().unwrap();
        if !tracked.contains(&dest) {
            return Err(Error::GhostMount {
                name: self.name.clone(),
                path: dest.display().to_string(),
            });
        }
        mount::do_umount(&dest)?;
        tracked.retain(|p| p != &dest);
        Ok(())
    }

    /// Unmount only the fixed pseudo-filesystem set `activate` mounted, in
    /// reverse-lexicographic order with `/proc` forced last (it underlies
    /// `/sys`'s kernel info on some configurations and has historically
    /// been the one that wedges if torn down early). Additional mounts such
    /// as a crossdirect `/native` bind are intentionally left intact —
    /// rootfs surgery (pacstrap/rsync) only needs the pseudo-filesystems out
    /// of the way, matching `original_source/chroot/abstract.py::deactivate_core`.
    pub fn deactivate_core(&self) -> Result<()> {
        let mut core = self.core_mounts.lock().unwrap();
        if core.is_empty() {
            *self.active.lock().unwrap() = false;
            return Ok(());
        }
        let proc_path = self.path.join("proc");
        let mut paths: Vec<PathBuf> = core.drain(..).collect();
        paths.sort();
        paths.reverse();
        let mut deferred_proc = false;
        for path in &paths {
            if *path == proc_path {
                deferred_proc = true;
                continue;
            }
            mount::do_umount(path)?;
        }
        if deferred_proc {
            mount::do_umount(&proc_path)?;
        }
        drop(core);

        let mut tracked = self.active_mounts.lock().unwrap();
        tracked.retain(|p| !paths.contains(p));
        drop(tracked);

        *self.active.lock().unwrap() = false;
        Ok(())
    }

    /// Unmount everything tracked (the core pseudo-filesystem set plus any
    /// extra mounts such as a crossdirect `/native` bind), in
    /// reverse-lexicographic order with `/proc` forced last. Matches
    /// `original_source/chroot/abstract.py::deactivate`.
    pub fn deactivate(&self) -> Result<()> {
        let mut tracked = self.active_mounts.lock().unwrap();
        let proc_path = self.path.join("proc");
        let mut paths: Vec<PathBuf> = tracked.drain(..).collect();
        paths.sort();
        paths.reverse();
        let mut deferred_proc = false;
        for path in &paths {
            if *path == proc_path {
                deferred_proc = true;
                continue;
            }
            mount::do_umount(path)?;
        }
        if deferred_proc {
            mount::do_umount(&proc_path)?;
        }
        drop(tracked);

        self.core_mounts.lock().unwrap().clear();
        *self.active.lock().unwrap() = false;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        *self.active.lock().unwrap()
    }

    pub fn active_mount_paths(&self) -> HashSet<PathBuf> {
        self.active_mounts.lock().unwrap().iter().cloned().collect()
    }

    /// Run `script` inside the chroot as `/bin/bash -c <script>`, with
    /// `env` variables exported via `/usr/bin/env`, optionally changing to
    /// `cwd` first (wrapped as `cd <cwd> && ( <script> )` so a failing `cd`
    /// still surfaces as a non-zero exit instead of silently running in the
    /// wrong directory).
    pub fn run_cmd(
        &self,
        script: &str,
        env: &[(&str, &str)],
        cwd: Option<&str>,
    ) -> Result<std::process::Output> {
        if !self.is_active() {
            return Err(Error::ChrootInactive {
                name: self.name.clone(),
            });
        }

        let wrapped = match cwd {
            Some(dir) => format!("cd {} && ( {} )", shell_quote(dir), script),
            None => script.to_string(),
        };

        let mut cmd = Command::new("chroot");
        cmd.arg(&self.path).arg("/usr/bin/env");
        for (key, value) in env {
            cmd.arg(format!("{key}={value}"));
        }
        cmd.arg("/bin/bash").arg("-c").arg(&wrapped);

        cmd.output().map_err(|e| Error::ChrootInitFailed {
            name: self.name.clone(),
            reason: e.to_string(),
        })
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Single seam for running commands inside a native build chroot, so the
/// recipe discovery layer doesn't need to know how a chroot is activated or
/// addressed.
pub trait ExecInChroot {
    /// Run `makepkg --printsrcinfo` for the recipe at `relative_path`
    /// (relative to the mounted recipes tree) and return its stdout.
    fn printsrcinfo(&self, relative_path: &str) -> Result<String>;

    /// Run `makepkg --packagelist` against `config_path` for the recipe at
    /// `relative_path`, returning one expected output filename per line.
    fn package_list(&self, relative_path: &str, config_path: &str) -> Result<Vec<String>>;

    /// Run the full build for the recipe at `relative_path` using
    /// `config_path`, with `extra_flags` appended to the invocation (e.g.
    /// `--nodeps --holdver` for cross builds, `--syncdeps --holdver`
    /// otherwise) and `env` exported into the chroot.
    fn run_build(
        &self,
        relative_path: &str,
        config_path: &str,
        extra_flags: &[&str],
        env: &[(&str, &str)],
    ) -> Result<()>;
}

impl ExecInChroot for Chroot {
    fn printsrcinfo(&self, relative_path: &str) -> Result<String> {
        let cwd = format!("/recipes/{relative_path}");
        let output = self.run_cmd("makepkg --printsrcinfo", &[], Some(&cwd))?;
        if !output.status.success() {
            return Err(Error::InvalidRecipe {
                path: relative_path.to_string(),
                reason: format!(
                    "makepkg --printsrcinfo exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn package_list(&self, relative_path: &str, config_path: &str) -> Result<Vec<String>> {
        let cwd = format!("/recipes/{relative_path}");
        let script = format!(
            "makepkg --config {} --nobuild --noprepare --skippgpcheck --packagelist",
            shell_quote(config_path)
        );
        let output = self.run_cmd(&script, &[], Some(&cwd))?;
        if !output.status.success() {
            return Err(Error::BuildFailed {
                recipe: relative_path.to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect())
    }

    fn run_build(
        &self,
        relative_path: &str,
        config_path: &str,
        extra_flags: &[&str],
        env: &[(&str, &str)],
    ) -> Result<()> {
        let cwd = format!("/recipes/{relative_path}");
        let mut script = format!(
            "makepkg --config {} --skippgpcheck --needed --noconfirm --ignorearch",
            shell_quote(config_path)
        );
        for flag in extra_flags {
            script.push(' ');
            script.push_str(flag);
        }
        let output = self.run_cmd(&script, env, Some(&cwd))?;
        if !output.status.success() {
            return Err(Error::BuildFailed {
                recipe: relative_path.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn spec<'a>(name: &'a str, arch: &'a str, kind: ChrootKind, path: &'a Path, copy_base: Option<Option<String>>) -> ChrootSpec<'a> {
        ChrootSpec {
            name,
            arch,
            kind,
            path,
            copy_base,
            extra_repos: Vec::new(),
            base_packages: default_base_packages(),
            pacman_cache_root: path.join("pacman-cache"),
            packages_root: path.join("packages"),
        }
    }

    #[test]
    fn copy_base_defaults_to_base_chroot_unless_self() {
        let dir = tempdir().unwrap();
        let base = get_chroot(spec(
            &base_chroot_name("aarch64"),
            "aarch64",
            ChrootKind::Base,
            dir.path(),
            None,
        ));
        assert_eq!(base.copy_base, None);
        forget_chroot(&base.name);

        let dir2 = tempdir().unwrap();
        let build = get_chroot(spec("build-aarch64", "aarch64", ChrootKind::Build, dir2.path(), None));
        assert_eq!(build.copy_base, Some(base_chroot_name("aarch64")));
        forget_chroot(&build.name);
    }

    #[test]
    fn registry_returns_same_instance_for_same_name() {
        let dir = tempdir().unwrap();
        let a = get_chroot(spec("dup-test", "x86_64", ChrootKind::Build, dir.path(), None));
        let b = get_chroot(spec("dup-test", "x86_64", ChrootKind::Build, dir.path(), None));
        assert!(Arc::ptr_eq(&a, &b));
        forget_chroot("dup-test");
    }

    #[test]
    fn run_cmd_rejects_inactive_chroot() {
        let dir = tempdir().unwrap();
        let chroot = get_chroot(spec("inactive-test", "x86_64", ChrootKind::Build, dir.path(), None));
        let err = chroot.run_cmd("true", &[], None).unwrap_err();
        assert!(matches!(err, Error::ChrootInactive { .. }));
        forget_chroot("inactive-test");
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("a'b"), "'a'\\''b'");
    }

    #[test]
    fn deactivate_core_leaves_extra_mounts_tracked() {
        let dir = tempdir().unwrap();
        let chroot = get_chroot(spec("core-vs-extra-test", "x86_64", ChrootKind::Build, dir.path(), None));
        chroot
            .active_mounts
            .lock()
            .unwrap()
            .push(chroot.path.join("native"));
        chroot.deactivate_core().unwrap();
        assert!(chroot.active_mounts.lock().unwrap().contains(&chroot.path.join("native")));
        assert!(!chroot.is_active());
        forget_chroot("core-vs-extra-test");
    }
}
