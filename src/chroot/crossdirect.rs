// src/chroot/crossdirect.rs

//! Wires a native-arch chroot into a foreign-arch build chroot via
//! `crossdirect`, so compilers invoked inside the target chroot transparently
//! run through qemu-user emulation backed by the native toolchain.
//!
//! Grounded on `original_source/chroot/build.py::mount_crossdirect` and
//! `constants.py`'s `GCC_HOSTSPECS`/`CROSSDIRECT_PKGS` tables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Packages installed into the native chroot before it is mounted into a
/// foreign chroot as `/native`.
pub const CROSSDIRECT_PKGS: &[&str] = &[
    "crossdirect",
    "qemu-user-static-bin",
    "binfmt-qemu-static-all-arch",
];

/// `host_arch -> target_arch -> gcc hostspec prefix`, e.g.
/// `x86_64-pc-linux-gnu` or `aarch64-linux-gnu`.
pub fn gcc_hostspecs() -> HashMap<&'static str, HashMap<&'static str, &'static str>> {
    let mut table = HashMap::new();
    table.insert(
        "x86_64",
        HashMap::from([
            ("x86_64", "x86_64-pc-linux-gnu"),
            ("aarch64", "aarch64-linux-gnu"),
        ]),
    );
    table.insert("aarch64", HashMap::from([("aarch64", "aarch64-unknown-linux-gnu")]));
    table
}

pub fn hostspec(host_arch: &str, target_arch: &str) -> Result<&'static str> {
    gcc_hostspecs()
        .get(host_arch)
        .and_then(|by_target| by_target.get(target_arch))
        .copied()
        .ok_or_else(|| Error::ChrootInitFailed {
            name: format!("crossdirect-{host_arch}-{target_arch}"),
            reason: format!("no gcc hostspec known for {host_arch} -> {target_arch}"),
        })
}

/// The symlinks `mount_crossdirect` must ensure exist inside the target
/// chroot before `/native` is bind-mounted in: `<target>/lib64/<cc>` ->
/// the native chroot's cross-gcc binary name, `<target>/lib64` -> `lib`,
/// `<target>/include` -> `usr/include`, all relative to `/native`.
pub struct CrossdirectLinks {
    pub cc_symlink: (PathBuf, String),
    pub lib64_symlink: (PathBuf, String),
    pub include_symlink: (PathBuf, String),
}

/// Compute the symlink plan for wiring `target_chroot_path` against a
/// native chroot providing cross-compiler `gcc_binary_name` (the `<hostspec>-gcc`
/// binary name, resolved via [`hostspec`]).
pub fn plan_links(target_chroot_path: &Path, gcc_binary_name: &str) -> CrossdirectLinks {
    let cc_name = gcc_binary_name.trim_end_matches("-gcc").to_string() + "-cc";
    CrossdirectLinks {
        cc_symlink: (target_chroot_path.join("lib64").join(&cc_name), gcc_binary_name.to_string()),
        lib64_symlink: (target_chroot_path.join("lib64"), "lib".to_string()),
        include_symlink: (target_chroot_path.join("include"), "usr/include".to_string()),
    }
}

/// Create any of `plan`'s symlinks that don't already exist. Idempotent,
/// matching the teacher's `if not os.path.exists(target): symlink(...)`.
pub fn apply_links(plan: &CrossdirectLinks) -> Result<()> {
    for (target, source) in [
        &plan.cc_symlink,
        &plan.lib64_symlink,
        &plan.include_symlink,
    ] {
        if target.exists() {
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::os::unix::fs::symlink(source, target)?;
    }
    Ok(())
}

/// Find the dynamic linker (`ld-linux-*.so*`) shipped by the native
/// chroot's glibc, to be symlinked into the target chroot's `lib64/`.
pub fn find_ld_linux_so(native_chroot_path: &Path) -> Result<String> {
    let lib_dir = native_chroot_path.join("usr").join("lib");
    let entries = std::fs::read_dir(&lib_dir)?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with("ld-linux-") {
            return Ok(name);
        }
    }
    Err(Error::ExternalToolMissing {
        tool: format!("ld-linux-*.so in {}", lib_dir.display()),
    })
}

/// Path to crossdirect's rustc shim inside the native chroot, which must be
/// removed so cross-builds fall through to the real cross-rustc instead of
/// qemu-emulating the native one.
pub fn rustc_shim_path(native_chroot_path: &Path, target_arch: &str) -> PathBuf {
    native_chroot_path
        .join("usr/lib/crossdirect")
        .join(target_arch)
        .join("rustc")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostspec_known_pairs() {
        assert_eq!(hostspec("x86_64", "aarch64").unwrap(), "aarch64-linux-gnu");
        assert_eq!(hostspec("x86_64", "x86_64").unwrap(), "x86_64-pc-linux-gnu");
    }

    #[test]
    fn hostspec_rejects_unknown_pair() {
        assert!(hostspec("aarch64", "x86_64").is_err());
    }

    #[test]
    fn plan_links_targets_lib64_and_include() {
        let plan = plan_links(Path::new("/chroots/build-aarch64"), "aarch64-linux-gnu-gcc");
        assert_eq!(
            plan.cc_symlink.0,
            Path::new("/chroots/build-aarch64/lib64/aarch64-linux-gnu-cc")
        );
        assert_eq!(plan.lib64_symlink.1, "lib");
        assert_eq!(plan.include_symlink.1, "usr/include");
    }
}
