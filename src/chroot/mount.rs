// src/chroot/mount.rs

//! Low-level mount/unmount primitives and the fixed pseudo-filesystem set
//! mounted by `activate()`.
//!
//! Order matters: `BASIC_MOUNTS` is an ordered list (not a map) so that
//! `/proc` is always mounted first and, per spec invariant 4, unmounted
//! last.

use std::path::Path;

use nix::mount::{mount as nix_mount, umount as nix_umount, MsFlags};

use crate::error::{Error, Result};

pub struct BasicMount {
    pub destination: &'static str,
    pub source: &'static str,
    pub fs_type: Option<&'static str>,
    pub flags: MsFlags,
}

/// Mirrors `original_source/chroot/helpers.py::BASIC_MOUNTS`. `/proc` is
/// first in this list by construction; callers must preserve iteration
/// order.
pub fn basic_mounts() -> Vec<BasicMount> {
    vec![
        BasicMount {
            destination: "/proc",
            source: "proc",
            fs_type: Some("proc"),
            flags: MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC | MsFlags::MS_NODEV,
        },
        BasicMount {
            destination: "/sys",
            source: "sys",
            fs_type: Some("sysfs"),
            flags: MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC | MsFlags::MS_NODEV | MsFlags::MS_RDONLY,
        },
        BasicMount {
            destination: "/dev",
            source: "udev",
            fs_type: Some("devtmpfs"),
            flags: MsFlags::MS_NOSUID,
        },
        BasicMount {
            destination: "/dev/pts",
            source: "devpts",
            fs_type: Some("devpts"),
            flags: MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC,
        },
        BasicMount {
            destination: "/dev/shm",
            source: "shm",
            fs_type: Some("tmpfs"),
            flags: MsFlags::MS_NOSUID | MsFlags::MS_NODEV,
        },
        BasicMount {
            destination: "/run",
            source: "/run",
            fs_type: None,
            flags: MsFlags::MS_BIND,
        },
        BasicMount {
            destination: "/etc/resolv.conf",
            source: "/etc/resolv.conf",
            fs_type: None,
            flags: MsFlags::MS_BIND,
        },
    ]
}

/// Bind-mount or pseudo-filesystem-mount `source` at `destination`. Creates
/// `destination` (as a directory or an empty file, matching `source`'s
/// kind) if it does not exist.
pub fn do_mount(
    source: &str,
    destination: &Path,
    fs_type: Option<&str>,
    flags: MsFlags,
) -> Result<()> {
    if fs_type.is_none() || flags.contains(MsFlags::MS_BIND) {
        if Path::new(source).is_file() {
            if let Some(parent) = destination.parent() {
                std::fs::create_dir_all(parent)?;
            }
            if !destination.exists() {
                std::fs::write(destination, b"")?;
            }
        } else {
            std::fs::create_dir_all(destination)?;
        }
    } else {
        std::fs::create_dir_all(destination)?;
    }

    nix_mount(Some(source), destination, fs_type, flags, None::<&str>).map_err(|errno| {
        Error::MountFailed {
            mount_source: source.to_string(),
            destination: destination.display().to_string(),
            reason: errno.to_string(),
        }
    })
}

pub fn do_umount(destination: &Path) -> Result<()> {
    nix_umount(destination).map_err(|errno| Error::MountFailed {
        mount_source: "(umount)".to_string(),
        destination: destination.display().to_string(),
        reason: errno.to_string(),
    })
}

/// Whether the host kernel reports an active mount at `path`, consulting
/// `/proc/self/mountinfo` rather than shelling out to `findmnt` (same
/// information source, no subprocess).
pub fn is_mounted(path: &Path) -> bool {
    let Ok(mountinfo) = std::fs::read_to_string("/proc/self/mountinfo") else {
        return false;
    };
    let target = path.to_string_lossy();
    mountinfo
        .lines()
        .filter_map(|line| line.split_whitespace().nth(4))
        .any(|mount_point| mount_point == target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proc_is_first_and_resolv_conf_last() {
        let mounts = basic_mounts();
        assert_eq!(mounts[0].destination, "/proc");
        assert_eq!(mounts.last().unwrap().destination, "/etc/resolv.conf");
    }

    #[test]
    fn reverse_lexicographic_unmount_puts_proc_last() {
        let mut paths: Vec<&str> = basic_mounts().iter().map(|m| m.destination).collect();
        paths.sort();
        paths.reverse();
        // lexicographically "/sys" > "/run" > "/proc" > "/etc/resolv.conf" > "/dev/shm" > "/dev/pts" > "/dev"
        // so naive reverse-lex unmount would NOT put /proc last; callers
        // must special-case /proc explicitly (see chroot::Chroot::deactivate).
        assert_ne!(paths.last().unwrap(), &"/proc");
    }
}
