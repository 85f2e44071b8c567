// src/commands/packages_builder.rs

//! Wires the scheduler's [`RecipeBuilder`] seam to real chroots: picks the
//! build root per §4.5.3, mounts what that strategy needs, runs the build,
//! and collects emitted artifacts.

use std::path::PathBuf;
use std::sync::Arc;

use nix::mount::MsFlags;

use crate::chroot::{self, crossdirect, Chroot, ChrootKind, ExecInChroot};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::recipe::model::Recipe;
use crate::scheduler::{self, BuildOptions, RecipeBuilder, Strategy};

pub struct ChrootRecipeBuilder {
    pub config: Config,
    pub host_arch: String,
    pub native_chroot: Arc<Chroot>,
    /// Force a from-scratch reinitialize of the target build chroot before
    /// building, e.g. `--clean-chroot` or `build.clean_mode`.
    pub clean_chroot: bool,
}

impl ChrootRecipeBuilder {
    fn target_build_chroot(&self, target_arch: &str) -> Arc<Chroot> {
        let name = format!("build-{target_arch}");
        let path = self.config.paths.chroots.join(&name);
        chroot::get_chroot(chroot::ChrootSpec {
            name: &name,
            arch: target_arch,
            kind: ChrootKind::Build,
            path: &path,
            copy_base: None,
            extra_repos: Vec::new(),
            base_packages: chroot::default_base_packages(),
            pacman_cache_root: self.config.paths.pacman.clone(),
            packages_root: self.config.paths.packages.clone(),
        })
    }

    fn makepkg_conf_path(&self, target_arch: &str, cross: bool) -> String {
        let cross_target = if cross { Some(target_arch) } else { None };
        format!("/etc/{}", chroot::config::makepkg_conf_filename(cross_target))
    }

    fn collect_artifacts(&self, recipe: &Recipe, build_root: &Chroot) -> Result<Vec<PathBuf>> {
        let recipe_dir = build_root.path.join("recipes").join(&recipe.path);
        let mut artifacts = Vec::new();
        let entries = match std::fs::read_dir(&recipe_dir) {
            Ok(e) => e,
            Err(_) => return Ok(artifacts),
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(".pkg.tar.xz") || name.ends_with(".pkg.tar.zst") {
                artifacts.push(entry.path());
            }
        }
        Ok(artifacts)
    }
}

impl RecipeBuilder for ChrootRecipeBuilder {
    fn build(
        &self,
        recipe: &Recipe,
        target_arch: &str,
        strategy: Strategy,
        opts: &BuildOptions,
    ) -> Result<Vec<PathBuf>> {
        let target_chroot = self.target_build_chroot(target_arch);
        target_chroot.initialize(self.clean_chroot)?;
        target_chroot.activate()?;

        let env = scheduler::build_env(opts.threads, "/usr/bin/qemu-aarch64-static");
        let env_refs: Vec<(&str, &str)> = env.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let flags = scheduler::build_flags(strategy);

        let build_root: &Chroot = match strategy {
            Strategy::Cross => {
                let mount_dest = format!("chroot/{}", target_chroot.name);
                self.native_chroot
                    .mount(&target_chroot.path.to_string_lossy(), &mount_dest, None, MsFlags::MS_BIND)
                    .or_else(|err| match err {
                        Error::LeakedMount { .. } => Ok(()),
                        other => Err(other),
                    })?;
                &self.native_chroot
            }
            Strategy::Host => {
                if scheduler::wants_crossdirect(&recipe.name, &self.host_arch, target_arch, opts) {
                    self.native_chroot.initialize(false)?;
                    if !self.native_chroot.is_active() {
                        self.native_chroot.activate()?;
                    }

                    let hostspec = crossdirect::hostspec(&self.host_arch, target_arch)?;
                    let gcc_binary = format!("{hostspec}-gcc");
                    let plan = crossdirect::plan_links(&target_chroot.path, &gcc_binary);
                    crossdirect::apply_links(&plan)?;

                    let ld_linux_name = crossdirect::find_ld_linux_so(&self.native_chroot.path)?;
                    let ld_linux_link = target_chroot.path.join("lib64").join(&ld_linux_name);
                    if !ld_linux_link.exists() {
                        std::os::unix::fs::symlink(
                            PathBuf::from("/native/usr/lib").join(&ld_linux_name),
                            &ld_linux_link,
                        )?;
                    }

                    let rustc_shim = crossdirect::rustc_shim_path(&self.native_chroot.path, target_arch);
                    if rustc_shim.exists() {
                        std::fs::remove_file(&rustc_shim)?;
                    }

                    target_chroot
                        .mount(&self.native_chroot.path.to_string_lossy(), "native", None, MsFlags::MS_BIND)
                        .or_else(|err| match err {
                            Error::LeakedMount { .. } => Ok(()),
                            other => Err(other),
                        })?;
                }
                &target_chroot
            }
        };

        let config_path = self.makepkg_conf_path(target_arch, strategy == Strategy::Cross);
        build_root.run_build(&recipe.path, &config_path, flags, &env_refs)?;

        self.collect_artifacts(recipe, build_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn makepkg_conf_path_cross_uses_arch_suffixed_name() {
        let builder_path = chroot::config::makepkg_conf_filename(Some("aarch64"));
        assert_eq!(builder_path, "makepkg_cross_aarch64.conf");
    }
}
