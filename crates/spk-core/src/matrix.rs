//! Expansion of the requested selectors into packages, and the driver
//! that builds them.
//!
//! Binaries are compiled once per architecture family. For each DSM
//! version and family the inner payload is built once, then wrapped in one
//! outer package per platform label of the family.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::path::PathBuf;

use spk_schema::{DsmVersion, GoArch, PackageVariant, check_build_base};
use tracing::info;

use crate::assets::AssetStore;
use crate::composer::write_package;
use crate::error::{Result, SpkError};
use crate::options::{BuildOptions, BuildParameters, OutputTarget};
use crate::payload::assemble_inner;
use crate::resolver::Resolver;
use crate::toolchain::{Binaries, Toolchain};

/// The validated set of packages one run will produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    dsms: Vec<DsmVersion>,
    archs: Vec<GoArch>,
}

impl BuildPlan {
    /// Expand and validate the selectors in `options`.
    ///
    /// # Errors
    ///
    /// Returns [`SpkError::Config`] when a single output file is named but
    /// more than one package would be produced, or when an explicit build
    /// number base is too large.
    pub fn new(options: &BuildOptions) -> Result<Self> {
        if let Some(base) = options.spk_build {
            check_build_base(base).map_err(SpkError::Config)?;
        }

        let plan = Self {
            dsms: options.dsm.expand(),
            archs: options.arch.expand(),
        };

        if let OutputTarget::File(path) = &options.output {
            let count = plan.package_count();
            if count > 1 {
                return Err(SpkError::Config(format!(
                    "-o {} names a single file but {count} packages would be built; \
                     pass a directory instead",
                    path.display()
                )));
            }
        }
        Ok(plan)
    }

    /// DSM versions, in build order.
    pub fn dsms(&self) -> &[DsmVersion] {
        &self.dsms
    }

    /// Architecture families, in build order.
    pub fn archs(&self) -> &[GoArch] {
        &self.archs
    }

    /// Every package of the plan, in output order.
    pub fn variants(&self) -> Vec<PackageVariant> {
        self.dsms
            .iter()
            .flat_map(|&dsm| {
                self.archs.iter().flat_map(move |&arch| {
                    arch.platforms().iter().map(move |&platform| PackageVariant {
                        dsm,
                        arch,
                        platform,
                    })
                })
            })
            .collect()
    }

    /// Number of packages the plan produces.
    pub fn package_count(&self) -> usize {
        self.dsms.len() * self.archs.iter().map(|a| a.platforms().len()).sum::<usize>()
    }
}

/// Builds every package of a plan.
pub struct Packager<'a> {
    options: &'a BuildOptions,
    params: &'a BuildParameters,
    toolchain: &'a dyn Toolchain,
    assets: &'a dyn AssetStore,
}

impl std::fmt::Debug for Packager<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packager")
            .field("options", self.options)
            .field("params", self.params)
            .finish_non_exhaustive()
    }
}

impl<'a> Packager<'a> {
    /// A packager for one run.
    pub fn new(
        options: &'a BuildOptions,
        params: &'a BuildParameters,
        toolchain: &'a dyn Toolchain,
        assets: &'a dyn AssetStore,
    ) -> Self {
        Self {
            options,
            params,
            toolchain,
            assets,
        }
    }

    /// Build every package of `plan` and return the written paths in
    /// order. Stops at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`SpkError::Io`] if the output directory cannot be created,
    /// or the first build, asset, archive or write error.
    pub fn run(&self, plan: &BuildPlan) -> Result<Vec<PathBuf>> {
        if let OutputTarget::Directory(dir) = &self.options.output {
            fs::create_dir_all(dir).map_err(|e| SpkError::io(dir, e))?;
        }

        let mut written = Vec::with_capacity(plan.package_count());
        let mut built: BTreeMap<GoArch, Binaries> = BTreeMap::new();
        for &dsm in plan.dsms() {
            for &arch in plan.archs() {
                let binaries = match built.entry(arch) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => {
                        info!(arch = %arch, "building binaries");
                        e.insert(Binaries::build(self.toolchain, arch, &self.params.version)?)
                    }
                };
                let inner = assemble_inner(
                    self.params,
                    dsm,
                    binaries,
                    self.options.compression,
                    self.assets,
                )?;

                for &platform in arch.platforms() {
                    let variant = PackageVariant {
                        dsm,
                        arch,
                        platform,
                    };
                    written.push(write_package(
                        self.params,
                        &variant,
                        &inner,
                        self.assets,
                        &self.options.output,
                    )?);
                }
            }
        }
        Ok(written)
    }
}

/// Run a whole build: validate the plan, resolve release metadata from
/// the source tree, then build every package.
///
/// The plan is validated before any collaborator runs, so a bad flag
/// combination fails without side effects.
///
/// # Errors
///
/// Returns the first configuration, resolution, build or write error.
pub fn build_packages(
    options: &BuildOptions,
    toolchain: &dyn Toolchain,
    assets: &dyn AssetStore,
) -> Result<Vec<PathBuf>> {
    let plan = BuildPlan::new(options)?;

    let resolver = Resolver::new(&options.source_dir).with_git(options.git.clone());
    let version = resolver.version_info()?;
    let create_time = resolver.commit_time()?;
    info!(version = %version.short, packages = plan.package_count(), "resolved release");

    let params = BuildParameters::new(
        create_time,
        version,
        options.spk_build,
        options.for_package_center,
    )?;
    Packager::new(options, &params, toolchain, assets).run(&plan)
}
