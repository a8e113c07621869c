//! Immutable configuration of one builder invocation.
//!
//! Flags are parsed once at startup into [`BuildOptions`]; once release
//! metadata is resolved, [`BuildParameters`] captures what every package of
//! the run shares. Both are passed down by reference and never mutated.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use spk_schema::{ArchSelector, Compression, DsmSelector, VersionInfo, check_build_base};

use crate::archive::truncate_to_second;
use crate::error::{Result, SpkError};

/// Where finished packages go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    /// The working directory, under each package's own file name.
    #[default]
    CurrentDir,
    /// A directory, under each package's own file name.
    Directory(PathBuf),
    /// Exactly this file. Only valid when one package is produced.
    File(PathBuf),
}

impl OutputTarget {
    /// Where a package called `filename` is written.
    pub fn resolve(&self, filename: &str) -> PathBuf {
        match self {
            Self::CurrentDir => PathBuf::from(filename),
            Self::Directory(dir) => dir.join(filename),
            Self::File(path) => path.clone(),
        }
    }
}

impl From<&Path> for OutputTarget {
    /// An empty path is the working directory, a path ending in `.spk` is an
    /// exact file, and anything else is a directory.
    fn from(path: &Path) -> Self {
        if path.as_os_str().is_empty() {
            Self::CurrentDir
        } else if path.to_string_lossy().ends_with(".spk") {
            Self::File(path.to_path_buf())
        } else {
            Self::Directory(path.to_path_buf())
        }
    }
}

/// Everything the caller asked for.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// DSM versions to target.
    pub dsm: DsmSelector,
    /// Architecture families to target.
    pub arch: ArchSelector,
    /// Compression of the inner payload.
    pub compression: Compression,
    /// Build for Synology's Package Center rather than sideloading.
    pub for_package_center: bool,
    /// Root of the Tailscale source checkout.
    pub source_dir: PathBuf,
    /// Destination of the finished packages.
    pub output: OutputTarget,
    /// Override of the build-ordinal base; derived from the version if unset.
    pub spk_build: Option<u64>,
    /// Go toolchain executable.
    pub go: OsString,
    /// Version-control executable.
    pub git: OsString,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            dsm: DsmSelector::default(),
            arch: ArchSelector::default(),
            compression: Compression::default(),
            for_package_center: false,
            source_dir: PathBuf::from("."),
            output: OutputTarget::default(),
            spk_build: None,
            go: OsString::from("go"),
            git: OsString::from("git"),
        }
    }
}

/// Release metadata shared by every package of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildParameters {
    /// Package creation time, whole seconds.
    pub create_time: DateTime<Utc>,
    /// The release being packaged.
    pub version: VersionInfo,
    /// Base of the package build number; DSM offsets are added per variant.
    pub spk_build_base: u64,
    /// Build for Synology's Package Center rather than sideloading.
    pub for_package_center: bool,
}

impl BuildParameters {
    /// Assemble parameters. `create_time` is truncated to whole seconds and
    /// `spk_build` falls back to the version's build ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`SpkError::Config`] if the base is too large to number a
    /// package for every DSM version.
    pub fn new(
        create_time: DateTime<Utc>,
        version: VersionInfo,
        spk_build: Option<u64>,
        for_package_center: bool,
    ) -> Result<Self> {
        let spk_build_base = check_build_base(spk_build.unwrap_or(version.build_ordinal))
            .map_err(|reason| SpkError::Config(format!("{reason} (version {})", version.short)))?;
        Ok(Self {
            create_time: truncate_to_second(create_time),
            spk_build_base,
            version,
            for_package_center,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_output_target_classification() {
        assert_eq!(OutputTarget::from(Path::new("")), OutputTarget::CurrentDir);
        assert_eq!(
            OutputTarget::from(Path::new("pkg.spk")),
            OutputTarget::File(PathBuf::from("pkg.spk"))
        );
        assert_eq!(
            OutputTarget::from(Path::new("dist")),
            OutputTarget::Directory(PathBuf::from("dist"))
        );
    }

    #[test]
    fn test_output_target_resolve() {
        let name = "tailscale-x86_64-1.2.3-4003-dsm7.spk";
        assert_eq!(OutputTarget::CurrentDir.resolve(name), PathBuf::from(name));
        assert_eq!(
            OutputTarget::Directory(PathBuf::from("out")).resolve(name),
            Path::new("out").join(name)
        );
        assert_eq!(
            OutputTarget::File(PathBuf::from("x.spk")).resolve(name),
            PathBuf::from("x.spk")
        );
    }

    #[test]
    fn test_parameters_default_base_and_truncation() {
        let version = VersionInfo::new("1.2", "1.2.3", "1.2.3-t1", "1").unwrap();
        let t = Utc.timestamp_opt(1_700_000_000, 5).unwrap();

        let params = BuildParameters::new(t, version.clone(), None, false).unwrap();
        assert_eq!(params.spk_build_base, 2_003);
        assert_eq!(params.create_time.timestamp_subsec_nanos(), 0);

        let params = BuildParameters::new(t, version, Some(15), false).unwrap();
        assert_eq!(params.spk_build_base, 15);
    }

    #[test]
    fn test_oversized_build_base_is_a_config_error() {
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let version = VersionInfo::new("1.2", "1.2.3", "1.2.3-t1", "1").unwrap();
        let err = BuildParameters::new(t, version, Some(u64::MAX), false).unwrap_err();
        assert!(matches!(err, SpkError::Config(_)), "{err:?}");

        // The ordinal itself fits in 64 bits, but the DSM 7 offset would not.
        let huge = VersionInfo::new("1.0", "1.0.18446744073709551615", "x", "1").unwrap();
        assert_eq!(huge.build_ordinal, u64::MAX);
        let err = BuildParameters::new(t, huge, None, false).unwrap_err();
        assert!(err.to_string().contains("1.0.18446744073709551615"), "{err}");

        let version = VersionInfo::new("1.2", "1.2.3", "1.2.3-t1", "1").unwrap();
        let params =
            BuildParameters::new(t, version, Some(spk_schema::MAX_BUILD_BASE), false).unwrap();
        assert_eq!(params.spk_build_base, spk_schema::MAX_BUILD_BASE);
    }
}
