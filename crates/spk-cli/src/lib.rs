//! tailscale-synology - build Tailscale packages for Synology DSM

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use spk_core::{BuildOptions, BuildPlan, EmbeddedAssets, GoToolchain, OutputTarget};
use spk_schema::{ArchSelector, Compression, DsmSelector};
use tracing::info;

/// Command-line flags.
#[derive(Debug, Parser)]
#[command(name = "tailscale-synology")]
#[command(
    author,
    version = env!("SPK_VERSION"),
    about = "Build Tailscale packages (.spk) for Synology DSM"
)]
pub struct Cli {
    /// DSM major version to target: 6, 7 or all
    #[arg(long, default_value = "7")]
    pub dsm_version: DsmSelector,

    /// Architecture to build: amd64, 386, arm64, arm/5, arm/7 or all
    #[arg(long, default_value = "amd64")]
    pub goarch: ArchSelector,

    /// Payload compression: speed (gzip) or size (xz)
    #[arg(long, default_value = "speed")]
    pub compress: Compression,

    /// Use Package Center privileges instead of sideloading ones
    #[arg(long)]
    pub for_package_center: bool,

    /// Root of the Tailscale source checkout
    #[arg(long, default_value = ".")]
    pub source: PathBuf,

    /// Output directory, or a single file name ending in .spk
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the package build number base
    #[arg(long)]
    pub spk_build: Option<u64>,

    /// Go toolchain to compile with
    #[arg(long, default_value = "go")]
    pub go: OsString,

    /// git executable used to read the commit time
    #[arg(long, default_value = "git")]
    pub git: OsString,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Freeze the parsed flags into build options.
    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            dsm: self.dsm_version,
            arch: self.goarch,
            compression: self.compress,
            for_package_center: self.for_package_center,
            source_dir: self.source.clone(),
            output: self
                .output
                .as_deref()
                .map_or(OutputTarget::CurrentDir, OutputTarget::from),
            spk_build: self.spk_build,
            go: self.go.clone(),
            git: self.git.clone(),
        }
    }
}

/// Build every package the flags select and return where they were written.
///
/// # Errors
///
/// Fails on an invalid flag combination before anything runs, or on the
/// first resolution, compilation or write error.
pub fn run(cli: &Cli) -> Result<Vec<PathBuf>> {
    let options = cli.options();
    let plan = BuildPlan::new(&options)?;
    info!(packages = plan.package_count(), "building");

    let toolchain = GoToolchain::new(&options.source_dir).with_go(options.go.clone());
    let written = spk_core::build_packages(&options, &toolchain, &EmbeddedAssets)
        .with_context(|| format!("building packages from {}", options.source_dir.display()))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spk_schema::{DsmVersion, GoArch};

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["tailscale-synology"]).unwrap();
        let options = cli.options();
        assert_eq!(options.dsm, DsmSelector::One(DsmVersion::Dsm7));
        assert_eq!(options.arch, ArchSelector::One(GoArch::Amd64));
        assert_eq!(options.compression, Compression::Speed);
        assert_eq!(options.output, OutputTarget::CurrentDir);
        assert_eq!(options.source_dir, PathBuf::from("."));
        assert_eq!(options.spk_build, None);
        assert!(!options.for_package_center);
    }

    #[test]
    fn test_flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "tailscale-synology",
            "--dsm-version",
            "all",
            "--goarch",
            "arm/7",
            "--compress",
            "size",
            "--for-package-center",
            "--source",
            "/src/tailscale",
            "-o",
            "dist",
            "--spk-build",
            "12",
        ])
        .unwrap();
        let options = cli.options();
        assert_eq!(options.dsm, DsmSelector::All);
        assert_eq!(options.arch, ArchSelector::One(GoArch::ArmV7));
        assert_eq!(options.compression, Compression::Size);
        assert!(options.for_package_center);
        assert_eq!(options.source_dir, PathBuf::from("/src/tailscale"));
        assert_eq!(options.output, OutputTarget::Directory(PathBuf::from("dist")));
        assert_eq!(options.spk_build, Some(12));
    }

    #[test]
    fn test_spk_suffix_selects_a_single_file() {
        let cli = Cli::try_parse_from(["tailscale-synology", "-o", "out/tailscale.spk"]).unwrap();
        assert_eq!(
            cli.options().output,
            OutputTarget::File(PathBuf::from("out/tailscale.spk"))
        );
    }

    #[test]
    fn test_unknown_values_are_rejected() {
        assert!(Cli::try_parse_from(["tailscale-synology", "--goarch", "mips"]).is_err());
        assert!(Cli::try_parse_from(["tailscale-synology", "--dsm-version", "5"]).is_err());
        assert!(Cli::try_parse_from(["tailscale-synology", "--compress", "zstd"]).is_err());
    }

    #[test]
    fn test_version_flag_reports_stamped_version() {
        let err = Cli::try_parse_from(["tailscale-synology", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        let shown = err.to_string();
        assert!(!env!("SPK_VERSION").is_empty());
        assert!(shown.contains(env!("SPK_VERSION")), "{shown}");
    }

    #[test]
    fn test_run_rejects_single_file_for_many_packages() {
        let cli = Cli::try_parse_from([
            "tailscale-synology",
            "--goarch",
            "all",
            "-o",
            "pkg.spk",
        ])
        .unwrap();
        let err = run(&cli).unwrap_err();
        assert!(err.to_string().contains("pkg.spk"), "{err:#}");
    }
}
