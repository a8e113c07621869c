//! Compiler collaborator: produces the two Linux binaries a package ships.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use spk_schema::{GoArch, VersionInfo};
use tracing::{debug, info};

use crate::error::{Result, SpkError};

/// Go import path prefix of the commands being packaged.
const CMD_PREFIX: &str = "tailscale.com/cmd/";

/// Go package whose variables carry the version stamp.
const VERSION_PKG: &str = "tailscale.com/version";

/// Builds one named program for a target architecture.
pub trait Toolchain {
    /// Compile `program` for Linux on `arch`, stamped with `version`, and
    /// return the binary's bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SpkError::Build`] if compilation fails or leaves no
    /// binary behind.
    fn build(&self, program: &str, arch: GoArch, version: &VersionInfo) -> Result<Vec<u8>>;
}

/// The daemon and the CLI, compiled for one architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binaries {
    /// `tailscaled`, the daemon.
    pub tailscaled: Vec<u8>,
    /// `tailscale`, the CLI. Also served as the web UI's CGI entry point.
    pub tailscale: Vec<u8>,
}

impl Binaries {
    /// Build both programs with `toolchain`, daemon first.
    ///
    /// # Errors
    ///
    /// Propagates the first build failure.
    pub fn build(toolchain: &dyn Toolchain, arch: GoArch, version: &VersionInfo) -> Result<Self> {
        let tailscaled = toolchain.build("tailscaled", arch, version)?;
        let tailscale = toolchain.build("tailscale", arch, version)?;
        Ok(Self {
            tailscaled,
            tailscale,
        })
    }
}

/// Compiles with the `go` command inside a Tailscale source checkout.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    source_dir: PathBuf,
    go: OsString,
}

impl GoToolchain {
    /// A toolchain building from `source_dir` with `go` from `PATH`.
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            go: OsString::from("go"),
        }
    }

    /// Use a different `go` executable.
    pub fn with_go(mut self, go: impl Into<OsString>) -> Self {
        self.go = go.into();
        self
    }
}

/// Linker flags that stamp the version into the binary.
pub fn ldflags(version: &VersionInfo) -> String {
    format!(
        "-X {VERSION_PKG}.Long={} -X {VERSION_PKG}.Short={} -X {VERSION_PKG}.GitCommit={}",
        version.long, version.short, version.git_hash
    )
}

impl Toolchain for GoToolchain {
    fn build(&self, program: &str, arch: GoArch, version: &VersionInfo) -> Result<Vec<u8>> {
        let build_err = |reason: String| SpkError::Build {
            program: program.to_string(),
            reason,
        };

        let go = which::which(&self.go).map_err(|e| {
            build_err(format!("{} not found: {e}", self.go.to_string_lossy()))
        })?;

        // Owned by this call: removed on every return path when dropped.
        let out_dir = tempfile::Builder::new()
            .prefix("spk-build-")
            .tempdir()
            .map_err(|e| build_err(format!("creating output directory: {e}")))?;
        let out_path = out_dir.path().join(program);
        let package = format!("{CMD_PREFIX}{program}");

        let mut cmd = Command::new(&go);
        cmd.arg("build")
            .arg("-o")
            .arg(&out_path)
            .arg("-ldflags")
            .arg(ldflags(version))
            .arg(&package)
            .current_dir(&self.source_dir)
            .env("GOOS", "linux")
            .env("GOARCH", arch.goarch());
        match arch.goarm() {
            Some(goarm) => cmd.env("GOARM", goarm),
            None => cmd.env_remove("GOARM"),
        };

        info!(program, arch = %arch, "compiling");
        debug!(go = %go.display(), package = %package, out = %out_path.display(), "go build");
        let output = cmd
            .output()
            .map_err(|e| build_err(format!("running {}: {e}", go.display())))?;
        if !output.status.success() {
            return Err(build_err(format!(
                "go build {package}: {}\n{}{}",
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let data = std::fs::read(&out_path).map_err(|e| {
            build_err(format!("no binary at {}: {e}", out_path.display()))
        })?;
        debug!(program, bytes = data.len(), "captured binary");
        Ok(data)
    }
}
