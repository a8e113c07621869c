use crate::{DsmVersion, GoArch, PACKAGE_BASENAME};

/// Largest build-ordinal base that numbers every DSM version without
/// overflowing.
pub const MAX_BUILD_BASE: u64 = u64::MAX - DsmVersion::MAX_BUILD_OFFSET;

/// Compression applied to the inner `package.tgz` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Fast gzip. Big packages, quick local iteration.
    #[default]
    Speed,
    /// xz. Slow, but the smallest packages.
    Size,
}

impl Compression {
    /// Flag spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Speed => "speed",
            Self::Size => "size",
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "speed" => Ok(Self::Speed),
            "size" => Ok(Self::Size),
            _ => Err(format!("invalid --compress value {s:?}")),
        }
    }
}

/// One concrete output of a build: a DSM version, an architecture family,
/// and one of that family's platform labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageVariant {
    /// Target DSM major version.
    pub dsm: DsmVersion,
    /// Architecture family whose binaries are embedded.
    pub arch: GoArch,
    /// Synology platform label written to INFO and the file name.
    pub platform: &'static str,
}

impl PackageVariant {
    /// Package build number for this variant given the ordinal base.
    ///
    /// Bases above [`MAX_BUILD_BASE`] saturate at `u64::MAX`; callers are
    /// expected to reject them first with [`check_build_base`].
    pub fn build_number(&self, base: u64) -> u64 {
        base.saturating_add(self.dsm.build_offset())
    }

    /// Package version as shown by Package Center, e.g. `1.2.3-4003`.
    pub fn spk_version(&self, short_version: &str, base: u64) -> String {
        format!("{short_version}-{}", self.build_number(base))
    }

    /// Deterministic file name of this variant's package.
    pub fn filename(&self, short_version: &str, base: u64) -> String {
        format!(
            "{PACKAGE_BASENAME}-{}-{}-dsm{}.spk",
            self.platform,
            self.spk_version(short_version, base),
            self.dsm.major()
        )
    }
}

/// Reject a build-ordinal base that cannot be numbered for every DSM
/// version.
///
/// # Errors
///
/// Returns a description of the problem if `base` exceeds
/// [`MAX_BUILD_BASE`].
pub fn check_build_base(base: u64) -> Result<u64, String> {
    if base > MAX_BUILD_BASE {
        return Err(format!(
            "build number base {base} is too large; it must not exceed {MAX_BUILD_BASE}"
        ));
    }
    Ok(base)
}
