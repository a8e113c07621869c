//! Release version descriptor and build-ordinal derivation.

/// Errors raised while interpreting a release version.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum VersionError {
    /// The version did not have exactly `major.minor.patch` components.
    #[error("version {version:?} must have exactly three dot-separated components, found {found}")]
    ComponentCount {
        /// The offending version string.
        version: String,
        /// How many components it actually had.
        found: usize,
    },

    /// One of the components was not a decimal number.
    #[error("version {version:?} has non-numeric component {component:?}")]
    NotNumeric {
        /// The offending version string.
        version: String,
        /// The component that failed to parse.
        component: String,
    },

    /// Major version zero has no place in the ordinal scheme.
    #[error("version {0:?} has major version 0")]
    ZeroMajor(String),

    /// The ordinal does not fit in 64 bits.
    #[error("version {0:?} is too large to number")]
    Overflow(String),
}

/// Version metadata for one release, as reported by the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionInfo {
    /// Major and minor only, e.g. `"1.21"`.
    pub minor: String,
    /// Full `major.minor.patch`, e.g. `"1.21.17"`.
    pub short: String,
    /// Commit-qualified version, e.g. `"1.21.17-tb4f817065"`.
    pub long: String,
    /// Full hash of the commit the release was built from.
    pub git_hash: String,
    /// Monotonic package ordinal derived from `short`.
    pub build_ordinal: u64,
}

impl VersionInfo {
    /// Assemble a descriptor, deriving [`build_ordinal`](Self::build_ordinal)
    /// from `short`.
    ///
    /// # Errors
    ///
    /// Returns a [`VersionError`] if `short` is not a numeric
    /// `major.minor.patch` triple.
    pub fn new(
        minor: impl Into<String>,
        short: impl Into<String>,
        long: impl Into<String>,
        git_hash: impl Into<String>,
    ) -> Result<Self, VersionError> {
        let short = short.into();
        let build_ordinal = build_ordinal(&short)?;
        Ok(Self {
            minor: minor.into(),
            short,
            long: long.into(),
            git_hash: git_hash.into(),
            build_ordinal,
        })
    }
}

/// Compute the package build ordinal of a `major.minor.patch` version:
/// `(major - 1) * 1_000_000 + minor * 1_000 + patch`.
///
/// The result increases strictly from release to release as long as minor
/// and patch stay below 1000, so package managers always see an upgrade.
///
/// ```
/// assert_eq!(spk_schema::build_ordinal("1.21.17").unwrap(), 21_017);
/// ```
///
/// # Errors
///
/// Returns a [`VersionError`] if the string is not exactly three numeric
/// components or has a zero major version.
pub fn build_ordinal(version: &str) -> Result<u64, VersionError> {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() != 3 {
        return Err(VersionError::ComponentCount {
            version: version.to_string(),
            found: parts.len(),
        });
    }

    let mut nums = [0u64; 3];
    for (slot, part) in nums.iter_mut().zip(&parts) {
        // `u64::from_str` accepts a leading '+', which is not a version digit.
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(VersionError::NotNumeric {
                version: version.to_string(),
                component: (*part).to_string(),
            });
        }
        *slot = part
            .parse()
            .map_err(|_| VersionError::Overflow(version.to_string()))?;
    }

    let [major, minor, patch] = nums;
    let major = major
        .checked_sub(1)
        .ok_or_else(|| VersionError::ZeroMajor(version.to_string()))?;

    major
        .checked_mul(1_000_000)
        .and_then(|m| minor.checked_mul(1_000).and_then(|n| m.checked_add(n)))
        .and_then(|mn| mn.checked_add(patch))
        .ok_or_else(|| VersionError::Overflow(version.to_string()))
}
