/// Major version of Synology DSM a package targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DsmVersion {
    /// DSM 6.x.
    Dsm6,
    /// DSM 7.x.
    Dsm7,
}

impl DsmVersion {
    /// Every supported DSM major version, in build order.
    pub const ALL: [DsmVersion; 2] = [DsmVersion::Dsm6, DsmVersion::Dsm7];

    /// Largest [`build_offset`](Self::build_offset) of any version.
    pub const MAX_BUILD_OFFSET: u64 = 2000;

    /// The numeric major version (6 or 7).
    pub fn major(&self) -> u8 {
        match self {
            Self::Dsm6 => 6,
            Self::Dsm7 => 7,
        }
    }

    /// Amount added to the build-ordinal base to form this version's
    /// package build number. DSM 7 packages must sort above every DSM 6
    /// package of the same release.
    pub fn build_offset(&self) -> u64 {
        match self {
            Self::Dsm6 => 0,
            Self::Dsm7 => Self::MAX_BUILD_OFFSET,
        }
    }

    /// Oldest firmware the package installs on (`os_min_ver` in INFO).
    pub fn os_min_ver(&self) -> &'static str {
        match self {
            Self::Dsm6 => "6.0.1-7445",
            Self::Dsm7 => "7.0-40000",
        }
    }

    /// First firmware the package refuses (`os_max_ver` in INFO); empty
    /// means unbounded.
    pub fn os_max_ver(&self) -> &'static str {
        match self {
            Self::Dsm6 => "7.0-40000",
            Self::Dsm7 => "",
        }
    }
}

impl std::fmt::Display for DsmVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.major())
    }
}

impl std::str::FromStr for DsmVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches("dsm") {
            "6" => Ok(Self::Dsm6),
            "7" => Ok(Self::Dsm7),
            _ => Err(format!("invalid --dsm-version {s:?}")),
        }
    }
}

/// Which DSM versions to build: one, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DsmSelector {
    /// A single DSM major version.
    One(DsmVersion),
    /// Every entry of [`DsmVersion::ALL`].
    All,
}

impl DsmSelector {
    /// Expand the selector into concrete versions, in build order.
    pub fn expand(&self) -> Vec<DsmVersion> {
        match self {
            Self::One(dsm) => vec![*dsm],
            Self::All => DsmVersion::ALL.to_vec(),
        }
    }
}

impl Default for DsmSelector {
    fn default() -> Self {
        Self::One(DsmVersion::Dsm7)
    }
}

impl std::str::FromStr for DsmSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::One)
    }
}

impl std::fmt::Display for DsmSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One(dsm) => write!(f, "{dsm}"),
            Self::All => f.write_str("all"),
        }
    }
}
