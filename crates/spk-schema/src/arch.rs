/// CPU architecture family a package is built for.
///
/// Each family corresponds to one Go compiler target (`GOARCH`, plus `GOARM`
/// for the 32-bit ARM families) and maps to one or more Synology platform
/// labels. Every label of a family ships the same compiled binaries.
///
/// Platform labels are taken from the `SynoCommunity` architecture table and
/// the `platform.<PLATFORM>` files of Synology's `pkgscripts-ng`.
///
/// # Example
///
/// ```
/// use spk_schema::GoArch;
///
/// let arch: GoArch = "arm/5".parse().unwrap();
/// assert_eq!(arch.goarch(), "arm");
/// assert_eq!(arch.platforms()[0], "armv5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GoArch {
    /// 64-bit x86.
    Amd64,
    /// 32-bit x86.
    I386,
    /// 64-bit ARM.
    Arm64,
    /// ARMv5 (Marvell Kirkwood and friends).
    ArmV5,
    /// ARMv7 (Annapurna, Armada, Comcerto, ...).
    ArmV7,
}

impl GoArch {
    /// Every known architecture family, in build order.
    pub const ALL: [GoArch; 5] = [
        GoArch::Amd64,
        GoArch::I386,
        GoArch::Arm64,
        GoArch::ArmV5,
        GoArch::ArmV7,
    ];

    /// Selector spelling, as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::I386 => "386",
            Self::Arm64 => "arm64",
            Self::ArmV5 => "arm/5",
            Self::ArmV7 => "arm/7",
        }
    }

    /// Value for the compiler's `GOARCH` variable.
    pub fn goarch(&self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::I386 => "386",
            Self::Arm64 => "arm64",
            Self::ArmV5 | Self::ArmV7 => "arm",
        }
    }

    /// Value for the compiler's `GOARM` variable, if the family needs one.
    pub fn goarm(&self) -> Option<&'static str> {
        match self {
            Self::ArmV5 => Some("5"),
            Self::ArmV7 => Some("7"),
            _ => None,
        }
    }

    /// Synology platform labels served by this family. Never empty.
    pub fn platforms(&self) -> &'static [&'static str] {
        match self {
            Self::Amd64 => &["x86_64"],
            Self::I386 => &["i686"],
            Self::Arm64 => &["armv8"],
            Self::ArmV5 => &["armv5", "88f6281", "88f6282"],
            Self::ArmV7 => &[
                "armv7",
                "alpine",
                "armada370",
                "armada375",
                "armada38x",
                "armadaxp",
                "comcerto2k",
                "monaco",
                "hi3535",
            ],
        }
    }
}

impl std::fmt::Display for GoArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GoArch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "amd64" | "x86_64" => Ok(Self::Amd64),
            "386" | "i686" => Ok(Self::I386),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "arm/5" | "armv5" => Ok(Self::ArmV5),
            "arm/7" | "armv7" => Ok(Self::ArmV7),
            _ => Err(format!("unknown --goarch value {s:?}")),
        }
    }
}

/// Which architecture families to build: one, or every known family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchSelector {
    /// A single family.
    One(GoArch),
    /// Every entry of [`GoArch::ALL`].
    All,
}

impl ArchSelector {
    /// Expand the selector into concrete families, in build order.
    pub fn expand(&self) -> Vec<GoArch> {
        match self {
            Self::One(arch) => vec![*arch],
            Self::All => GoArch::ALL.to_vec(),
        }
    }
}

impl Default for ArchSelector {
    fn default() -> Self {
        Self::One(GoArch::Amd64)
    }
}

impl std::str::FromStr for ArchSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::One)
    }
}

impl std::fmt::Display for ArchSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One(arch) => write!(f, "{arch}"),
            Self::All => f.write_str("all"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_family_has_a_platform() {
        for arch in GoArch::ALL {
            assert!(!arch.platforms().is_empty(), "{arch} has no platform label");
        }
    }

    #[test]
    fn test_selector_spelling_round_trips() {
        for arch in GoArch::ALL {
            assert_eq!(arch.as_str().parse::<GoArch>().unwrap(), arch);
        }
    }

    #[test]
    fn test_arm_families_set_goarm() {
        assert_eq!(GoArch::ArmV7.goarch(), "arm");
        assert_eq!(GoArch::ArmV7.goarm(), Some("7"));
        assert_eq!(GoArch::ArmV5.goarm(), Some("5"));
        assert_eq!(GoArch::Amd64.goarm(), None);
    }

    #[test]
    fn test_all_selector_expands_to_every_family() {
        let all: ArchSelector = "all".parse().unwrap();
        assert_eq!(all.expand(), GoArch::ALL.to_vec());

        let one: ArchSelector = "arm64".parse().unwrap();
        assert_eq!(one.expand(), vec![GoArch::Arm64]);
    }

    #[test]
    fn test_unknown_arch_is_rejected() {
        let err = "sparc".parse::<ArchSelector>().unwrap_err();
        assert!(err.contains("sparc"));
    }
}
