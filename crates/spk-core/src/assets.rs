//! Read-only store of the static files bundled into every package.
//!
//! Icons, service descriptors, privilege declarations, log rotation
//! policies and lifecycle scripts are compiled into the binary so the
//! builder can run from anywhere. Composers look them up by logical name
//! through the [`AssetStore`] trait, which lets tests inject their own
//! tables.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::error::{Result, SpkError};

/// Contents and permission bits of one static file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset<'a> {
    /// File contents.
    pub data: Cow<'a, [u8]>,
    /// POSIX permission bits (e.g. `0o644`).
    pub mode: u32,
}

/// Lookup of static files by logical name.
pub trait AssetStore {
    /// Open the asset called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SpkError::MissingAsset`] if no such asset exists, or any
    /// error the backing store reports.
    fn open(&self, name: &str) -> Result<Asset<'_>>;
}

macro_rules! embed {
    ($name:literal, $mode:literal) => {
        (
            $name,
            include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/", $name)).as_slice(),
            $mode,
        )
    };
}

/// Static files compiled into the binary: (name, contents, mode).
static EMBEDDED: &[(&str, &[u8], u32)] = &[
    embed!("PACKAGE_ICON.PNG", 0o644),
    embed!("PACKAGE_ICON_256.PNG", 0o644),
    embed!("Tailscale.sc", 0o644),
    embed!("resource", 0o644),
    embed!("privilege-dsm6", 0o644),
    embed!("privilege-dsm6.priv", 0o644),
    embed!("privilege-dsm7", 0o644),
    embed!("privilege-dsm7.priv", 0o644),
    embed!("logrotate-dsm6", 0o644),
    embed!("logrotate-dsm7", 0o644),
    // Carries a hard-coded "1.8.3" UI version. Shipped as-is; nothing here
    // rewrites it.
    embed!("config", 0o644),
    embed!("scripts/start-stop-status", 0o755),
    embed!("scripts/preupgrade", 0o755),
    embed!("scripts/postupgrade", 0o755),
];

/// The asset table compiled into this binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedAssets;

impl EmbeddedAssets {
    /// Names of every embedded asset.
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        EMBEDDED.iter().map(|(name, _, _)| *name)
    }
}

impl AssetStore for EmbeddedAssets {
    fn open(&self, name: &str) -> Result<Asset<'_>> {
        EMBEDDED
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, data, mode)| Asset {
                data: Cow::Borrowed(data),
                mode: *mode,
            })
            .ok_or_else(|| SpkError::MissingAsset(name.to_string()))
    }
}

/// An in-memory asset table, for callers that assemble their own bundle.
#[derive(Debug, Default, Clone)]
pub struct MemoryAssets {
    files: BTreeMap<String, (Vec<u8>, u32)>,
}

impl MemoryAssets {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an asset.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>, mode: u32) {
        self.files.insert(name.into(), (data.into(), mode));
    }

    /// Copy every asset of another store into a new table.
    ///
    /// # Errors
    ///
    /// Propagates the first lookup failure from `store`.
    pub fn copy_from<'n>(
        store: &dyn AssetStore,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<Self> {
        let mut table = Self::new();
        for name in names {
            let asset = store.open(name)?;
            table.insert(name, asset.data.into_owned(), asset.mode);
        }
        Ok(table)
    }

    /// Remove an asset, returning whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.files.remove(name).is_some()
    }
}

impl AssetStore for MemoryAssets {
    fn open(&self, name: &str) -> Result<Asset<'_>> {
        self.files
            .get(name)
            .map(|(data, mode)| Asset {
                data: Cow::Borrowed(data.as_slice()),
                mode: *mode,
            })
            .ok_or_else(|| SpkError::MissingAsset(name.to_string()))
    }
}
