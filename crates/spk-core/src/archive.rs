//! Declarative tar entries and the writer that streams them.
//!
//! An archive is described as an ordered list of [`TarEntry`] values and
//! written in one pass by [`write_archive`]. Headers are fully
//! deterministic: every timestamp is cut to whole seconds, ownership is
//! fixed, and static assets carry a fixed modification time, so the same
//! inputs always produce the same bytes.

use std::io::{self, Write};

use chrono::{DateTime, SubsecRound, Utc};
use tar::{EntryType, Header};

use crate::assets::AssetStore;
use crate::error::{Result, SpkError};

/// Owner and group recorded on directory entries.
pub const DIR_OWNER: &str = "tailscale";

/// Permission bits of every directory entry.
pub const DIR_MODE: u32 = 0o755;

/// Modification time given to static assets, which have none of their own.
pub const STATIC_MTIME: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Drop the sub-second part of a timestamp.
///
/// Filesystems without sub-second resolution would otherwise see entries
/// dated slightly in the future, and two builds of the same inputs could
/// differ.
pub fn truncate_to_second(t: DateTime<Utc>) -> DateTime<Utc> {
    t.trunc_subsecs(0)
}

/// One unit of archive content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TarEntry<'a> {
    /// A directory marker. `name` always ends in `/`.
    Directory {
        /// Path inside the archive.
        name: String,
        /// Modification time, already truncated.
        mtime: DateTime<Utc>,
    },
    /// A regular file whose contents and mode come from the asset store.
    StaticFile {
        /// Path inside the archive.
        name: String,
        /// Logical name of the asset to copy.
        asset: &'a str,
    },
    /// A regular file backed by bytes already in memory.
    MemoryFile {
        /// Path inside the archive.
        name: String,
        /// File contents.
        data: &'a [u8],
        /// POSIX permission bits.
        mode: u32,
        /// Modification time, already truncated.
        mtime: DateTime<Utc>,
    },
}

impl<'a> TarEntry<'a> {
    /// A directory entry. A trailing `/` is added if missing.
    pub fn directory(name: impl Into<String>, mtime: DateTime<Utc>) -> Self {
        let mut name = name.into();
        if !name.ends_with('/') {
            name.push('/');
        }
        Self::Directory {
            name,
            mtime: truncate_to_second(mtime),
        }
    }

    /// A file copied from the asset called `asset`.
    pub fn static_file(name: impl Into<String>, asset: &'a str) -> Self {
        Self::StaticFile {
            name: name.into(),
            asset,
        }
    }

    /// A file holding `data`.
    pub fn memory_file(
        name: impl Into<String>,
        data: &'a [u8],
        mode: u32,
        mtime: DateTime<Utc>,
    ) -> Self {
        Self::MemoryFile {
            name: name.into(),
            data,
            mode,
            mtime: truncate_to_second(mtime),
        }
    }

    /// Path of the entry inside the archive.
    pub fn name(&self) -> &str {
        match self {
            Self::Directory { name, .. }
            | Self::StaticFile { name, .. }
            | Self::MemoryFile { name, .. } => name,
        }
    }

    /// Emit this entry's header and body into `builder`.
    ///
    /// # Errors
    ///
    /// Returns [`SpkError::MissingAsset`] (or the store's own error) if a
    /// static asset cannot be opened, and [`SpkError::Archive`] if the
    /// header or body cannot be written.
    pub fn write_to<W: Write>(
        &self,
        builder: &mut tar::Builder<W>,
        assets: &dyn AssetStore,
    ) -> Result<()> {
        let archive_err = |source: io::Error| SpkError::Archive {
            entry: self.name().to_string(),
            source,
        };

        match self {
            Self::Directory { name, mtime } => {
                let mut header = header(name, EntryType::Directory, DIR_MODE, *mtime, 0)
                    .and_then(|mut h| {
                        h.set_username(DIR_OWNER)?;
                        h.set_groupname(DIR_OWNER)?;
                        Ok(h)
                    })
                    .map_err(archive_err)?;
                header.set_cksum();
                builder.append(&header, io::empty()).map_err(archive_err)
            }
            Self::StaticFile { name, asset } => {
                let asset = assets.open(asset)?;
                let mut header = header(
                    name,
                    EntryType::Regular,
                    asset.mode,
                    STATIC_MTIME,
                    asset.data.len() as u64,
                )
                .map_err(archive_err)?;
                header.set_cksum();
                builder
                    .append(&header, asset.data.as_ref())
                    .map_err(archive_err)
            }
            Self::MemoryFile {
                name,
                data,
                mode,
                mtime,
            } => {
                let mut header = header(name, EntryType::Regular, *mode, *mtime, data.len() as u64)
                    .map_err(archive_err)?;
                header.set_cksum();
                builder.append(&header, *data).map_err(archive_err)
            }
        }
    }
}

/// Build a USTAR header. The checksum is left for the caller to set once
/// every field is final.
fn header(
    name: &str,
    kind: EntryType,
    mode: u32,
    mtime: DateTime<Utc>,
    size: u64,
) -> io::Result<Header> {
    let mut header = Header::new_ustar();
    header.set_path(name)?;
    header.set_entry_type(kind);
    header.set_mode(mode);
    // tar cannot express times before the epoch.
    header.set_mtime(u64::try_from(truncate_to_second(mtime).timestamp()).unwrap_or(0));
    header.set_size(size);
    header.set_uid(0);
    header.set_gid(0);
    Ok(header)
}

/// Stream `entries`, in order, as one tar archive into `out`.
///
/// Stops at the first entry that fails and returns its error; later
/// entries are never opened. On success the end-of-archive trailer is
/// written and the sink is handed back.
///
/// # Errors
///
/// Returns the first entry-construction or write error, or
/// [`SpkError::Archive`] if the trailer cannot be written.
pub fn write_archive<W: Write>(
    out: W,
    entries: &[TarEntry<'_>],
    assets: &dyn AssetStore,
) -> Result<W> {
    let mut builder = tar::Builder::new(out);
    for entry in entries {
        entry.write_to(&mut builder, assets)?;
    }
    builder.into_inner().map_err(|source| SpkError::Archive {
        entry: "<end>".to_string(),
        source,
    })
}
