//! The inner payload: `package.tgz`, the tree DSM unpacks onto the NAS.
//!
//! The tar stream is counted before it reaches the compressor, so the
//! uncompressed size needed for `INFO`'s `extractsize` comes out of the
//! same single pass that produces the compressed bytes.

use std::io::{self, Write};

use flate2::write::GzEncoder;
use spk_schema::{Compression, DsmVersion};
use tracing::debug;
use xz2::write::XzEncoder;

use crate::archive::{TarEntry, write_archive};
use crate::assets::AssetStore;
use crate::error::{Result, SpkError};
use crate::io::CountingWriter;
use crate::options::BuildParameters;
use crate::toolchain::Binaries;

/// Entry name used for errors raised while finishing compression.
pub const PAYLOAD_NAME: &str = "package.tgz";

/// xz preset used for [`Compression::Size`].
const XZ_LEVEL: u32 = 6;

/// A compressed inner archive and the size of its uncompressed tar stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerPayload {
    /// Compressed tar bytes.
    pub bytes: Vec<u8>,
    /// Length of the tar stream before compression, trailer included.
    pub extracted_size: u64,
}

/// Compressor selected by [`Compression`].
enum Encoder {
    Gzip(GzEncoder<Vec<u8>>),
    Xz(XzEncoder<Vec<u8>>),
}

impl Encoder {
    fn new(compression: Compression) -> Self {
        match compression {
            Compression::Speed => {
                Self::Gzip(GzEncoder::new(Vec::new(), flate2::Compression::fast()))
            }
            Compression::Size => Self::Xz(XzEncoder::new(Vec::new(), XZ_LEVEL)),
        }
    }

    fn finish(self) -> io::Result<Vec<u8>> {
        match self {
            Self::Gzip(enc) => enc.finish(),
            Self::Xz(enc) => enc.finish(),
        }
    }
}

impl Write for Encoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Gzip(enc) => enc.write(buf),
            Self::Xz(enc) => enc.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Gzip(enc) => enc.flush(),
            Self::Xz(enc) => enc.flush(),
        }
    }
}

/// Name of the log rotation asset for `dsm`.
pub fn logrotate_asset(dsm: DsmVersion) -> &'static str {
    match dsm {
        DsmVersion::Dsm6 => "logrotate-dsm6",
        DsmVersion::Dsm7 => "logrotate-dsm7",
    }
}

/// Lay out the payload tree for `dsm` around `binaries`.
///
/// The CLI binary is shipped twice: once under `bin/` and once as the web
/// UI's CGI entry point.
pub fn payload_entries<'a>(
    params: &BuildParameters,
    dsm: DsmVersion,
    binaries: &'a Binaries,
) -> Vec<TarEntry<'a>> {
    let t = params.create_time;
    vec![
        TarEntry::directory("bin", t),
        TarEntry::memory_file("bin/tailscaled", &binaries.tailscaled, 0o755, t),
        TarEntry::memory_file("bin/tailscale", &binaries.tailscale, 0o755, t),
        TarEntry::directory("conf", t),
        TarEntry::static_file("conf/Tailscale.sc", "Tailscale.sc"),
        TarEntry::static_file("conf/logrotate.conf", logrotate_asset(dsm)),
        TarEntry::directory("ui", t),
        TarEntry::static_file("ui/PACKAGE_ICON_256.PNG", "PACKAGE_ICON_256.PNG"),
        TarEntry::memory_file("ui/index.cgi", &binaries.tailscale, 0o755, t),
        TarEntry::static_file("ui/config", "config"),
    ]
}

/// Build and compress the inner payload for `dsm`.
///
/// # Errors
///
/// Returns the first asset or archive error; nothing is returned for a
/// partially written payload.
pub fn assemble_inner(
    params: &BuildParameters,
    dsm: DsmVersion,
    binaries: &Binaries,
    compression: Compression,
    assets: &dyn AssetStore,
) -> Result<InnerPayload> {
    let entries = payload_entries(params, dsm, binaries);
    let counter = write_archive(
        CountingWriter::new(Encoder::new(compression)),
        &entries,
        assets,
    )?;
    let (encoder, extracted_size) = counter.into_parts();
    let bytes = encoder.finish().map_err(|source| SpkError::Archive {
        entry: PAYLOAD_NAME.to_string(),
        source,
    })?;

    debug!(
        dsm = dsm.major(),
        compression = compression.as_str(),
        extracted_size,
        compressed = bytes.len(),
        "assembled inner payload"
    );
    Ok(InnerPayload {
        bytes,
        extracted_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::EmbeddedAssets;
    use chrono::{TimeZone, Utc};
    use flate2::read::GzDecoder;
    use spk_schema::VersionInfo;
    use std::io::Read;
    use xz2::read::XzDecoder;

    fn params() -> BuildParameters {
        let version = VersionInfo::new("1.2", "1.2.3", "1.2.3-t1", "1").unwrap();
        BuildParameters::new(
            Utc.timestamp_opt(1_700_000_000, 250).unwrap(),
            version,
            None,
            false,
        )
        .unwrap()
    }

    fn binaries() -> Binaries {
        Binaries {
            tailscaled: b"daemon-binary".to_vec(),
            tailscale: b"cli-binary".to_vec(),
        }
    }

    fn listing(tar_bytes: &[u8]) -> Vec<(String, u32, Vec<u8>)> {
        let mut archive = tar::Archive::new(tar_bytes);
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let mut e = e.unwrap();
                let path = e.path().unwrap().to_string_lossy().to_string();
                let mode = e.header().mode().unwrap();
                let mut body = Vec::new();
                e.read_to_end(&mut body).unwrap();
                (path, mode, body)
            })
            .collect()
    }

    #[test]
    fn test_gzip_payload_layout() {
        let bins = binaries();
        let inner = assemble_inner(
            &params(),
            DsmVersion::Dsm7,
            &bins,
            Compression::Speed,
            &EmbeddedAssets,
        )
        .unwrap();

        let mut tar_bytes = Vec::new();
        GzDecoder::new(inner.bytes.as_slice())
            .read_to_end(&mut tar_bytes)
            .unwrap();
        assert_eq!(inner.extracted_size, tar_bytes.len() as u64);

        let entries = listing(&tar_bytes);
        let names: Vec<&str> = entries.iter().map(|e| e.0.as_str()).collect();
        assert_eq!(
            names,
            [
                "bin/",
                "bin/tailscaled",
                "bin/tailscale",
                "conf/",
                "conf/Tailscale.sc",
                "conf/logrotate.conf",
                "ui/",
                "ui/PACKAGE_ICON_256.PNG",
                "ui/index.cgi",
                "ui/config",
            ]
        );
        assert_eq!(entries[1].2, b"daemon-binary");
        assert_eq!(entries[1].1, 0o755);
        assert_eq!(entries[8].2, b"cli-binary");
        assert_eq!(entries[8].1, 0o755);
        assert_eq!(
            entries[5].2,
            EmbeddedAssets.open("logrotate-dsm7").unwrap().data.as_ref()
        );
    }

    #[test]
    fn test_xz_payload_round_trips() {
        let bins = binaries();
        let inner = assemble_inner(
            &params(),
            DsmVersion::Dsm6,
            &bins,
            Compression::Size,
            &EmbeddedAssets,
        )
        .unwrap();

        let mut tar_bytes = Vec::new();
        XzDecoder::new(inner.bytes.as_slice())
            .read_to_end(&mut tar_bytes)
            .unwrap();
        assert_eq!(inner.extracted_size, tar_bytes.len() as u64);

        let entries = listing(&tar_bytes);
        let logrotate = entries
            .iter()
            .find(|e| e.0 == "conf/logrotate.conf")
            .unwrap();
        assert_eq!(
            logrotate.2,
            EmbeddedAssets.open("logrotate-dsm6").unwrap().data.as_ref()
        );
    }

    #[test]
    fn test_payload_is_reproducible() {
        let bins = binaries();
        let build = || {
            assemble_inner(
                &params(),
                DsmVersion::Dsm7,
                &bins,
                Compression::Speed,
                &EmbeddedAssets,
            )
            .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_missing_asset_fails_the_payload() {
        let mut assets =
            crate::assets::MemoryAssets::copy_from(&EmbeddedAssets, EmbeddedAssets.names())
                .unwrap();
        assets.remove("config");

        let err = assemble_inner(
            &params(),
            DsmVersion::Dsm7,
            &binaries(),
            Compression::Speed,
            &assets,
        )
        .unwrap_err();
        assert!(matches!(err, SpkError::MissingAsset(ref n) if n == "config"));
    }
}
