//! The outer `.spk` archive: metadata, icons, privileges, the inner
//! payload and lifecycle scripts, in the order Package Center expects.

use std::fs;
use std::path::PathBuf;

use spk_schema::{DsmVersion, PackageVariant};
use tracing::info;

use crate::archive::{TarEntry, write_archive};
use crate::assets::AssetStore;
use crate::error::{Result, SpkError};
use crate::info::generate_info;
use crate::options::{BuildParameters, OutputTarget};
use crate::payload::{InnerPayload, PAYLOAD_NAME};

/// Name of the privilege asset for `dsm`. Package Center builds get the
/// `.priv` variant.
pub fn privilege_asset(dsm: DsmVersion, for_package_center: bool) -> String {
    let mut name = format!("privilege-dsm{}", dsm.major());
    if for_package_center {
        name.push_str(".priv");
    }
    name
}

/// Serialize the outer archive for `variant` into memory.
///
/// # Errors
///
/// Returns the first asset or archive error.
pub fn compose_package(
    params: &BuildParameters,
    variant: &PackageVariant,
    inner: &InnerPayload,
    assets: &dyn AssetStore,
) -> Result<Vec<u8>> {
    let t = params.create_time;
    let info = generate_info(params, variant, inner.extracted_size);
    let privilege = privilege_asset(variant.dsm, params.for_package_center);

    let entries = [
        TarEntry::memory_file("INFO", &info, 0o644, t),
        TarEntry::static_file("PACKAGE_ICON.PNG", "PACKAGE_ICON.PNG"),
        TarEntry::static_file("PACKAGE_ICON_256.PNG", "PACKAGE_ICON_256.PNG"),
        TarEntry::static_file("Tailscale.sc", "Tailscale.sc"),
        TarEntry::directory("conf", t),
        TarEntry::static_file("conf/resource", "resource"),
        TarEntry::static_file("conf/privilege", &privilege),
        TarEntry::memory_file(PAYLOAD_NAME, &inner.bytes, 0o644, t),
        TarEntry::directory("scripts", t),
        TarEntry::static_file("scripts/start-stop-status", "scripts/start-stop-status"),
        TarEntry::static_file("scripts/postupgrade", "scripts/postupgrade"),
        TarEntry::static_file("scripts/preupgrade", "scripts/preupgrade"),
    ];
    write_archive(Vec::new(), &entries, assets)
}

/// Compose `variant` and write it to its place under `output`.
///
/// The archive is fully built before the destination is opened, so a
/// composition failure leaves no file behind.
///
/// # Errors
///
/// Returns composition errors, or [`SpkError::Io`] naming the destination
/// if it cannot be written.
pub fn write_package(
    params: &BuildParameters,
    variant: &PackageVariant,
    inner: &InnerPayload,
    assets: &dyn AssetStore,
    output: &OutputTarget,
) -> Result<PathBuf> {
    let filename = variant.filename(&params.version.short, params.spk_build_base);
    let path = output.resolve(&filename);

    info!("Generating {filename} ...");
    let bytes = compose_package(params, variant, inner, assets)?;
    fs::write(&path, &bytes).map_err(|e| SpkError::io(&path, e))?;

    if path.as_os_str() != filename.as_str() {
        info!("Wrote {filename} as {}", path.display());
    }
    Ok(path)
}
