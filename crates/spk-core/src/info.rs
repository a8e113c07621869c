//! The package's top-level `INFO` file.
//!
//! Package Center reads `key="value"` lines, for example:
//!
//! ```text
//! package="Tailscale"
//! version="1.16.2-2013"
//! arch="x86_64"
//! description="Connect all your devices using WireGuard, without the hassle."
//! displayname="Tailscale"
//! maintainer="Tailscale, Inc."
//! maintainer_url="https://github.com/tailscale/tailscale-synology"
//! create_time="20211103-21:01:18"
//! dsmuidir="ui"
//! dsmappname="SYNO.SDS.Tailscale"
//! startstop_restart_services="nginx"
//! os_min_ver="7.0-40000"
//! os_max_ver=""
//! extractsize="42368"
//! ```

use spk_schema::PackageVariant;

use crate::options::BuildParameters;

const PACKAGE: &str = "Tailscale";
const DESCRIPTION: &str = "Connect all your devices using WireGuard, without the hassle.";
const MAINTAINER: &str = "Tailscale, Inc.";
const MAINTAINER_URL: &str = "https://github.com/tailscale/tailscale-synology";
const DSM_UI_DIR: &str = "ui";
const DSM_APP_NAME: &str = "SYNO.SDS.Tailscale";
const RESTART_SERVICES: &str = "nginx";

/// Render `INFO` for `variant`. `extracted_size` is the uncompressed size
/// of the inner payload in bytes; it is recorded in KiB, rounded down.
pub fn generate_info(
    params: &BuildParameters,
    variant: &PackageVariant,
    extracted_size: u64,
) -> Vec<u8> {
    let mut buf = String::new();
    let mut add = |key: &str, value: &str| {
        buf.push_str(key);
        buf.push('=');
        buf.push_str(&quote(value));
        buf.push('\n');
    };

    add("package", PACKAGE);
    add(
        "version",
        &variant.spk_version(&params.version.short, params.spk_build_base),
    );
    add("arch", variant.platform);
    add("description", DESCRIPTION);
    add("displayname", PACKAGE);
    add("maintainer", MAINTAINER);
    add("maintainer_url", MAINTAINER_URL);
    add(
        "create_time",
        &params.create_time.format("%Y%m%d-%H:%M:%S").to_string(),
    );
    add("dsmuidir", DSM_UI_DIR);
    add("dsmappname", DSM_APP_NAME);
    add("startstop_restart_services", RESTART_SERVICES);
    add("os_min_ver", variant.dsm.os_min_ver());
    add("os_max_ver", variant.dsm.os_max_ver());
    add("extractsize", &(extracted_size >> 10).to_string());

    buf.into_bytes()
}

/// Double-quote `s` with Go-style backslash escapes.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
