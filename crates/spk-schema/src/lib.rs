//! Shared types for building Synology SPK packages.
//!
//! Everything here is plain data: the architecture and DSM tables, the
//! selectors the command line accepts, and the version descriptor whose
//! build ordinal drives package numbering.

pub mod arch;
pub mod dsm;
pub mod types;
pub mod version;

// Re-exports
pub use arch::*;
pub use dsm::*;
pub use types::*;
pub use version::*;

/// Base name shared by every produced package file.
pub const PACKAGE_BASENAME: &str = "tailscale";
