//! Composition of Tailscale's Synology packages.
//!
//! A package is a tar archive wrapping a compressed inner tar archive plus
//! metadata. [`build_packages`] is the whole pipeline; the modules below
//! expose each stage for callers that need only part of it.

pub mod archive;
pub mod assets;
pub mod composer;
pub mod error;
pub mod info;
pub mod io;
pub mod matrix;
pub mod options;
pub mod payload;
pub mod resolver;
pub mod toolchain;

pub use assets::{AssetStore, EmbeddedAssets, MemoryAssets};
pub use error::{Result, SpkError};
pub use matrix::{BuildPlan, Packager, build_packages};
pub use options::{BuildOptions, BuildParameters, OutputTarget};
pub use toolchain::{Binaries, GoToolchain, Toolchain};
