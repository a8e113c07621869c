//! Error type shared by every stage of a package build.

use std::path::PathBuf;

use spk_schema::VersionError;
use thiserror::Error;

/// Everything that can stop a package build.
///
/// All variants are fatal to the run. Each one names the command, path or
/// archive entry responsible so the operator knows where to look.
#[derive(Error, Debug)]
pub enum SpkError {
    /// The requested flags cannot produce a sensible output set.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An external collaborator could not be run or gave no usable answer.
    #[error("running `{command}`: {reason}")]
    Resolution {
        /// The command line that was run.
        command: String,
        /// What went wrong.
        reason: String,
    },

    /// An external collaborator answered with malformed output.
    #[error("parsing output of `{command}`: {reason}")]
    Parse {
        /// The command line whose output was rejected.
        command: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The compiler failed or did not leave a binary behind.
    #[error("building {program}: {reason}")]
    Build {
        /// The program being built (`tailscale`, `tailscaled`).
        program: String,
        /// Compiler diagnostics or the missing-artifact explanation.
        reason: String,
    },

    /// A file could not be read or written.
    #[error("{}: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A static asset is not present in the asset store.
    #[error("static asset {0:?} does not exist")]
    MissingAsset(String),

    /// Writing a tar header or body failed mid-stream.
    #[error("writing archive entry {entry:?}: {source}")]
    Archive {
        /// Path of the entry inside the archive, or `<end>` for the trailer.
        entry: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl SpkError {
    /// Wrap an IO error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a version error with the command whose output produced it.
    pub fn version(command: impl Into<String>, err: &VersionError) -> Self {
        Self::Parse {
            command: command.into(),
            reason: err.to_string(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = SpkError> = std::result::Result<T, E>;
