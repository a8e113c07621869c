//! Version and timestamp resolution from the source tree.
//!
//! The release version comes from the tree's own `build_dist.sh shellvars`,
//! which prints `KEY="value"` lines. The package creation time is the
//! committer time of `HEAD`, so rebuilding the same commit reproduces the
//! same archives byte for byte.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use chrono::{DateTime, TimeZone, Utc};
use spk_schema::VersionInfo;
use tracing::debug;

use crate::error::{Result, SpkError};

/// Name of the version script at the root of the source tree.
pub const VERSION_SCRIPT: &str = "build_dist.sh";

/// Resolves release metadata by asking the source tree's collaborators.
#[derive(Debug, Clone)]
pub struct Resolver {
    source_dir: PathBuf,
    git: OsString,
}

impl Resolver {
    /// A resolver for the tree at `source_dir`, using `git` from `PATH`.
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            git: OsString::from("git"),
        }
    }

    /// Use a different version-control program.
    pub fn with_git(mut self, git: impl Into<OsString>) -> Self {
        self.git = git.into();
        self
    }

    /// Run `build_dist.sh shellvars` and parse its output.
    ///
    /// # Errors
    ///
    /// Returns [`SpkError::Resolution`] if the script cannot be run or exits
    /// non-zero, and [`SpkError::Parse`] if its output is malformed or the
    /// short version is not a `major.minor.patch` triple.
    pub fn version_info(&self) -> Result<VersionInfo> {
        let dir = self
            .source_dir
            .canonicalize()
            .map_err(|e| SpkError::io(&self.source_dir, e))?;
        let script = dir.join(VERSION_SCRIPT);

        let mut cmd = Command::new(&script);
        cmd.arg("shellvars").current_dir(&dir);
        let described = format!("{} shellvars", script.display());
        let stdout = run(&mut cmd, &described)?;
        parse_shellvars(&described, &stdout)
    }

    /// Read the committer time of `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns [`SpkError::Resolution`] if the command fails or prints
    /// anything other than a Unix timestamp.
    pub fn commit_time(&self) -> Result<DateTime<Utc>> {
        let mut cmd = Command::new(&self.git);
        cmd.args(["show", "-s", "--format=%ct", "HEAD"])
            .current_dir(&self.source_dir);
        let described = format!("{} show -s --format=%ct HEAD", self.git.to_string_lossy());
        let stdout = run(&mut cmd, &described)?;
        parse_commit_time(&described, &stdout)
    }
}

/// Run a collaborator to completion and return its stdout.
fn run(cmd: &mut Command, described: &str) -> Result<String> {
    debug!(command = described, "running");
    let output = cmd.output().map_err(|e| SpkError::Resolution {
        command: described.to_string(),
        reason: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(SpkError::Resolution {
            command: described.to_string(),
            reason: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    String::from_utf8(output.stdout).map_err(|_| SpkError::Resolution {
        command: described.to_string(),
        reason: "output is not UTF-8".to_string(),
    })
}

/// Parse `KEY="value"` lines into a [`VersionInfo`].
///
/// Recognised keys are `VERSION_MINOR`, `VERSION_SHORT`, `VERSION_LONG` and
/// `VERSION_GIT_HASH`; everything else, including lines without `=`, is
/// skipped. `command` only labels errors.
///
/// # Errors
///
/// Returns [`SpkError::Parse`] if a recognised value is not a well-formed
/// double-quoted string, a required key is absent, or the short version is
/// not a numeric triple.
pub fn parse_shellvars(command: &str, output: &str) -> Result<VersionInfo> {
    let parse_err = |reason: String| SpkError::Parse {
        command: command.to_string(),
        reason,
    };

    let mut minor = None;
    let mut short = None;
    let mut long = None;
    let mut git_hash = None;

    for line in output.lines() {
        let Some((key, quoted)) = line.trim().split_once('=') else {
            continue;
        };
        let slot = match key {
            "VERSION_MINOR" => &mut minor,
            "VERSION_SHORT" => &mut short,
            "VERSION_LONG" => &mut long,
            "VERSION_GIT_HASH" => &mut git_hash,
            _ => continue,
        };
        let value = unquote(quoted)
            .ok_or_else(|| parse_err(format!("{key} has malformed value {quoted}")))?;
        *slot = Some(value);
    }

    let require = |value: Option<String>, key: &str| {
        value.ok_or_else(|| parse_err(format!("{key} missing from output")))
    };
    let short = require(short, "VERSION_SHORT")?;
    let long = require(long, "VERSION_LONG")?;
    let git_hash = require(git_hash, "VERSION_GIT_HASH")?;

    VersionInfo::new(minor.unwrap_or_default(), short, long, git_hash)
        .map_err(|e| SpkError::version(command, &e))
}

/// Parse a decimal Unix timestamp. `command` only labels errors.
///
/// # Errors
///
/// Returns [`SpkError::Resolution`] for empty, non-numeric or out-of-range
/// output.
pub fn parse_commit_time(command: &str, output: &str) -> Result<DateTime<Utc>> {
    let resolution_err = |reason: String| SpkError::Resolution {
        command: command.to_string(),
        reason,
    };

    let text = output.trim();
    if text.is_empty() {
        return Err(resolution_err("empty output".to_string()));
    }
    let secs: i64 = text
        .parse()
        .map_err(|_| resolution_err(format!("{text:?} is not a Unix timestamp")))?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| resolution_err(format!("timestamp {secs} is out of range")))
}

/// Undo Go-style double quoting. `None` if `s` is not exactly one
/// well-formed quoted string.
fn unquote(s: &str) -> Option<String> {
    let inner = s.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\n' => return None,
            '\\' => {
                let decoded = match chars.next()? {
                    'a' => '\x07',
                    'b' => '\x08',
                    'f' => '\x0c',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'v' => '\x0b',
                    '\\' => '\\',
                    '"' => '"',
                    'x' => hex_char(&mut chars, 2)?,
                    'u' => hex_char(&mut chars, 4)?,
                    'U' => hex_char(&mut chars, 8)?,
                    _ => return None,
                };
                out.push(decoded);
            }
            c => out.push(c),
        }
    }
    Some(out)
}

fn hex_char(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<char> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        return None;
    }
    u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHELLVARS: &str = r#"VERSION_MINOR="1.21"
VERSION_SHORT="1.21.17"
VERSION_LONG="1.21.17-tb4f817065"
VERSION_GIT_HASH="b4f8170657cde2a3a21ffee46c9dd028e400fb0f"
VERSION_EXTRA_HASH="deadbeef"
VERSION_XCODE="101.21.17"
"#;

    #[test]
    fn test_parse_shellvars() {
        let v = parse_shellvars("build_dist.sh shellvars", SHELLVARS).unwrap();
        assert_eq!(v.minor, "1.21");
        assert_eq!(v.short, "1.21.17");
        assert_eq!(v.long, "1.21.17-tb4f817065");
        assert_eq!(v.git_hash, "b4f8170657cde2a3a21ffee46c9dd028e400fb0f");
        assert_eq!(v.build_ordinal, 21_017);
    }

    #[test]
    fn test_parse_shellvars_skips_noise() {
        let out = "# generated\n\n  VERSION_SHORT=\"1.2.3\"  \nVERSION_LONG=\"1.2.3-tabcdef\"\n\
                   VERSION_GIT_HASH=\"abcdef\"\nOTHER=not-quoted\n";
        let v = parse_shellvars("x", out).unwrap();
        assert_eq!(v.short, "1.2.3");
        assert_eq!(v.minor, "");
        assert_eq!(v.build_ordinal, 2_003);
    }

    #[test]
    fn test_unterminated_quote_is_a_parse_error() {
        let out = "VERSION_SHORT=\"1.2.3\nVERSION_LONG=\"x\"\nVERSION_GIT_HASH=\"y\"\n";
        let err = parse_shellvars("script", out).unwrap_err();
        assert!(matches!(err, SpkError::Parse { ref command, .. } if command == "script"));
    }

    #[test]
    fn test_two_component_version_is_rejected() {
        let out = "VERSION_SHORT=\"1.21\"\nVERSION_LONG=\"1.21-t1\"\nVERSION_GIT_HASH=\"1\"\n";
        let err = parse_shellvars("script", out).unwrap_err();
        let SpkError::Parse { reason, .. } = err else {
            panic!("expected a parse error, got {err:?}");
        };
        assert!(reason.contains("1.21"), "{reason}");
    }

    #[test]
    fn test_missing_short_version_is_rejected() {
        let err = parse_shellvars("script", "VERSION_LONG=\"1\"\n").unwrap_err();
        assert!(err.to_string().contains("VERSION_SHORT"));
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""plain""#).as_deref(), Some("plain"));
        assert_eq!(unquote(r#""a\"b\\c\n""#).as_deref(), Some("a\"b\\c\n"));
        assert_eq!(unquote(r#""\x41é""#).as_deref(), Some("Aé"));
        assert_eq!(unquote(r#""""#).as_deref(), Some(""));
        assert_eq!(unquote(r#""open"#), None);
        assert_eq!(unquote("bare"), None);
        assert_eq!(unquote(r#""a"b""#), None);
        assert_eq!(unquote(r#""\q""#), None);
        assert_eq!(unquote(r#""\x4""#), None);
    }

    #[test]
    fn test_parse_commit_time() {
        let t = parse_commit_time("git", "1700000000\n").unwrap();
        assert_eq!(t.timestamp(), 1_700_000_000);
        assert_eq!(t.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_bad_commit_time_is_a_resolution_error() {
        for out in ["", "  \n", "yesterday", "17e8"] {
            let err = parse_commit_time("git show", out).unwrap_err();
            assert!(
                matches!(err, SpkError::Resolution { ref command, .. } if command == "git show"),
                "{out:?}: {err:?}"
            );
        }
    }

    #[test]
    fn test_missing_source_dir_names_the_path() {
        let err = Resolver::new("/definitely/not/a/source/tree")
            .version_info()
            .unwrap_err();
        assert!(err.to_string().contains("/definitely/not/a/source/tree"));
    }
}
