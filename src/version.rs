//! Go toolchain version parsing and ordering.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^go(\d+)\.(\d+).*$").expect("valid version regex"));

/// A Go toolchain release, ordered lexicographically on (major, minor).
///
/// Patch levels and release-candidate suffixes are ignored: `go1.21.3`
/// and `go1.21rc2` both parse as `go1.21`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GoVersion {
    pub major: u32,
    pub minor: u32,
}

impl GoVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a version string of the form `go<major>.<minor>...`.
    pub fn parse(text: &str) -> Result<Self> {
        let captures = VERSION_RE
            .captures(text)
            .ok_or_else(|| Error::Parse(format!("unrecognized Go version string: {:?}", text)))?;

        let major = captures[1]
            .parse()
            .map_err(|_| Error::Parse(format!("version major out of range: {:?}", text)))?;
        let minor = captures[2]
            .parse()
            .map_err(|_| Error::Parse(format!("version minor out of range: {:?}", text)))?;

        Ok(Self { major, minor })
    }
}

impl fmt::Display for GoVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "go{}.{}", self.major, self.minor)
    }
}
