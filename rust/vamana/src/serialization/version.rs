//! Format versioning.
//!
//! The version is written as `major.minor` on the header line. Readers
//! accept any minor version of their own major version.

use super::{SerializationError, SerializationResult};
use std::fmt;
use std::str::FromStr;

/// Serialization version information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializationVersion {
    pub major: u16,
    pub minor: u16,
}

/// Version written by this build.
pub const CURRENT_VERSION: SerializationVersion = SerializationVersion::new(1, 0);

impl SerializationVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    pub const fn current() -> Self {
        CURRENT_VERSION
    }

    pub fn is_compatible(self, other: Self) -> bool {
        self.major == other.major
    }
}

impl Default for SerializationVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for SerializationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for SerializationVersion {
    type Err = SerializationError;

    fn from_str(s: &str) -> SerializationResult<Self> {
        let invalid = || SerializationError::InvalidHeader(format!("bad version '{s}'"));
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}
