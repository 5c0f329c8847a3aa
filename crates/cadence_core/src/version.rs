//! Stage version numbers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic version of a stage implementation, serialized as `"major.minor.patch"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    /// Major component; a bump breaks input/output shape
    pub major: u64,
    /// Minor component
    pub minor: u64,
    /// Patch component
    pub patch: u64,
}

impl Version {
    /// Create a new version
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse from string; a leading `v` is accepted
    ///
    /// # Errors
    ///
    /// Returns error if format is invalid
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let trimmed = s.strip_prefix('v').unwrap_or(s);
        let parts: Vec<&str> = trimmed.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(VersionError::InvalidFormat(s.to_string()));
        };

        let component = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| VersionError::InvalidComponent(part.to_string()))
        };

        Ok(Self {
            major: component(major)?,
            minor: component(minor)?,
            patch: component(patch)?,
        })
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new(0, 1, 0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}

/// Version-related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Invalid format
    InvalidFormat(String),
    /// Invalid component
    InvalidComponent(String),
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat(s) => write!(f, "Invalid version format: {}", s),
            Self::InvalidComponent(s) => write!(f, "Invalid version component: {}", s),
        }
    }
}

impl std::error::Error for VersionError {}

impl From<VersionError> for crate::CoreError {
    fn from(err: VersionError) -> Self {
        Self::InvalidVersion {
            reason: err.to_string(),
        }
    }
}
