//! Cache generations
//!
//! A generation is a named partition of the store (`cache-v16`). Bumping the
//! version is the only way to invalidate everything cached by a previous build.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Prefix shared by every generation name
pub const GENERATION_PREFIX: &str = "cache-v";

/// Generation version used when none is configured
pub const DEFAULT_CACHE_VERSION: u32 = 16;

/// Error returned when a partition name is not a generation name
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Not a cache generation name: '{0}'")]
pub struct InvalidGeneration(pub String);

/// A versioned partition of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation {
    version: u32,
}

impl Generation {
    pub fn new(version: u32) -> Self {
        Self { version }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Partition name, e.g. `cache-v16`
    pub fn name(&self) -> String {
        format!("{}{}", GENERATION_PREFIX, self.version)
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_VERSION)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", GENERATION_PREFIX, self.version)
    }
}

impl FromStr for Generation {
    type Err = InvalidGeneration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(GENERATION_PREFIX)
            .and_then(|version| version.parse().ok())
            .map(Self::new)
            .ok_or_else(|| InvalidGeneration(s.to_string()))
    }
}
