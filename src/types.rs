// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Modification time as reported by the content server, in milliseconds
/// since the Unix epoch.
///
/// Ordering is the remote clock's own ordering; no skew correction is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RemoteTimestamp(i64);

impl RemoteTimestamp {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RemoteTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteTimestamp {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

/// Where watch cursors are kept between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// Persist cursors to a state file (`[config].state_path`).
    #[default]
    File,
    /// Keep cursors in memory only (lost on restart, so every entry
    /// bootstraps again).
    Memory,
}

impl FromStr for StoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StoreMode::File),
            "memory" => Ok(StoreMode::Memory),
            other => Err(format!(
                "invalid store mode: {other} (expected \"file\" or \"memory\")"
            )),
        }
    }
}
