// src/detect.rs

//! Change detection: decide whether fetched metadata is newer than the
//! cursor of a watch entry.
//!
//! Pure and deterministic; no IO.

use crate::types::RemoteTimestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Changed,
    Unchanged,
}

impl Detection {
    pub fn is_changed(self) -> bool {
        matches!(self, Detection::Changed)
    }
}

/// Compare the last delivered modification time against the freshly fetched
/// one.
///
/// - No cursor yet: `Changed`, so the first poll of a new entry fires once.
/// - Otherwise `Changed` only when `modified` is strictly newer. An equal or
///   older value (the latter should not happen with a well-behaved remote) is
///   `Unchanged`.
pub fn detect(
    last_observed_modified: Option<RemoteTimestamp>,
    modified: RemoteTimestamp,
) -> Detection {
    match last_observed_modified {
        None => Detection::Changed,
        Some(cursor) if modified > cursor => Detection::Changed,
        Some(_) => Detection::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ms: i64) -> RemoteTimestamp {
        RemoteTimestamp::from_millis(ms)
    }

    #[test]
    fn missing_cursor_is_always_changed() {
        assert_eq!(detect(None, ts(0)), Detection::Changed);
        assert_eq!(detect(None, ts(i64::MIN)), Detection::Changed);
        assert_eq!(detect(None, ts(1_620_000_000_000)), Detection::Changed);
    }

    #[test]
    fn newer_modification_is_changed() {
        assert_eq!(detect(Some(ts(10)), ts(11)), Detection::Changed);
    }

    #[test]
    fn same_modification_is_unchanged() {
        assert_eq!(detect(Some(ts(10)), ts(10)), Detection::Unchanged);
    }

    #[test]
    fn older_modification_is_unchanged() {
        assert_eq!(detect(Some(ts(10)), ts(9)), Detection::Unchanged);
    }
}
