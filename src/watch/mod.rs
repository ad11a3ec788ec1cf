// src/watch/mod.rs

//! Watch entries: the persisted registrations that bind a remote project to a
//! webhook template, plus the next-state values used to advance their cursor.

pub mod entry;

pub use entry::{EntryUpdate, WatchEntry, WatchId};
