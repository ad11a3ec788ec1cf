// tests/detect_properties.rs

mod common;
use crate::common::builders::MetadataBuilder;

use proptest::prelude::*;

use watchhook::detect::{detect, Detection};
use watchhook::notify::render;
use watchhook::types::RemoteTimestamp;
use watchhook::watch::WatchEntry;

fn ts(ms: i64) -> RemoteTimestamp {
    RemoteTimestamp::from_millis(ms)
}

proptest! {
    #[test]
    fn absent_cursor_is_always_a_change(modified in any::<i64>()) {
        prop_assert_eq!(detect(None, ts(modified)), Detection::Changed);
    }

    #[test]
    fn detection_follows_remote_ordering(cursor in any::<i64>(), modified in any::<i64>()) {
        let expected = if modified > cursor {
            Detection::Changed
        } else {
            Detection::Unchanged
        };
        prop_assert_eq!(detect(Some(ts(cursor)), ts(modified)), expected);
    }

    #[test]
    fn committed_cursor_never_moves_backwards(cursor in proptest::option::of(any::<i64>()), modified in any::<i64>()) {
        let mut entry = WatchEntry::new("w", "r", "p", "http://hook");
        entry.last_observed_modified = cursor.map(ts);

        let update = entry.delivered(ts(modified), chrono::Utc::now());
        let next = update.apply_to(&entry).last_observed_modified;

        prop_assert!(next >= entry.last_observed_modified);
        prop_assert_eq!(detect(next, ts(modified)), Detection::Unchanged);
    }

    #[test]
    fn text_without_braces_renders_unchanged(text in "[a-zA-Z0-9:/?&=._~%-]{0,64}") {
        let metadata = MetadataBuilder::new("repo", "proj").build();
        prop_assert_eq!(render(&text, &metadata), text);
    }

    #[test]
    fn modified_placeholder_renders_the_millis(modified in any::<i64>()) {
        let metadata = MetadataBuilder::new("repo", "proj").modified(modified).build();
        let rendered = render("http://hook/?ts={project_modified}", &metadata);
        prop_assert_eq!(rendered, format!("http://hook/?ts={modified}"));
    }
}
