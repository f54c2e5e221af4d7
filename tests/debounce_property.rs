// tests/debounce_property.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use proptest::prelude::*;

use sitepipe::watch::{ChangeKind, Debouncer};

const WINDOW_MS: u64 = 300;

fn kind() -> impl Strategy<Value = ChangeKind> {
    prop_oneof![
        Just(ChangeKind::Created),
        Just(ChangeKind::Modified),
        Just(ChangeKind::Removed),
    ]
}

/// (gap since previous event in ms, file index, kind); every gap is shorter
/// than the window so the whole sequence is one burst.
fn burst() -> impl Strategy<Value = Vec<(u64, usize, ChangeKind)>> {
    prop::collection::vec((0..WINDOW_MS, 0usize..6, kind()), 1..40)
}

proptest! {
    #[test]
    fn a_burst_yields_at_most_one_batch(events in burst()) {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(WINDOW_MS));
        let mut now = start;
        let mut touched = BTreeSet::new();

        for (gap, file, kind) in &events {
            now += Duration::from_millis(*gap);
            // Nothing may come out while the burst is still going.
            prop_assert!(debouncer.take_if_ready(now).is_none());
            let path = PathBuf::from(format!("/p/_posts/{file}.md"));
            debouncer.record(&path, *kind, now);
            touched.insert(path);
        }

        let just_before = now + Duration::from_millis(WINDOW_MS - 1);
        prop_assert!(debouncer.take_if_ready(just_before).is_none());

        let settled = now + Duration::from_millis(WINDOW_MS);
        let batch = debouncer.take_if_ready(settled);
        if let Some(batch) = &batch {
            prop_assert!(batch.keys().all(|p| touched.contains(p)));
        }

        // The burst is drained; a later poll sees nothing.
        prop_assert!(debouncer.take_if_ready(settled + Duration::from_secs(10)).is_none());
        prop_assert_eq!(debouncer.pending(), 0);
    }

    #[test]
    fn modifications_are_never_lost(files in prop::collection::btree_set(0usize..20, 1..10)) {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(WINDOW_MS));
        for (i, file) in files.iter().enumerate() {
            let path = PathBuf::from(format!("/p/_scripts/{file}.js"));
            debouncer.record(&path, ChangeKind::Modified, start + Duration::from_millis(i as u64));
        }

        let batch = debouncer
            .take_if_ready(start + Duration::from_secs(5))
            .unwrap_or_default();
        prop_assert_eq!(batch.len(), files.len());
        prop_assert!(batch.values().all(|k| *k == ChangeKind::Modified));
    }
}
