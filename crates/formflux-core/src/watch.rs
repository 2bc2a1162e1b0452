#![forbid(unsafe_code)]

//! Dependency watches over the form-data graph.
//!
//! A watch pairs a caller-supplied tag with a path and a snapshot of the
//! value last seen there. After every store write the registry is notified
//! with the written path; watches whose path overlaps it recompute their
//! value and fire when it changed by **deep** inequality — nested mutation
//! is detected, reference identity is irrelevant, and writes to an ancestor
//! or descendant of the watched path are both caught.
//!
//! The registry is reconciled, not accumulated: owners drop their whole tag
//! and re-register whenever their referenced path set changes, and tear the
//! tag down when the owning field unmounts so no callback outlives it.

use serde_json::Value;

use crate::path::Path;
use crate::store::Store;

#[derive(Debug)]
struct WatchEntry<T> {
    tag: T,
    path: Path,
    snapshot: Value,
}

/// Registry of value watches keyed by caller tags.
#[derive(Debug)]
pub struct WatchRegistry<T> {
    entries: Vec<WatchEntry<T>>,
}

impl<T: Clone + PartialEq> Default for WatchRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq> WatchRegistry<T> {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Watch `path` on behalf of `tag`, snapshotting its current value.
    ///
    /// Re-watching an identical `(tag, path)` pair refreshes the snapshot
    /// instead of duplicating the entry.
    pub fn watch(&mut self, tag: T, path: Path, store: &Store) {
        let snapshot = store.get(&path).cloned().unwrap_or(Value::Null);
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.tag == tag && e.path == path)
        {
            entry.snapshot = snapshot;
            return;
        }
        tracing::debug!(path = %path, "watch registered");
        self.entries.push(WatchEntry {
            tag,
            path,
            snapshot,
        });
    }

    /// Drop every watch owned by `tag`.
    pub fn unwatch(&mut self, tag: &T) {
        let before = self.entries.len();
        self.entries.retain(|e| e.tag != *tag);
        if self.entries.len() != before {
            tracing::debug!(removed = before - self.entries.len(), "watches dropped");
        }
    }

    /// Report a write at `written`; returns the tags whose watched value
    /// changed, deduplicated, in registration order.
    pub fn notify(&mut self, written: &Path, store: &Store) -> Vec<T> {
        let mut fired: Vec<T> = Vec::new();
        for entry in &mut self.entries {
            if !entry.path.overlaps(written) {
                continue;
            }
            let current = store.get(&entry.path).cloned().unwrap_or(Value::Null);
            if current != entry.snapshot {
                entry.snapshot = current;
                if !fired.contains(&entry.tag) {
                    fired.push(entry.tag.clone());
                }
            }
        }
        fired
    }

    /// The paths currently watched by `tag`.
    #[must_use]
    pub fn paths_for(&self, tag: &T) -> Vec<&Path> {
        self.entries
            .iter()
            .filter(|e| e.tag == *tag)
            .map(|e| &e.path)
            .collect()
    }

    /// Total number of watch entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no watches are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(raw: &str) -> Path {
        Path::parse(raw)
    }

    #[test]
    fn fires_on_change_at_watched_path() {
        let mut store = Store::new();
        let mut watches = WatchRegistry::new();
        watches.watch("w", p("a.b"), &store);

        store.set(&p("a.b"), json!(1));
        assert_eq!(watches.notify(&p("a.b"), &store), vec!["w"]);
    }

    #[test]
    fn unreferenced_path_never_fires() {
        let mut store = Store::new();
        let mut watches = WatchRegistry::new();
        watches.watch("w", p("a.b"), &store);

        store.set(&p("x.y"), json!(1));
        assert!(watches.notify(&p("x.y"), &store).is_empty());
    }

    #[test]
    fn write_with_equal_value_does_not_fire() {
        let mut store = Store::new();
        store.set(&p("a.b"), json!(1));
        let mut watches = WatchRegistry::new();
        watches.watch("w", p("a.b"), &store);

        // Same deep value re-written: snapshot compare suppresses the event.
        store.set(&p("a.b"), json!(1));
        assert!(watches.notify(&p("a.b"), &store).is_empty());
    }

    #[test]
    fn ancestor_write_fires_descendant_watch() {
        let mut store = Store::new();
        store.set(&p("a.b"), json!(1));
        let mut watches = WatchRegistry::new();
        watches.watch("w", p("a.b"), &store);

        store.set(&p("a"), json!({"b": 2}));
        assert_eq!(watches.notify(&p("a"), &store), vec!["w"]);
    }

    #[test]
    fn descendant_write_fires_ancestor_watch() {
        let mut store = Store::new();
        store.set(&p("a.b"), json!(1));
        let mut watches = WatchRegistry::new();
        watches.watch("w", p("a"), &store);

        store.set(&p("a.b"), json!(2));
        assert_eq!(watches.notify(&p("a.b"), &store), vec!["w"]);
    }

    #[test]
    fn fired_tags_are_deduplicated() {
        let mut store = Store::new();
        let mut watches = WatchRegistry::new();
        watches.watch("w", p("a.b"), &store);
        watches.watch("w", p("a.c"), &store);

        store.set(&p("a"), json!({"b": 1, "c": 2}));
        assert_eq!(watches.notify(&p("a"), &store), vec!["w"]);
    }

    #[test]
    fn unwatch_drops_all_entries_for_tag() {
        let mut store = Store::new();
        let mut watches = WatchRegistry::new();
        watches.watch("w", p("a"), &store);
        watches.watch("w", p("b"), &store);
        watches.watch("other", p("a"), &store);

        watches.unwatch(&"w");
        assert_eq!(watches.len(), 1);
        store.set(&p("a"), json!(1));
        assert_eq!(watches.notify(&p("a"), &store), vec!["other"]);
    }

    #[test]
    fn rewatching_refreshes_snapshot_without_duplicating() {
        let mut store = Store::new();
        store.set(&p("a"), json!(1));
        let mut watches = WatchRegistry::new();
        watches.watch("w", p("a"), &store);

        store.set(&p("a"), json!(2));
        watches.watch("w", p("a"), &store);
        assert_eq!(watches.len(), 1);
        // Snapshot was refreshed to 2, so notifying now is quiet.
        assert!(watches.notify(&p("a"), &store).is_empty());
    }

    #[test]
    fn removal_of_value_fires_as_change_to_null() {
        let mut store = Store::new();
        store.set(&p("a.b"), json!(1));
        let mut watches = WatchRegistry::new();
        watches.watch("w", p("a.b"), &store);

        store.remove(&p("a.b"));
        assert_eq!(watches.notify(&p("a.b"), &store), vec!["w"]);
    }
}
