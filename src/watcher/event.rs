use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// What happened to a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The path did not exist in the previous snapshot and now does.
    Added,
    /// The path existed and its content or metadata changed.
    Modified,
    /// The path existed in the snapshot and is now gone.
    Removed,
}

/// A single classified filesystem change.
///
/// Value equality on `(path, kind)` — two events for the same path and kind
/// are the same event for batching purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileChangeEvent {
    path: PathBuf,
    kind: ChangeKind,
}

impl FileChangeEvent {
    pub fn new(path: PathBuf, kind: ChangeKind) -> Self {
        Self { path, kind }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// NDJSON-friendly rendering for callers streaming change feeds.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Deduplicate a drained batch on `(path, kind)`, keeping first-occurrence
/// order so a path's own events are never reordered.
///
/// A `Modified` following an `Added` for the same path within one batch is
/// dropped: native backends routinely report a creation as a create event
/// plus a content-write event, but one `Added` already tells the listener
/// everything it needs.
pub(crate) fn dedup_batch(events: Vec<FileChangeEvent>) -> Vec<FileChangeEvent> {
    let mut seen: HashSet<FileChangeEvent> = HashSet::new();
    let mut out = Vec::with_capacity(events.len());
    for event in events {
        if event.kind == ChangeKind::Modified {
            let added = FileChangeEvent::new(event.path.clone(), ChangeKind::Added);
            if seen.contains(&added) {
                continue;
            }
        }
        if seen.insert(event.clone()) {
            out.push(event);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(path: &str, kind: ChangeKind) -> FileChangeEvent {
        FileChangeEvent::new(PathBuf::from(path), kind)
    }

    #[test]
    fn test_value_equality_on_path_and_kind() {
        assert_eq!(ev("a.java", ChangeKind::Added), ev("a.java", ChangeKind::Added));
        assert_ne!(ev("a.java", ChangeKind::Added), ev("a.java", ChangeKind::Removed));
        assert_ne!(ev("a.java", ChangeKind::Added), ev("b.java", ChangeKind::Added));
    }

    #[test]
    fn test_dedup_collapses_repeated_pairs() {
        let batch = dedup_batch(vec![
            ev("a", ChangeKind::Modified),
            ev("b", ChangeKind::Modified),
            ev("a", ChangeKind::Modified),
        ]);
        assert_eq!(
            batch,
            vec![ev("a", ChangeKind::Modified), ev("b", ChangeKind::Modified)],
            "duplicate (path, kind) pairs collapse, first occurrence wins"
        );
    }

    #[test]
    fn test_dedup_drops_modified_after_added() {
        let batch = dedup_batch(vec![
            ev("new.java", ChangeKind::Added),
            ev("new.java", ChangeKind::Modified),
        ]);
        assert_eq!(batch, vec![ev("new.java", ChangeKind::Added)]);
    }

    #[test]
    fn test_dedup_keeps_added_after_removed() {
        // Delete-then-recreate within one window is a real sequence and both
        // events must survive in real-time order.
        let batch = dedup_batch(vec![
            ev("x.java", ChangeKind::Removed),
            ev("x.java", ChangeKind::Added),
        ]);
        assert_eq!(
            batch,
            vec![ev("x.java", ChangeKind::Removed), ev("x.java", ChangeKind::Added)]
        );
    }

    #[test]
    fn test_to_json_contains_kind_tag() {
        let json = ev("src/App.java", ChangeKind::Removed).to_json();
        assert!(json.contains("\"removed\""), "json was: {json}");
    }
}
