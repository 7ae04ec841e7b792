//! Recursive filesystem watching with batched, deduplicated change delivery.
//!
//! One `FileSystemWatcher` owns one background drain thread and one watch
//! backend (native or polling, selected at construction). Roots are attached
//! with [`DirectoryWatcher::watch_path`]; every registered callback receives
//! its own copy of every batch for its root, on the watcher thread. Callbacks
//! must be fast and non-blocking — a slow listener delays the next drain
//! cycle for everyone on this watcher instance.

pub mod event;
mod poll;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, channel};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use notify::RecursiveMode;

use crate::config::DevLoopConfig;
use crate::error::{DevLoopError, DevLoopResult};
use event::{ChangeKind, FileChangeEvent, dedup_batch};
use poll::Backend;

/// Receives one deduplicated batch per drain cycle.
///
/// Implemented for any `Fn(Vec<FileChangeEvent>) + Send + Sync` closure.
pub trait FileChangeCallback: Send + Sync {
    fn handle_changes(&self, changes: Vec<FileChangeEvent>);
}

impl<F> FileChangeCallback for F
where
    F: Fn(Vec<FileChangeEvent>) + Send + Sync,
{
    fn handle_changes(&self, changes: Vec<FileChangeEvent>) {
        self(changes)
    }
}

/// Capability interface over a recursive directory watcher.
///
/// `watch_path` attaches a root and returns a handle that deregisters the
/// listener when closed or dropped. `close` stops the watcher wholesale and
/// is idempotent; no new batches are dispatched after it begins.
pub trait DirectoryWatcher {
    fn watch_path(
        &self,
        root: &Path,
        callback: Box<dyn FileChangeCallback>,
    ) -> DevLoopResult<WatchRegistration>;

    fn close(&mut self);
}

struct Registration {
    id: u64,
    root: PathBuf,
    callback: Box<dyn FileChangeCallback>,
}

struct Shared {
    registrations: Mutex<Vec<Arc<Registration>>>,
    /// Roots registered before they exist on disk; the drain loop retries
    /// attaching them each cycle until they appear.
    pending_roots: Mutex<Vec<PathBuf>>,
    /// Known-state view of every attached tree, used to classify raw events.
    snapshot: Mutex<HashSet<PathBuf>>,
    closed: AtomicBool,
    next_id: AtomicU64,
    exclude: Vec<String>,
}

/// The concrete watcher: native OS backend or polling fallback behind the
/// same drain loop.
pub struct FileSystemWatcher {
    shared: Arc<Shared>,
    backend: Arc<Mutex<Option<Backend>>>,
    thread: Option<JoinHandle<()>>,
}

impl FileSystemWatcher {
    /// Create a watcher with the backend and timings from `config`.
    ///
    /// Backend creation failure (e.g. the OS refusing more watch instances)
    /// surfaces here rather than being deferred.
    pub fn new(config: &DevLoopConfig) -> DevLoopResult<Self> {
        let (tx, rx) = channel::<poll::RawEventResult>();
        let backend = Arc::new(Mutex::new(Some(poll::create_backend(config, tx)?)));

        let shared = Arc::new(Shared {
            registrations: Mutex::new(Vec::new()),
            pending_roots: Mutex::new(Vec::new()),
            snapshot: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
            exclude: config.exclude.clone(),
        });

        let thread = {
            let shared = Arc::clone(&shared);
            let backend = Arc::clone(&backend);
            let debounce = config.debounce();
            std::thread::Builder::new()
                .name("devloop-watcher".to_string())
                .spawn(move || drain_loop(shared, backend, rx, debounce))?
        };

        Ok(Self {
            shared,
            backend,
            thread: Some(thread),
        })
    }

    /// Watcher with default configuration.
    pub fn with_defaults() -> DevLoopResult<Self> {
        Self::new(&DevLoopConfig::default())
    }
}

impl DirectoryWatcher for FileSystemWatcher {
    fn watch_path(
        &self,
        root: &Path,
        callback: Box<dyn FileChangeCallback>,
    ) -> DevLoopResult<WatchRegistration> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(DevLoopError::WatcherClosed);
        }

        let root = root.to_path_buf();
        if root.exists() {
            if !root.is_dir() {
                return Err(DevLoopError::NotADirectory { path: root });
            }
            attach_root(&self.shared, &self.backend, &root)?;
        } else {
            // Not there yet; the drain loop will pick it up once it appears.
            self.shared.pending_roots.lock().unwrap().push(root.clone());
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        self.shared
            .registrations
            .lock()
            .unwrap()
            .push(Arc::new(Registration {
                id,
                root: root.clone(),
                callback,
            }));

        Ok(WatchRegistration {
            id,
            root,
            shared: Arc::downgrade(&self.shared),
            backend: Arc::downgrade(&self.backend),
        })
    }

    fn close(&mut self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Dropping the backend releases every native watch and disconnects
        // the raw-event channel, which also wakes the drain thread.
        *self.backend.lock().unwrap() = None;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        self.shared.registrations.lock().unwrap().clear();
        self.shared.pending_roots.lock().unwrap().clear();
    }
}

impl Drop for FileSystemWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Handle for one `watch_path` registration. Closing (or dropping) it stops
/// delivery to that listener; the root's backend watch is released once no
/// listener remains on it.
pub struct WatchRegistration {
    id: u64,
    root: PathBuf,
    shared: Weak<Shared>,
    backend: Weak<Mutex<Option<Backend>>>,
}

impl WatchRegistration {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deregister this listener. Idempotent.
    pub fn close(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let root_still_used = {
            let mut regs = shared.registrations.lock().unwrap();
            regs.retain(|r| r.id != self.id);
            regs.iter().any(|r| r.root == self.root)
        };
        if !root_still_used {
            shared
                .pending_roots
                .lock()
                .unwrap()
                .retain(|p| p != &self.root);
            if let Some(backend) = self.backend.upgrade() {
                if let Some(watcher) = backend.lock().unwrap().as_mut() {
                    // WatchNotFound here just means the root never attached.
                    let _ = watcher.unwatch(&self.root);
                }
            }
        }
    }
}

impl Drop for WatchRegistration {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Drain loop
// ---------------------------------------------------------------------------

/// How the backend described a raw event, before snapshot classification.
#[derive(Debug, Clone, Copy)]
enum RawHint {
    Create,
    Remove,
    Other,
}

fn hint_of(kind: &notify::EventKind) -> RawHint {
    use notify::EventKind;
    match kind {
        EventKind::Create(_) => RawHint::Create,
        EventKind::Remove(_) => RawHint::Remove,
        _ => RawHint::Other,
    }
}

/// Attach an existing root to the backend and seed the snapshot with its
/// current contents, so pre-existing files classify as `Modified` rather
/// than `Added` on their first change.
fn attach_root(
    shared: &Shared,
    backend: &Arc<Mutex<Option<Backend>>>,
    root: &Path,
) -> DevLoopResult<()> {
    {
        let mut guard = backend.lock().unwrap();
        let watcher = guard.as_mut().ok_or(DevLoopError::WatcherClosed)?;
        watcher.watch(root, RecursiveMode::Recursive)?;
    }
    let mut snapshot = shared.snapshot.lock().unwrap();
    for path in poll::scan(root, &shared.exclude) {
        snapshot.insert(path);
    }
    Ok(())
}

fn drain_loop(
    shared: Arc<Shared>,
    backend: Arc<Mutex<Option<Backend>>>,
    rx: Receiver<poll::RawEventResult>,
    debounce: Duration,
) {
    const TICK: Duration = Duration::from_millis(25);

    let mut pending: Vec<(PathBuf, RawHint)> = Vec::new();
    let mut last_event: Option<Instant> = None;

    loop {
        if shared.closed.load(Ordering::SeqCst) {
            break;
        }

        attach_pending_roots(&shared, &backend);

        match rx.recv_timeout(TICK) {
            Ok(Ok(raw)) => {
                let hint = hint_of(&raw.kind);
                for path in raw.paths {
                    if poll::is_ignored(&path, &shared.exclude) {
                        continue;
                    }
                    pending.push((path, hint));
                }
                last_event = Some(Instant::now());
            }
            Ok(Err(err)) => {
                // A lost watch on a vanished directory is routine; the
                // snapshot diff below reports the removal.
                tracing::warn!("watch backend error: {err}");
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let quiet_long_enough = last_event
            .map(|at| at.elapsed() >= debounce)
            .unwrap_or(false);
        if quiet_long_enough && !pending.is_empty() {
            let raw = std::mem::take(&mut pending);
            last_event = None;
            let batch = classify(&shared, raw);
            if !batch.is_empty() {
                dispatch(&shared, &batch);
            }
        }
    }
}

/// Attach roots that were registered before they existed, once they appear.
/// A freshly appeared tree is reported as `Added` in full.
fn attach_pending_roots(shared: &Shared, backend: &Arc<Mutex<Option<Backend>>>) {
    let attachable: Vec<PathBuf> = {
        let mut pending = shared.pending_roots.lock().unwrap();
        if pending.is_empty() {
            return;
        }
        let (ready, waiting): (Vec<_>, Vec<_>) =
            pending.drain(..).partition(|root| root.is_dir());
        *pending = waiting;
        ready
    };

    for root in attachable {
        match attach_root_as_new(shared, backend, &root) {
            Ok(events) => {
                tracing::debug!("attached late root {}", root.display());
                if !events.is_empty() {
                    dispatch(shared, &dedup_batch(events));
                }
            }
            Err(err) => {
                tracing::warn!("could not attach root {}: {err}", root.display());
                shared.pending_roots.lock().unwrap().push(root);
            }
        }
    }
}

/// Like `attach_root`, but the tree is new to the watcher: everything under
/// it becomes an `Added` event instead of silently seeding the snapshot.
fn attach_root_as_new(
    shared: &Shared,
    backend: &Arc<Mutex<Option<Backend>>>,
    root: &Path,
) -> DevLoopResult<Vec<FileChangeEvent>> {
    {
        let mut guard = backend.lock().unwrap();
        let watcher = guard.as_mut().ok_or(DevLoopError::WatcherClosed)?;
        watcher.watch(root, RecursiveMode::Recursive)?;
    }
    let mut snapshot = shared.snapshot.lock().unwrap();
    let mut events = Vec::new();
    for path in poll::scan(root, &shared.exclude) {
        if snapshot.insert(path.clone()) {
            events.push(FileChangeEvent::new(path, ChangeKind::Added));
        }
    }
    Ok(events)
}

/// Classify one drained cycle of raw events against the snapshot, in raw
/// arrival order, updating the snapshot as it goes.
fn classify(shared: &Shared, raw: Vec<(PathBuf, RawHint)>) -> Vec<FileChangeEvent> {
    let mut snapshot = shared.snapshot.lock().unwrap();
    let mut out = Vec::new();

    for (path, hint) in raw {
        let exists = match std::fs::symlink_metadata(&path) {
            Ok(_) => true,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
            Err(err) => {
                tracing::warn!("skipping event for {}: {err}", path.display());
                continue;
            }
        };
        let known = snapshot.contains(&path);

        match (exists, known) {
            (true, false) => {
                snapshot.insert(path.clone());
                let is_dir = path.is_dir();
                out.push(FileChangeEvent::new(path.clone(), ChangeKind::Added));
                if is_dir {
                    // Files can land inside a directory before its watch is
                    // effective; sweep it so their first events are not lost.
                    for child in poll::scan(&path, &shared.exclude) {
                        if snapshot.insert(child.clone()) {
                            out.push(FileChangeEvent::new(child, ChangeKind::Added));
                        }
                    }
                }
            }
            (true, true) => {
                out.push(FileChangeEvent::new(path, ChangeKind::Modified));
            }
            (false, true) => {
                snapshot.remove(&path);
                // A removed directory takes its known children with it.
                let children: Vec<PathBuf> = snapshot
                    .iter()
                    .filter(|p| p.starts_with(&path))
                    .cloned()
                    .collect();
                out.push(FileChangeEvent::new(path, ChangeKind::Removed));
                for child in children {
                    snapshot.remove(&child);
                    out.push(FileChangeEvent::new(child, ChangeKind::Removed));
                }
            }
            (false, false) => {
                if matches!(hint, RawHint::Create) {
                    // Created and deleted within one window. Both events are
                    // delivered, in real time order.
                    out.push(FileChangeEvent::new(path.clone(), ChangeKind::Added));
                    out.push(FileChangeEvent::new(path, ChangeKind::Removed));
                }
            }
        }
    }

    dedup_batch(out)
}

/// Deliver a batch to every registration whose root contains the event path.
/// Each callback gets its own copy; dispatch happens without holding the
/// registration lock so callbacks may themselves register new roots.
fn dispatch(shared: &Shared, batch: &[FileChangeEvent]) {
    if shared.closed.load(Ordering::SeqCst) {
        return;
    }
    let registrations: Vec<Arc<Registration>> =
        shared.registrations.lock().unwrap().iter().cloned().collect();

    for registration in registrations {
        let scoped: Vec<FileChangeEvent> = batch
            .iter()
            .filter(|e| e.path().starts_with(&registration.root))
            .cloned()
            .collect();
        if !scoped.is_empty() {
            registration.callback.handle_changes(scoped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_shared(exclude: Vec<String>) -> Arc<Shared> {
        Arc::new(Shared {
            registrations: Mutex::new(Vec::new()),
            pending_roots: Mutex::new(Vec::new()),
            snapshot: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
            exclude,
        })
    }

    #[test]
    fn test_classify_added_for_unknown_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("A.java");
        std::fs::write(&file, "class A {}").unwrap();

        let shared = test_shared(Vec::new());
        let batch = classify(&shared, vec![(file.clone(), RawHint::Create)]);
        assert_eq!(batch, vec![FileChangeEvent::new(file.clone(), ChangeKind::Added)]);
        assert!(
            shared.snapshot.lock().unwrap().contains(&file),
            "snapshot must learn the new path"
        );
    }

    #[test]
    fn test_classify_modified_for_known_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("A.java");
        std::fs::write(&file, "class A {}").unwrap();

        let shared = test_shared(Vec::new());
        shared.snapshot.lock().unwrap().insert(file.clone());
        let batch = classify(&shared, vec![(file.clone(), RawHint::Other)]);
        assert_eq!(batch, vec![FileChangeEvent::new(file, ChangeKind::Modified)]);
    }

    #[test]
    fn test_classify_removed_for_known_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("gone.java");

        let shared = test_shared(Vec::new());
        shared.snapshot.lock().unwrap().insert(file.clone());
        let batch = classify(&shared, vec![(file.clone(), RawHint::Remove)]);
        assert_eq!(batch, vec![FileChangeEvent::new(file.clone(), ChangeKind::Removed)]);
        assert!(!shared.snapshot.lock().unwrap().contains(&file));
    }

    #[test]
    fn test_classify_removed_directory_takes_children() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        let child = sub.join("B.java");

        let shared = test_shared(Vec::new());
        {
            let mut snapshot = shared.snapshot.lock().unwrap();
            snapshot.insert(sub.clone());
            snapshot.insert(child.clone());
        }
        let batch = classify(&shared, vec![(sub.clone(), RawHint::Remove)]);
        assert_eq!(batch.len(), 2, "directory and child both removed: {batch:?}");
        assert!(batch.contains(&FileChangeEvent::new(child, ChangeKind::Removed)));
        assert!(shared.snapshot.lock().unwrap().is_empty());
    }

    #[test]
    fn test_classify_transient_create_delete_preserves_order() {
        let shared = test_shared(Vec::new());
        let ghost = PathBuf::from("/nonexistent-devloop-test/ghost.java");
        let batch = classify(&shared, vec![(ghost.clone(), RawHint::Create)]);
        assert_eq!(
            batch,
            vec![
                FileChangeEvent::new(ghost.clone(), ChangeKind::Added),
                FileChangeEvent::new(ghost, ChangeKind::Removed),
            ]
        );
    }

    #[test]
    fn test_classify_new_directory_sweeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("fresh");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("Raced.java"), "class Raced {}").unwrap();

        let shared = test_shared(Vec::new());
        let batch = classify(&shared, vec![(sub.clone(), RawHint::Create)]);
        assert_eq!(batch.len(), 2, "directory plus swept child: {batch:?}");
        assert_eq!(batch[0], FileChangeEvent::new(sub.clone(), ChangeKind::Added));
        assert!(batch.contains(&FileChangeEvent::new(sub.join("Raced.java"), ChangeKind::Added)));
    }

    #[test]
    fn test_dispatch_scopes_by_root_and_copies_per_listener() {
        let shared = test_shared(Vec::new());
        let seen_a: Arc<Mutex<Vec<Vec<FileChangeEvent>>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_b: Arc<Mutex<Vec<Vec<FileChangeEvent>>>> = Arc::new(Mutex::new(Vec::new()));

        let push = |sink: Arc<Mutex<Vec<Vec<FileChangeEvent>>>>| {
            move |batch: Vec<FileChangeEvent>| sink.lock().unwrap().push(batch)
        };
        {
            let mut regs = shared.registrations.lock().unwrap();
            regs.push(Arc::new(Registration {
                id: 0,
                root: PathBuf::from("/proj/src"),
                callback: Box::new(push(Arc::clone(&seen_a))),
            }));
            regs.push(Arc::new(Registration {
                id: 1,
                root: PathBuf::from("/proj"),
                callback: Box::new(push(Arc::clone(&seen_b))),
            }));
        }

        let batch = vec![
            FileChangeEvent::new(PathBuf::from("/proj/src/A.java"), ChangeKind::Modified),
            FileChangeEvent::new(PathBuf::from("/proj/pom.xml"), ChangeKind::Modified),
        ];
        dispatch(&shared, &batch);

        let a = seen_a.lock().unwrap();
        let b = seen_b.lock().unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].len(), 1, "src listener sees only the src event");
        assert_eq!(b[0].len(), 2, "root listener sees both events");
    }

    #[test]
    fn test_dispatch_after_close_is_silent() {
        let shared = test_shared(Vec::new());
        let seen: Arc<Mutex<Vec<Vec<FileChangeEvent>>>> = Arc::new(Mutex::new(Vec::new()));
        {
            let sink = Arc::clone(&seen);
            shared.registrations.lock().unwrap().push(Arc::new(Registration {
                id: 0,
                root: PathBuf::from("/proj"),
                callback: Box::new(move |batch: Vec<FileChangeEvent>| {
                    sink.lock().unwrap().push(batch)
                }),
            }));
        }
        shared.closed.store(true, Ordering::SeqCst);
        dispatch(
            &shared,
            &[FileChangeEvent::new(PathBuf::from("/proj/x"), ChangeKind::Added)],
        );
        assert!(seen.lock().unwrap().is_empty());
    }
}
