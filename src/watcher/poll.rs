//! Watch backend construction and snapshot scans.
//!
//! Both backends speak the same raw-event channel; the drain loop in
//! `watcher::mod` neither knows nor cares which one is feeding it. Callers on
//! platforms without a usable native watch primitive (or who distrust it, e.g.
//! on network filesystems) set `force_polling` and accept event latency no
//! tighter than the poll interval.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use notify::{PollWatcher, RecommendedWatcher, Watcher};

use crate::config::DevLoopConfig;
use crate::error::DevLoopResult;

pub(super) type Backend = Box<dyn Watcher + Send>;
pub(super) type RawEventResult = notify::Result<notify::Event>;

/// Create the OS-native watch backend, or the polling fallback when the
/// configuration forces it.
pub(super) fn create_backend(
    config: &DevLoopConfig,
    tx: Sender<RawEventResult>,
) -> DevLoopResult<Backend> {
    let handler = move |res: RawEventResult| {
        // The drain loop may already have shut down; nothing to do then.
        let _ = tx.send(res);
    };

    if config.force_polling {
        let backend_config = notify::Config::default().with_poll_interval(config.poll_interval());
        Ok(Box::new(PollWatcher::new(handler, backend_config)?))
    } else {
        Ok(Box::new(RecommendedWatcher::new(
            handler,
            notify::Config::default(),
        )?))
    }
}

/// Should the watcher pretend this path does not exist?
///
/// `.git` is always skipped; everything else is driven by the configured
/// exclude substrings. The same predicate filters both snapshot scans and
/// incoming raw events so the two views of the tree cannot disagree.
pub(super) fn is_ignored(path: &Path, exclude: &[String]) -> bool {
    if path.components().any(|c| c.as_os_str() == ".git") {
        return true;
    }
    let text = path.to_string_lossy();
    exclude.iter().any(|pattern| text.contains(pattern.as_str()))
}

/// Recursively list every entry under `root` (directories included, `root`
/// itself excluded), skipping ignored paths.
///
/// Used to seed the known-state snapshot when a root is attached and to sweep
/// a just-created directory for files that raced in before its watch took
/// effect.
pub(super) fn scan(root: &Path, exclude: &[String]) -> Vec<PathBuf> {
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .build();

    let mut paths = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!("snapshot scan error under {}: {err}", root.display());
                continue;
            }
        };
        let path = entry.path();
        if path == root || is_ignored(path, exclude) {
            continue;
        }
        paths.push(path.to_path_buf());
    }
    paths
}
