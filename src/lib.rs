//! devloop: the core engine behind a live-coding development mode.
//!
//! Four cooperating pieces:
//!
//! - [`watcher`] observes source trees and delivers batched, deduplicated
//!   change events to registered listeners.
//! - [`graph`] consolidates per-contributor dependency maps into one
//!   recompilation graph over outermost compilation units.
//! - [`compiler`] reconciles compiler flag lists from repeated compile
//!   requests into one normalized configuration.
//! - [`launch`] assembles the deterministic command line used to relaunch
//!   the application after a successful recompile.
//!
//! The pieces are independent; a dev-mode control loop wires them together:
//! watch, map changes to invalidated units, recompile with the reconciled
//! flags, relaunch with the rebuilt command line.

pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod launch;
pub mod watcher;

pub use compiler::CompilerFlags;
pub use config::DevLoopConfig;
pub use error::{DevLoopError, DevLoopResult};
pub use graph::consolidate::{RawDependencyMap, consolidate};
pub use graph::index::{InMemoryTypeIndex, TypeId, TypeIndex};
pub use graph::RecompilationGraph;
pub use launch::extension::{
    ArtifactKey, ExtensionDevModeConfig, ExtensionDevModeJvmOptionFilter,
};
pub use launch::jvm_options::{JvmOption, JvmOptions, JvmOptionsBuilder, XxValue};
pub use launch::{DevModeCommandLine, DevModeCommandLineBuilder};
pub use watcher::event::{ChangeKind, FileChangeEvent};
pub use watcher::{DirectoryWatcher, FileChangeCallback, FileSystemWatcher, WatchRegistration};
