//! Compiler flag reconciliation.
//!
//! Repeated compile requests and multiple contributors each hand over flag
//! lists; `CompilerFlags` merges them into one normalized, redundancy-free
//! configuration. Merging never fails: conflicting scalar settings resolve
//! last-write-wins because dev mode must stay permissive to keep iterating.

use std::collections::BTreeSet;

const RELEASE_OPTION: &str = "--release";
const SOURCE_OPTION: &str = "-source";
const TARGET_OPTION: &str = "-target";

/// A reconciled, immutable set of compiler flags.
///
/// `x_flags` is the "must always be present, order-independent" set; `flags`
/// is ordered, as given, minus anything `x_flags` already guarantees. The
/// scalar `release`/`source`/`target` fields coexist in the model even
/// though a compiler honors only `release` when both are requested — this
/// type tracks what was requested and leaves the ambiguity to the compiler.
#[derive(Debug, Clone)]
pub struct CompilerFlags {
    x_flags: Vec<String>,
    flags: Vec<String>,
    release: Option<String>,
    source: Option<String>,
    target: Option<String>,
    /// Scalars discovered literally in the token stream; `to_args` must not
    /// re-emit those.
    release_in_stream: bool,
    source_in_stream: bool,
    target_in_stream: bool,
    compiler_plugin_artifacts: Option<Vec<String>>,
}

impl CompilerFlags {
    /// Merging constructor. Absent collections normalize to empty; absent
    /// scalars stay absent unless discovered while scanning `flags`.
    ///
    /// The scan recognizes `--release V`, `-source V` and `-target V` with
    /// last-occurrence-wins semantics, overwriting any directly passed
    /// scalar — the most recent compile request's settings take precedence.
    pub fn new(
        x_flags: Option<Vec<String>>,
        flags: Option<Vec<String>>,
        release: Option<String>,
        source: Option<String>,
        target: Option<String>,
        compiler_plugin_artifacts: Option<Vec<String>>,
    ) -> Self {
        let flags = flags.unwrap_or_default();

        let mut normalized_x = Vec::new();
        for flag in x_flags.unwrap_or_default() {
            if !normalized_x.contains(&flag) {
                normalized_x.push(flag);
            }
        }

        let mut this = Self {
            x_flags: normalized_x,
            flags: Vec::new(),
            release,
            source,
            target,
            release_in_stream: false,
            source_in_stream: false,
            target_in_stream: false,
            compiler_plugin_artifacts,
        };

        let mut iter = flags.iter().peekable();
        while let Some(token) = iter.next() {
            match token.as_str() {
                RELEASE_OPTION => {
                    if let Some(value) = iter.peek() {
                        this.release = Some((*value).clone());
                        this.release_in_stream = true;
                    }
                }
                SOURCE_OPTION => {
                    if let Some(value) = iter.peek() {
                        this.source = Some((*value).clone());
                        this.source_in_stream = true;
                    }
                }
                TARGET_OPTION => {
                    if let Some(value) = iter.peek() {
                        this.target = Some((*value).clone());
                        this.target_in_stream = true;
                    }
                }
                _ => {}
            }
        }

        // Redundancy reduction: anything x_flags already guarantees is
        // dropped from the ordered list.
        this.flags = flags
            .into_iter()
            .filter(|f| !this.x_flags.contains(f))
            .collect();

        this
    }

    pub fn release(&self) -> Option<&str> {
        self.release.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn compiler_plugin_artifacts(&self) -> Option<&[String]> {
        self.compiler_plugin_artifacts.as_deref()
    }

    /// Serialize back to an ordered argument list: the x-flag set first (in
    /// insertion order), the remaining flags as given, then any scalar that
    /// was supplied directly rather than discovered in the token stream.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> =
            self.x_flags.iter().chain(self.flags.iter()).cloned().collect();

        if let Some(release) = &self.release {
            if !self.release_in_stream {
                args.push(RELEASE_OPTION.to_string());
                args.push(release.clone());
            }
        }
        if let Some(source) = &self.source {
            if !self.source_in_stream {
                args.push(SOURCE_OPTION.to_string());
                args.push(source.clone());
            }
        }
        if let Some(target) = &self.target {
            if !self.target_in_stream {
                args.push(TARGET_OPTION.to_string());
                args.push(target.clone());
            }
        }

        args
    }

    fn token_set(&self) -> BTreeSet<&str> {
        self.x_flags
            .iter()
            .chain(self.flags.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Construction order does not affect equality: a token guaranteed through
/// `x_flags` and the same token passed in `flags` produce equal values.
impl PartialEq for CompilerFlags {
    fn eq(&self, other: &Self) -> bool {
        self.token_set() == other.token_set()
            && self.release == other.release
            && self.source == other.source
            && self.target == other.target
            && self.compiler_plugin_artifacts == other.compiler_plugin_artifacts
    }
}

impl Eq for CompilerFlags {}
