use std::collections::BTreeSet;
use std::fmt;

use super::jvm_options::JvmOptions;

/// Identity of an extension artifact, `group:artifact` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    group_id: String,
    artifact_id: String,
}

impl ArtifactKey {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

/// Dev-mode runtime configuration contributed by one extension: JVM options
/// to append, plus option names whose framework-chosen default this
/// extension opts out of.
///
/// A locked name only prevents *automatic* defaulting (e.g. the tiering
/// tweak or the debug-agent attach); explicit user or extension
/// configuration still applies.
#[derive(Debug, Clone)]
pub struct ExtensionDevModeConfig {
    artifact_key: ArtifactKey,
    jvm_options: JvmOptions,
    locked_default_option_names: BTreeSet<String>,
}

impl ExtensionDevModeConfig {
    pub fn new(
        artifact_key: ArtifactKey,
        jvm_options: JvmOptions,
        locked_default_option_names: BTreeSet<String>,
    ) -> Self {
        Self {
            artifact_key,
            jvm_options,
            locked_default_option_names,
        }
    }

    pub fn artifact_key(&self) -> &ArtifactKey {
        &self.artifact_key
    }

    pub fn jvm_options(&self) -> &JvmOptions {
        &self.jvm_options
    }

    pub fn locked_default_option_names(&self) -> &BTreeSet<String> {
        &self.locked_default_option_names
    }
}

/// User-level filter governing which extension contributions are honored
/// for one relaunch decision.
#[derive(Debug, Clone, Default)]
pub struct ExtensionDevModeJvmOptionFilter {
    disable_all: bool,
    disable_for: Vec<ArtifactKey>,
}

impl ExtensionDevModeJvmOptionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_disable_all(&mut self, disable_all: bool) {
        self.disable_all = disable_all;
    }

    pub fn is_disable_all(&self) -> bool {
        self.disable_all
    }

    pub fn set_disable_for(&mut self, artifacts: Vec<ArtifactKey>) {
        self.disable_for = artifacts;
    }

    /// Whether this extension's contribution is suppressed. Keys naming no
    /// known extension are silently ignored — there is simply nothing to
    /// suppress.
    pub fn is_disabled(&self, key: &ArtifactKey) -> bool {
        self.disable_all || self.disable_for.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_key_display() {
        let key = ArtifactKey::new("io.acme", "acme-messaging");
        assert_eq!(key.to_string(), "io.acme:acme-messaging");
    }

    #[test]
    fn test_filter_disable_all_wins() {
        let mut filter = ExtensionDevModeJvmOptionFilter::new();
        filter.set_disable_all(true);
        assert!(filter.is_disabled(&ArtifactKey::new("any", "thing")));
    }

    #[test]
    fn test_filter_disable_for_matches_exact_key() {
        let mut filter = ExtensionDevModeJvmOptionFilter::new();
        filter.set_disable_for(vec![ArtifactKey::new("io.acme", "a")]);
        assert!(filter.is_disabled(&ArtifactKey::new("io.acme", "a")));
        assert!(!filter.is_disabled(&ArtifactKey::new("io.acme", "b")));
    }
}
