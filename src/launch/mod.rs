//! Relaunch command-line assembly.
//!
//! On every relaunch decision the control thread configures a
//! [`DevModeCommandLineBuilder`] and builds a fresh [`DevModeCommandLine`];
//! the result is never reused across relaunches because flags, classpath and
//! extension contributions may all have changed. Given identical
//! configuration the produced argument vector is byte-identical across
//! builds, which is what lets callers detect "the relaunch command did not
//! actually change".

pub mod extension;
pub mod jvm_options;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{DevLoopError, DevLoopResult};
use extension::{ArtifactKey, ExtensionDevModeConfig, ExtensionDevModeJvmOptionFilter};
use jvm_options::{JvmOptions, JvmOptionsBuilder};

const TIERED_STOP_AT_LEVEL: &str = "TieredStopAtLevel";
const AGENTLIB_JDWP: &str = "agentlib:jdwp";
const DEFAULT_DEBUG_PORT: u16 = 5005;

fn valid_debug() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^(true|false|client|[0-9]+)$").expect("static pattern"))
}

/// The assembled, immutable relaunch command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevModeCommandLine {
    args: Vec<String>,
    project_dir: Option<PathBuf>,
    output_dir: PathBuf,
    build_dir: Option<PathBuf>,
}

impl DevModeCommandLine {
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn into_arguments(self) -> Vec<String> {
        self.args
    }

    pub fn project_dir(&self) -> Option<&Path> {
        self.project_dir.as_deref()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn build_dir(&self) -> Option<&Path> {
        self.build_dir.as_deref()
    }
}

/// Fluent builder for the relaunch argument vector.
///
/// Setters may be called in any order and overwrite idempotently; `build()`
/// is terminal. Option *names* are passed through verbatim — this builder
/// assembles and orders, it does not validate option semantics.
#[derive(Debug, Clone)]
pub struct DevModeCommandLineBuilder {
    executable: PathBuf,
    jvm_args: Vec<String>,
    jvm_options: JvmOptionsBuilder,
    debug: Option<String>,
    suspend: Option<String>,
    debug_host: String,
    debug_port: u16,
    force_c2: Option<bool>,
    application_name: Option<String>,
    application_version: Option<String>,
    application_args: Vec<String>,
    project_dir: Option<PathBuf>,
    build_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    classpath: Vec<PathBuf>,
    main_class: Option<String>,
    ext_dev_mode_config: Vec<ExtensionDevModeConfig>,
    option_filter: ExtensionDevModeJvmOptionFilter,
}

impl DevModeCommandLineBuilder {
    /// Start a builder for the given runtime executable. An empty path is a
    /// configuration error, raised here rather than deferred to `build()`.
    pub fn new(executable: impl Into<PathBuf>) -> DevLoopResult<Self> {
        let executable = executable.into();
        if executable.as_os_str().is_empty() {
            return Err(DevLoopError::MissingExecutable);
        }
        Ok(Self {
            executable,
            jvm_args: Vec::new(),
            jvm_options: JvmOptions::builder(),
            debug: None,
            suspend: None,
            debug_host: "localhost".to_string(),
            debug_port: DEFAULT_DEBUG_PORT,
            force_c2: None,
            application_name: None,
            application_version: None,
            application_args: Vec::new(),
            project_dir: None,
            build_dir: None,
            output_dir: None,
            classpath: Vec::new(),
            main_class: None,
            ext_dev_mode_config: Vec::new(),
            option_filter: ExtensionDevModeJvmOptionFilter::default(),
        })
    }

    /// `None` restores the default tiering decision; `Some(true)` re-enables
    /// normal tiering (and drops any extension-contributed
    /// `TieredStopAtLevel`), `Some(false)` forces the dev-mode tweak on.
    pub fn force_c2(mut self, force: Option<bool>) -> Self {
        self.force_c2 = force;
        self
    }

    pub fn jvm_arg(mut self, arg: impl Into<String>) -> Self {
        self.jvm_args.push(arg.into());
        self
    }

    pub fn jvm_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.jvm_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Debug mode: `"true"`, `"false"`, `"client"` or a port number. Leaving
    /// it unset means "enabled by default unless an extension locked the
    /// debug-agent default".
    pub fn debug(mut self, debug: impl Into<String>) -> Self {
        self.debug = Some(debug.into());
        self
    }

    pub fn suspend(mut self, suspend: impl Into<String>) -> Self {
        self.suspend = Some(suspend.into());
        self
    }

    pub fn debug_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        if !host.is_empty() {
            self.debug_host = host;
        }
        self
    }

    pub fn debug_port(mut self, port: u16) -> Self {
        self.debug_port = port;
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    pub fn application_version(mut self, version: impl Into<String>) -> Self {
        self.application_version = Some(version.into());
        self
    }

    pub fn application_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.application_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    pub fn build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_dir = Some(dir.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn classpath_entry(mut self, entry: impl Into<PathBuf>) -> Self {
        self.classpath.push(entry.into());
        self
    }

    pub fn main_class(mut self, main: impl Into<String>) -> Self {
        self.main_class = Some(main.into());
        self
    }

    pub fn add_opens(mut self, value: impl Into<String>) -> Self {
        self.jvm_options.add_value("add-opens", value);
        self
    }

    pub fn add_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.jvm_options.add_all("add-modules", modules);
        self
    }

    pub fn extension_dev_mode_config(mut self, configs: Vec<ExtensionDevModeConfig>) -> Self {
        self.ext_dev_mode_config = configs;
        self
    }

    pub fn extension_dev_mode_jvm_option_filter(
        mut self,
        filter: ExtensionDevModeJvmOptionFilter,
    ) -> Self {
        self.option_filter = filter;
        self
    }

    /// Assemble the argument vector. Precedence, in order: base dev-mode
    /// properties, debug agent (lock-aware default), tiering tweak
    /// (lock-aware default), extension and user JVM options, extra JVM
    /// args, classpath, directory references, main class, application args.
    pub fn build(mut self) -> DevLoopResult<DevModeCommandLine> {
        let output_dir = self.output_dir.take().ok_or(DevLoopError::MissingOutputDir)?;

        let mut args = vec![self.executable.display().to_string()];

        if let Some(name) = &self.application_name {
            args.push(format!("-Ddevloop.application.name={name}"));
        }
        if let Some(version) = &self.application_version {
            args.push(format!("-Ddevloop.application.version={version}"));
        }
        args.push("-Ddevloop.live-reload=true".to_string());

        let locked_options = self.add_extension_jvm_options();

        if self.is_disable_c2(&locked_options) {
            // Keep the second-tier compiler out of dev mode; relaunches are
            // short-lived and first-tier startup wins.
            args.push(format!("-XX:{TIERED_STOP_AT_LEVEL}=1"));
        }

        if self.debug.is_none() && locked_options.contains_key(AGENTLIB_JDWP) {
            tracing::info!(
                "extension(s) {} disable the debug mode default; debugging can still be \
                 enabled explicitly",
                format_keys(&locked_options[AGENTLIB_JDWP])
            );
        } else {
            self.configure_debugging(&mut args)?;
        }

        let options = std::mem::take(&mut self.jvm_options).build();
        for option in options.iter() {
            if self.force_c2.is_some() && option.name() == TIERED_STOP_AT_LEVEL {
                continue;
            }
            args.extend(option.to_cli_options());
        }

        args.append(&mut self.jvm_args);

        if !self.classpath.is_empty() {
            let separator = if cfg!(windows) { ";" } else { ":" };
            args.push("-cp".to_string());
            args.push(
                self.classpath
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(separator),
            );
        }

        args.push(format!("-Ddevloop.output-dir={}", output_dir.display()));
        if let Some(build_dir) = &self.build_dir {
            args.push(format!("-Ddevloop.build-dir={}", build_dir.display()));
        }

        if let Some(main_class) = &self.main_class {
            args.push(main_class.clone());
        }
        args.append(&mut self.application_args);

        Ok(DevModeCommandLine {
            args,
            project_dir: self.project_dir,
            output_dir,
            build_dir: self.build_dir,
        })
    }

    /// Merge JVM options contributed by extensions, honoring the filter, and
    /// collect which extensions locked which default option names.
    ///
    /// `disable_all` discards contributions *and* locks wholesale — with
    /// every extension silenced there is nothing left to veto a default.
    fn add_extension_jvm_options(&mut self) -> BTreeMap<String, Vec<ArtifactKey>> {
        let mut locked: BTreeMap<String, Vec<ArtifactKey>> = BTreeMap::new();
        if self.ext_dev_mode_config.is_empty() || self.option_filter.is_disable_all() {
            return locked;
        }
        let configs = std::mem::take(&mut self.ext_dev_mode_config);
        for config in &configs {
            let key = config.artifact_key();
            if self.option_filter.is_disabled(key) {
                tracing::debug!("skipped JVM options from {key}");
                continue;
            }
            if !config.jvm_options().is_empty() {
                tracing::debug!("adding JVM options from {key}");
                self.jvm_options.add_all_options(config.jvm_options());
            }
            for name in config.locked_default_option_names() {
                locked.entry(name.clone()).or_default().push(key.clone());
            }
        }
        locked
    }

    /// Whether to add the dev-mode tiering tweak. The user's explicit choice
    /// wins; an extension-contributed value or an extension lock both
    /// suppress the automatic default.
    fn is_disable_c2(&self, locked_options: &BTreeMap<String, Vec<ArtifactKey>>) -> bool {
        if let Some(force) = self.force_c2 {
            return !force;
        }
        if self.jvm_options.contains(TIERED_STOP_AT_LEVEL) {
            return false;
        }
        if let Some(extensions) = locked_options.get(TIERED_STOP_AT_LEVEL) {
            tracing::info!(
                "extension(s) {} enable the second-tier compiler, which dev mode otherwise \
                 disables for faster relaunch",
                format_keys(extensions)
            );
            return false;
        }
        true
    }

    fn configure_debugging(&self, args: &mut Vec<String>) -> DevLoopResult<()> {
        let suspend = match self.suspend.as_deref() {
            Some("y") | Some("true") => "y",
            Some("n") | Some("false") | None => "n",
            Some(other) => {
                tracing::warn!(
                    "ignoring invalid value \"{other}\" for \"suspend\" and defaulting to \"n\""
                );
                "n"
            }
        };

        let mut port = self.debug_port;
        if let Some(debug) = self.debug.as_deref() {
            if !valid_debug().is_match(debug) {
                return Err(DevLoopError::InvalidDebugValue {
                    value: debug.to_string(),
                });
            }
            if let Ok(requested) = debug.parse::<u16>() {
                port = requested;
            }
        }

        match self.debug.as_deref() {
            Some("false") => {}
            Some("client") => args.push(format!(
                "-{AGENTLIB_JDWP}=transport=dt_socket,address={}:{port},server=n,suspend={suspend}",
                self.debug_host
            )),
            _ => args.push(format!(
                "-{AGENTLIB_JDWP}=transport=dt_socket,address={}:{port},server=y,suspend={suspend}",
                self.debug_host
            )),
        }
        Ok(())
    }
}

fn format_keys(keys: &[ArtifactKey]) -> String {
    keys.iter()
        .map(ArtifactKey::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
