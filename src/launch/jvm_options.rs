//! JVM option model: an ordered multimap of standard options plus
//! `XX`-style booleans and values, with deterministic command-line
//! rendering.

/// Option names that legitimately need multiple independent occurrences on
/// the command line and must never be comma-joined.
const REPEATABLE_OPTIONS: &[&str] = &["add-opens", "add-exports", "add-reads", "patch-module"];

/// Value of an `XX`-style option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XxValue {
    /// Renders as `-XX:+Name` / `-XX:-Name`.
    Enabled(bool),
    /// Renders as `-XX:Name=value`.
    Value(String),
}

/// One JVM option with its accumulated values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JvmOption {
    /// `--name`, `--name=value`, `--name=v1,v2,...` or repeated
    /// `--name value` pairs depending on the name and value count.
    Standard { name: String, values: Vec<String> },
    /// `-XX:...` option.
    Xx { name: String, value: XxValue },
}

impl JvmOption {
    pub fn name(&self) -> &str {
        match self {
            JvmOption::Standard { name, .. } => name,
            JvmOption::Xx { name, .. } => name,
        }
    }

    /// Render this option to its command-line token(s).
    ///
    /// Multi-value standard options are value-sorted and comma-joined so the
    /// output is deterministic and independent of contribution order;
    /// repeatable options preserve contribution order as separate pairs.
    pub fn to_cli_options(&self) -> Vec<String> {
        match self {
            JvmOption::Standard { name, values } => {
                if values.is_empty() {
                    return vec![format!("--{name}")];
                }
                if REPEATABLE_OPTIONS.contains(&name.as_str()) {
                    let mut out = Vec::with_capacity(values.len() * 2);
                    for value in values {
                        out.push(format!("--{name}"));
                        out.push(value.clone());
                    }
                    return out;
                }
                if values.len() == 1 {
                    return vec![format!("--{name}={}", values[0])];
                }
                let mut sorted = values.clone();
                sorted.sort();
                vec![format!("--{name}={}", sorted.join(","))]
            }
            JvmOption::Xx { name, value } => match value {
                XxValue::Enabled(true) => vec![format!("-XX:+{name}")],
                XxValue::Enabled(false) => vec![format!("-XX:-{name}")],
                XxValue::Value(v) => vec![format!("-XX:{name}={v}")],
            },
        }
    }
}

/// Ordered collection of JVM options. Repeated additions under the same name
/// accumulate values on the existing entry; insertion order of names is
/// preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JvmOptions {
    options: Vec<JvmOption>,
}

impl JvmOptions {
    pub fn builder() -> JvmOptionsBuilder {
        JvmOptionsBuilder::default()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.options.iter().any(|o| o.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &JvmOption> {
        self.options.iter()
    }

    /// Render every option in insertion order.
    pub fn to_cli_options(&self) -> Vec<String> {
        self.options.iter().flat_map(JvmOption::to_cli_options).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct JvmOptionsBuilder {
    options: JvmOptions,
}

impl JvmOptionsBuilder {
    /// Add a flag-only standard option (`--name`).
    pub fn add(&mut self, name: impl Into<String>) -> &mut Self {
        self.entry(name.into());
        self
    }

    /// Add one value for a standard option, accumulating with any values
    /// already contributed under the same name.
    pub fn add_value(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let idx = self.entry(name.into());
        if let JvmOption::Standard { values, .. } = &mut self.options.options[idx] {
            values.push(value.into());
        }
        self
    }

    /// Add several values for a standard option.
    pub fn add_all<I, S>(&mut self, name: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        for value in values {
            self.add_value(name.clone(), value);
        }
        self
    }

    /// Add an `XX` boolean option, overwriting any previous state for the
    /// same name.
    pub fn add_xx_bool(&mut self, name: impl Into<String>, enabled: bool) -> &mut Self {
        self.put_xx(name.into(), XxValue::Enabled(enabled));
        self
    }

    /// Add a valued `XX` option, overwriting any previous value for the
    /// same name.
    pub fn add_xx_value(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.put_xx(name.into(), XxValue::Value(value.into()));
        self
    }

    /// Merge every option from `other`, accumulating standard values and
    /// overwriting `XX` states.
    pub fn add_all_options(&mut self, other: &JvmOptions) -> &mut Self {
        for option in other.iter() {
            match option {
                JvmOption::Standard { name, values } => {
                    if values.is_empty() {
                        self.add(name.clone());
                    } else {
                        self.add_all(name.clone(), values.iter().cloned());
                    }
                }
                JvmOption::Xx { name, value } => {
                    self.put_xx(name.clone(), value.clone());
                }
            }
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.options.contains(name)
    }

    pub fn build(self) -> JvmOptions {
        self.options
    }

    fn entry(&mut self, name: String) -> usize {
        if let Some(idx) = self
            .options
            .options
            .iter()
            .position(|o| matches!(o, JvmOption::Standard { name: n, .. } if *n == name))
        {
            return idx;
        }
        self.options.options.push(JvmOption::Standard {
            name,
            values: Vec::new(),
        });
        self.options.options.len() - 1
    }

    fn put_xx(&mut self, name: String, value: XxValue) {
        if let Some(idx) = self
            .options
            .options
            .iter()
            .position(|o| matches!(o, JvmOption::Xx { name: n, .. } if *n == name))
        {
            self.options.options[idx] = JvmOption::Xx { name, value };
            return;
        }
        self.options.options.push(JvmOption::Xx { name, value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_only_option_renders_bare() {
        let mut builder = JvmOptions::builder();
        builder.add("enable-preview");
        assert_eq!(builder.build().to_cli_options(), vec!["--enable-preview"]);
    }

    #[test]
    fn test_single_value_option_renders_equals_form() {
        let mut builder = JvmOptions::builder();
        builder.add_value("limit-modules", "java.base");
        assert_eq!(
            builder.build().to_cli_options(),
            vec!["--limit-modules=java.base"]
        );
    }

    #[test]
    fn test_multi_value_option_sorted_and_comma_joined() {
        let mut builder = JvmOptions::builder();
        builder.add_value("add-modules", "zeta.mod");
        builder.add_value("add-modules", "alpha.mod");
        assert_eq!(
            builder.build().to_cli_options(),
            vec!["--add-modules=alpha.mod,zeta.mod"],
            "values sort so output is independent of contribution order"
        );
    }

    #[test]
    fn test_repeatable_option_renders_pairs_in_order() {
        let mut builder = JvmOptions::builder();
        builder.add_value("add-opens", "java.base/java.lang=ALL-UNNAMED");
        builder.add_value("add-opens", "java.base/java.io=ALL-UNNAMED");
        assert_eq!(
            builder.build().to_cli_options(),
            vec![
                "--add-opens",
                "java.base/java.lang=ALL-UNNAMED",
                "--add-opens",
                "java.base/java.io=ALL-UNNAMED",
            ],
            "repeatable options are never comma-joined and keep their order"
        );
    }

    #[test]
    fn test_xx_bool_rendering() {
        let mut builder = JvmOptions::builder();
        builder.add_xx_bool("UseZGC", true);
        builder.add_xx_bool("TieredCompilation", false);
        assert_eq!(
            builder.build().to_cli_options(),
            vec!["-XX:+UseZGC", "-XX:-TieredCompilation"]
        );
    }

    #[test]
    fn test_xx_value_rendering_and_overwrite() {
        let mut builder = JvmOptions::builder();
        builder.add_xx_value("TieredStopAtLevel", "4");
        builder.add_xx_value("TieredStopAtLevel", "1");
        assert_eq!(builder.build().to_cli_options(), vec!["-XX:TieredStopAtLevel=1"]);
    }

    #[test]
    fn test_merge_accumulates_standard_values() {
        let mut contributed = JvmOptions::builder();
        contributed.add_value("add-opens", "java.base/java.lang=ALL-UNNAMED");
        let contributed = contributed.build();

        let mut builder = JvmOptions::builder();
        builder.add_value("add-opens", "java.base/java.nio=ALL-UNNAMED");
        builder.add_all_options(&contributed);

        let rendered = builder.build().to_cli_options();
        assert_eq!(rendered.len(), 4, "two pairs: {rendered:?}");
    }

    #[test]
    fn test_contains_sees_both_kinds() {
        let mut builder = JvmOptions::builder();
        builder.add("enable-preview");
        builder.add_xx_value("TieredStopAtLevel", "1");
        assert!(builder.contains("enable-preview"));
        assert!(builder.contains("TieredStopAtLevel"));
        assert!(!builder.contains("add-opens"));
    }
}
