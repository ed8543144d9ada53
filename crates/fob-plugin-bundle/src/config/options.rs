//! Options for the additional bundle.

use fob_host::{Mode, Target};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

use super::error::{ConfigError, Result};

/// Output overrides for the bundle
///
/// Keys left unset fall back to the host's output options; `path` defaults to
/// the host output directory and `filename` to `<name>.<ext>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Language features the bundle's runtime may use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Map<String, Value>>,

    /// Any other output key, merged over the host's
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Configuration of the additional bundle
///
/// Every option except `name` and `entry` is optional; unset options keep the
/// host's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundlePluginOptions {
    /// Bundle name. Also the name of the child build and of its entry point.
    pub name: String,

    /// Entry module, relative to the host's context directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<PathBuf>,

    /// Execution environment of the bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputOverrides>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devtool: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,

    /// Merged key by key over the host's optimization settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimization: Option<Value>,

    /// Set to `false` to leave dynamic `import()` handling to the host in
    /// every build, including the bundle's own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bail: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiments: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub externals: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub externals_presets: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,

    /// Module handling rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<Value>,

    /// Node.js environment shims
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<u32>,

    /// Performance budgets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_input_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_output_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch: Option<bool>,
}

impl BundlePluginOptions {
    /// Create options for a bundle named `name` starting at `entry`
    ///
    /// # Example
    ///
    /// ```
    /// use fob_plugin_bundle::BundlePluginOptions;
    /// use fob_host::Target;
    ///
    /// let options = BundlePluginOptions::new("sw", "./src/sw.js")
    ///     .with_target(Target::Webworker)
    ///     .with_filename("service-worker.js");
    ///
    /// assert_eq!(options.name, "sw");
    /// ```
    pub fn new(name: impl Into<String>, entry: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            entry: Some(entry.into()),
            ..Self::default()
        }
    }

    /// Create from serde_json::Value (for programmatic config)
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "bundle".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Check the options that can be verified without a host
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidName {
                name: self.name.clone(),
            });
        }
        match &self.entry {
            Some(entry) if !entry.as_os_str().is_empty() => Ok(()),
            _ => Err(ConfigError::MissingEntry {
                bundle: self.name.clone(),
            }),
        }
    }

    /// Whether dynamic imports of the bundle's own modules are filtered
    pub fn filters_imports(&self) -> bool {
        self.import != Some(false)
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the output directory
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output.get_or_insert_with(OutputOverrides::default).path = Some(path.into());
        self
    }

    /// Set the output filename
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.output.get_or_insert_with(OutputOverrides::default).filename = Some(filename.into());
        self
    }

    pub fn with_devtool(mut self, devtool: impl Into<Value>) -> Self {
        self.devtool = Some(devtool.into());
        self
    }

    pub fn with_stats(mut self, stats: impl Into<Value>) -> Self {
        self.stats = Some(stats.into());
        self
    }

    pub fn with_optimization(mut self, optimization: Value) -> Self {
        self.optimization = Some(optimization);
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Enable or disable dynamic import filtering
    pub fn with_import(mut self, enabled: bool) -> Self {
        self.import = Some(enabled);
        self
    }
}
