//! Normalized compiler options.
//!
//! Hosts keep their configuration as typed [`CompilerOptions`]. Plugins that
//! need to derive a configuration work on its `serde_json::Value` form and hand
//! the result back to [`CompilerOptions::normalize`], which applies the
//! host-wide defaulting rules.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};

use crate::{HostError, Result};

/// Default output filename template
pub const DEFAULT_FILENAME: &str = "[name].js";

/// Execution environment a bundle is compiled for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    Web,
    Webworker,
    Node,
    AsyncNode,
    ElectronMain,
    ElectronRenderer,
    ElectronPreload,
    /// Any other target string (e.g. `"browserslist:last 2 versions"`)
    #[serde(untagged)]
    Custom(String),
}

/// Build mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    #[default]
    Production,
    None,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputOptions {
    /// Output directory as an absolute path
    #[serde(default)]
    pub path: PathBuf,

    /// Filename template for entry chunks (`[name]` is replaced)
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Filename template for split chunks
    #[serde(default = "default_filename")]
    pub chunk_filename: String,

    /// Language features the generated runtime may use
    #[serde(default)]
    pub environment: Map<String, Value>,

    /// Output keys the host does not interpret itself
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            filename: default_filename(),
            chunk_filename: default_filename(),
            environment: Map::new(),
            extra: Map::new(),
        }
    }
}

impl OutputOptions {
    /// Render the entry filename template for a chunk name
    pub fn render_filename(&self, name: &str) -> String {
        self.filename.replace("[name]", name)
    }

    /// Render the split-chunk filename template for a chunk name
    pub fn render_chunk_filename(&self, name: &str) -> String {
        self.chunk_filename.replace("[name]", name)
    }

    /// Extension used by the filename template, without the dot
    ///
    /// Falls back to `js` when the template has none.
    pub fn extension(&self) -> &str {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("js")
    }
}

/// Optimization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOptions {
    #[serde(default)]
    pub minimize: bool,

    /// Chunk-splitting knobs, merged key by key
    #[serde(default = "default_split_chunks")]
    pub split_chunks: Map<String, Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            minimize: false,
            split_chunks: default_split_chunks(),
            extra: Map::new(),
        }
    }
}

/// Module handling rules and per-type parser options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleOptions {
    #[serde(default)]
    pub rules: Vec<Value>,

    /// Parser options keyed by module type (e.g. `"javascript/auto"`)
    #[serde(default)]
    pub parser: Map<String, Value>,
}

/// Normalized compiler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerOptions {
    /// Build name; child compilers are identified by it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Base directory for resolving entry points
    #[serde(default)]
    pub context: PathBuf,

    /// Entry points (name -> module path)
    #[serde(default)]
    pub entry: IndexMap<String, PathBuf>,

    #[serde(default)]
    pub output: OutputOptions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,

    /// Source map mode (`false` or a devtool string)
    #[serde(default = "default_false")]
    pub devtool: Value,

    #[serde(default)]
    pub bail: bool,

    #[serde(default)]
    pub experiments: Map<String, Value>,

    #[serde(default)]
    pub externals: Value,

    #[serde(default)]
    pub externals_presets: Map<String, Value>,

    #[serde(default)]
    pub mode: Mode,

    #[serde(default)]
    pub module: ModuleOptions,

    /// Node.js environment shims
    #[serde(default = "default_false")]
    pub node: Value,

    #[serde(default)]
    pub optimization: OptimizationOptions,

    #[serde(default = "default_parallelism")]
    pub parallelism: u32,

    /// Performance budgets
    #[serde(default = "default_false")]
    pub performance: Value,

    #[serde(default)]
    pub profile: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_input_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_output_path: Option<PathBuf>,

    #[serde(default)]
    pub watch: bool,

    /// Stats verbosity (preset string or object)
    #[serde(default = "default_stats")]
    pub stats: Value,
}

impl CompilerOptions {
    /// Build options from a partial configuration, applying host-wide defaults.
    ///
    /// Missing keys take their defaults; a missing or relative output path is
    /// placed under `context` (`<context>/dist` when absent).
    ///
    /// # Errors
    ///
    /// Returns [`HostError::InvalidOptions`] when the value does not describe
    /// a valid configuration.
    pub fn normalize(partial: Value, context: &Path) -> Result<Self> {
        let partial = match partial {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let mut options: CompilerOptions =
            serde_json::from_value(partial).map_err(|e| HostError::InvalidOptions(e.to_string()))?;

        if options.context.as_os_str().is_empty() {
            options.context = context.to_path_buf();
        }
        if options.output.path.as_os_str().is_empty() {
            options.output.path = options.context.join("dist");
        } else if options.output.path.is_relative() {
            options.output.path = options.context.join(&options.output.path);
        }

        Ok(options)
    }

    /// Defaults for a build rooted at `context`
    pub fn with_context(context: impl AsRef<Path>) -> Self {
        let context = context.as_ref().to_path_buf();
        let mut options = Self::default();
        options.output.path = context.join("dist");
        options.context = context;
        options
    }

    /// Serialize into the value form used for merging
    ///
    /// # Errors
    ///
    /// Returns [`HostError::InvalidOptions`] if a field cannot be serialized.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| HostError::InvalidOptions(e.to_string()))
    }

    /// Parser options for a module type, if any were configured
    pub fn parser_options(&self, module_type: &str) -> Option<&Value> {
        self.module.parser.get(module_type)
    }
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            name: None,
            context: PathBuf::new(),
            entry: IndexMap::new(),
            output: OutputOptions::default(),
            target: None,
            devtool: default_false(),
            bail: false,
            experiments: Map::new(),
            externals: Value::Null,
            externals_presets: Map::new(),
            mode: Mode::default(),
            module: ModuleOptions::default(),
            node: default_false(),
            optimization: OptimizationOptions::default(),
            parallelism: default_parallelism(),
            performance: default_false(),
            profile: false,
            records_path: None,
            records_input_path: None,
            records_output_path: None,
            watch: false,
            stats: default_stats(),
        }
    }
}

fn default_filename() -> String {
    DEFAULT_FILENAME.to_string()
}

fn default_false() -> Value {
    Value::Bool(false)
}

fn default_stats() -> Value {
    Value::String("normal".to_string())
}

fn default_parallelism() -> u32 {
    100
}

fn default_split_chunks() -> Map<String, Value> {
    match json!({ "chunks": "async", "min_size": 20000 }) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_applies_host_defaults() {
        let options = CompilerOptions::normalize(json!({}), Path::new("/app")).unwrap();

        assert_eq!(options.context, PathBuf::from("/app"));
        assert_eq!(options.output.path, PathBuf::from("/app/dist"));
        assert_eq!(options.output.filename, "[name].js");
        assert_eq!(options.mode, Mode::Production);
        assert_eq!(options.parallelism, 100);
        assert_eq!(options.stats, json!("normal"));
        assert_eq!(options.optimization.split_chunks["chunks"], json!("async"));
        assert_eq!(options.devtool, json!(false));
    }

    #[test]
    fn with_context_matches_normalized_defaults() {
        let normalized = CompilerOptions::normalize(json!({}), Path::new("/app")).unwrap();
        assert_eq!(CompilerOptions::with_context("/app"), normalized);
    }

    #[test]
    fn normalize_keeps_explicit_values() {
        let options = CompilerOptions::normalize(
            json!({
                "name": "main",
                "output": { "path": "/dist", "filename": "[name].mjs", "public_path": "/" },
                "target": "webworker",
                "mode": "development"
            }),
            Path::new("/app"),
        )
        .unwrap();

        assert_eq!(options.name.as_deref(), Some("main"));
        assert_eq!(options.output.path, PathBuf::from("/dist"));
        assert_eq!(options.output.extension(), "mjs");
        assert_eq!(options.output.extra["public_path"], json!("/"));
        assert_eq!(options.target, Some(Target::Webworker));
        assert_eq!(options.mode, Mode::Development);
    }

    #[test]
    fn normalize_resolves_relative_output_path() {
        let options =
            CompilerOptions::normalize(json!({ "output": { "path": "build" } }), Path::new("/app"))
                .unwrap();
        assert_eq!(options.output.path, PathBuf::from("/app/build"));
    }

    #[test]
    fn normalize_rejects_malformed_values() {
        let result = CompilerOptions::normalize(json!({ "parallelism": "many" }), Path::new("/"));
        assert!(matches!(result, Err(HostError::InvalidOptions(_))));
    }

    #[test]
    fn custom_target_round_trips_as_string() {
        let target: Target = serde_json::from_value(json!("browserslist:defaults")).unwrap();
        assert_eq!(target, Target::Custom("browserslist:defaults".to_string()));
        assert_eq!(serde_json::to_value(&target).unwrap(), json!("browserslist:defaults"));
    }

    #[test]
    fn filename_extension_falls_back_to_js() {
        let mut output = OutputOptions::default();
        assert_eq!(output.extension(), "js");
        output.filename = "[name]".to_string();
        assert_eq!(output.extension(), "js");
        output.filename = "bundles/[name].cjs".to_string();
        assert_eq!(output.extension(), "cjs");
        assert_eq!(output.render_filename("sw"), "bundles/sw.cjs");
    }
}
