//! Child configuration merging.
//!
//! The child build starts from the host's normalized options. The bundle's
//! options are laid over them with [`merge_values`], restricted to the keys in
//! [`PASS_THROUGH_KEYS`], and the result goes back through the host's
//! defaulting rules.

use fob_host::{CompilerOptions, Compiler, Runtime};
use path_clean::PathClean;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::error::{ConfigError, Result};
use super::options::BundlePluginOptions;

/// Options copied from the bundle's configuration onto the child build
pub const PASS_THROUGH_KEYS: &[&str] = &[
    "target",
    "devtool",
    "bail",
    "experiments",
    "externals",
    "externals_presets",
    "mode",
    "module",
    "node",
    "optimization",
    "parallelism",
    "performance",
    "profile",
    "records_path",
    "records_input_path",
    "records_output_path",
    "watch",
    "stats",
];

/// Effective configuration of one child build
#[derive(Debug, Clone, PartialEq)]
pub struct ChildConfig {
    /// Absolute path of the entry module
    pub entry: PathBuf,
    pub options: CompilerOptions,
}

/// Deep-merge `update` into `target`
///
/// | update          | result                         |
/// |-----------------|--------------------------------|
/// | object          | merged key by key (recursive)  |
/// | `null`          | target kept                    |
/// | scalar or array | replaces target                |
pub fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (_, Value::Null) => {}
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                match target_map.get_mut(key) {
                    Some(slot) => merge_values(slot, value),
                    None if value.is_null() => {}
                    None => {
                        target_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target_slot, _) => {
            *target_slot = update.clone();
        }
    }
}

/// Resolve the bundle's entry against the host context.
///
/// # Errors
///
/// - [`ConfigError::MissingEntry`] when no entry is configured
/// - [`ConfigError::EntryOutsideContext`] when it resolves outside `context`
/// - [`ConfigError::EntryNotFound`] when the runtime cannot see it
pub fn resolve_entry(
    options: &BundlePluginOptions,
    context: &Path,
    runtime: &dyn Runtime,
) -> Result<PathBuf> {
    options.validate()?;
    let entry = options
        .entry
        .as_deref()
        .ok_or_else(|| ConfigError::MissingEntry {
            bundle: options.name.clone(),
        })?;

    let context = absolute_context(context, runtime)?;
    let resolved = context.join(entry).clean();
    if !is_within(&resolved, &context) {
        return Err(ConfigError::EntryOutsideContext {
            entry: resolved,
            context,
        });
    }
    if !runtime.exists(&resolved) {
        return Err(ConfigError::EntryNotFound(resolved));
    }
    Ok(resolved)
}

/// Anchor a relative context at the runtime's working directory
fn absolute_context(context: &Path, runtime: &dyn Runtime) -> Result<PathBuf> {
    if context.is_absolute() {
        return Ok(context.to_path_buf().clean());
    }
    let cwd = runtime.get_cwd().map_err(|e| ConfigError::InvalidValue {
        field: "context".to_string(),
        hint: Some(e.to_string()),
    })?;
    Ok(cwd.join(context).clean())
}

/// Lexical containment; a `.` context holds every relative path that does not
/// climb out of it.
fn is_within(path: &Path, context: &Path) -> bool {
    if context == Path::new(".") {
        return path.is_relative() && !path.starts_with("..");
    }
    path.starts_with(context)
}

/// Build the override fragment for the child build
///
/// Contains the child's name, its output location and every pass-through key
/// the bundle sets. Entries are cleared: the child only builds the bundle's
/// entry.
pub fn child_overrides(options: &BundlePluginOptions, base: &CompilerOptions) -> Result<Value> {
    let configured = match serde_json::to_value(options) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(e) => {
            return Err(ConfigError::Merge {
                message: e.to_string(),
            });
        }
    };

    let mut overrides = Map::new();
    overrides.insert("name".to_string(), Value::String(options.name.clone()));
    overrides.insert("entry".to_string(), Value::Object(Map::new()));

    for key in PASS_THROUGH_KEYS {
        if let Some(value) = configured.get(*key).filter(|v| !v.is_null()) {
            overrides.insert((*key).to_string(), value.clone());
        }
    }

    let output = options.output.clone().unwrap_or_default();
    let mut output_map = output.extra;
    if let Some(environment) = output.environment {
        output_map.insert("environment".to_string(), Value::Object(environment));
    }
    let path = output.path.unwrap_or_else(|| base.output.path.clone());
    output_map.insert(
        "path".to_string(),
        Value::String(path.to_string_lossy().into_owned()),
    );
    let filename = output
        .filename
        .unwrap_or_else(|| format!("{}.{}", options.name, base.output.extension()));
    output_map.insert("filename".to_string(), Value::String(filename));
    overrides.insert("output".to_string(), Value::Object(output_map));

    Ok(Value::Object(overrides))
}

/// Merge the bundle's options over the compiler's normalized options.
///
/// Pure: the same options and compiler state always give the same result.
///
/// # Errors
///
/// Entry resolution errors from [`resolve_entry`], and [`ConfigError::Merge`]
/// when the merged configuration is rejected by the host.
pub fn merge_child_options(
    options: &BundlePluginOptions,
    compiler: &dyn Compiler,
) -> Result<ChildConfig> {
    let runtime = compiler.runtime();
    let entry = resolve_entry(options, compiler.context(), runtime.as_ref())?;

    let base = compiler.options();
    let mut merged = base.to_value().map_err(|e| ConfigError::Merge {
        message: e.to_string(),
    })?;
    let overrides = child_overrides(options, base)?;
    merge_values(&mut merged, &overrides);

    // Entries are replaced, not merged
    if let Value::Object(map) = &mut merged {
        map.insert("entry".to_string(), Value::Object(Map::new()));
    }

    let options = compiler
        .apply_defaults(merged)
        .map_err(|e| ConfigError::Merge {
            message: e.to_string(),
        })?;

    Ok(ChildConfig { entry, options })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fob_host::testing::MemoryCompiler;
    use fob_host::{MemoryRuntime, Target};
    use serde_json::json;
    use std::sync::Arc;

    fn host(options: Value) -> MemoryCompiler {
        let runtime = MemoryRuntime::new("/app")
            .with_file("/app/src/index.js", "")
            .with_file("/app/src/sw.js", "");
        let options = CompilerOptions::normalize(options, Path::new("/app")).unwrap();
        MemoryCompiler::new(options, Arc::new(runtime))
    }

    #[test]
    fn merge_values_follows_rule_table() {
        let mut target = json!({
            "a": 1,
            "b": 2,
            "nested": { "x": true, "y": [1, 2] },
            "list": [1, 2, 3]
        });
        merge_values(
            &mut target,
            &json!({
                "b": 3,
                "nested": { "y": [9] , "z": "new" },
                "list": [4],
                "a": null,
                "absent": null
            }),
        );

        assert_eq!(
            target,
            json!({
                "a": 1,
                "b": 3,
                "nested": { "x": true, "y": [9], "z": "new" },
                "list": [4]
            })
        );
    }

    #[test]
    fn merge_values_replaces_scalar_with_object() {
        let mut target = json!({ "stats": "normal" });
        merge_values(&mut target, &json!({ "stats": { "preset": "minimal" } }));
        assert_eq!(target, json!({ "stats": { "preset": "minimal" } }));
    }

    #[test]
    fn output_defaults_to_host_directory_and_extension() {
        let compiler = host(json!({ "output": { "path": "/dist", "filename": "[name].mjs" } }));
        let options = BundlePluginOptions::new("sw", "./src/sw.js");

        let child = merge_child_options(&options, &compiler).unwrap();

        assert_eq!(child.entry, PathBuf::from("/app/src/sw.js"));
        assert_eq!(child.options.output.path, PathBuf::from("/dist"));
        assert_eq!(child.options.output.filename, "sw.mjs");
        assert_eq!(child.options.name.as_deref(), Some("sw"));
    }

    #[test]
    fn output_overrides_win() {
        let compiler = host(json!({ "output": { "path": "/dist", "public_path": "/" } }));
        let options = BundlePluginOptions::new("sw", "./src/sw.js")
            .with_output_path("/public")
            .with_filename("service-worker.js");

        let child = merge_child_options(&options, &compiler).unwrap();

        assert_eq!(child.options.output.path, PathBuf::from("/public"));
        assert_eq!(child.options.output.filename, "service-worker.js");
        assert_eq!(child.options.output.extra["public_path"], json!("/"));
    }

    #[test]
    fn nested_optimization_is_merged_key_by_key() {
        let compiler = host(json!({
            "optimization": { "minimize": true, "split_chunks": { "a": 1, "b": 2 } }
        }));
        let options = BundlePluginOptions::new("sw", "./src/sw.js")
            .with_optimization(json!({ "split_chunks": { "b": 3 } }));

        let child = merge_child_options(&options, &compiler).unwrap();

        assert!(child.options.optimization.minimize);
        assert_eq!(
            Value::Object(child.options.optimization.split_chunks.clone()),
            json!({ "a": 1, "b": 3 })
        );
    }

    #[test]
    fn unset_options_keep_host_values() {
        let compiler = host(json!({
            "target": "web",
            "devtool": "source-map",
            "stats": "verbose",
            "bail": true,
            "entry": { "main": "./src/index.js" }
        }));
        let options = BundlePluginOptions::new("sw", "./src/sw.js").with_target(Target::Webworker);

        let child = merge_child_options(&options, &compiler).unwrap();

        assert_eq!(child.options.target, Some(Target::Webworker));
        assert_eq!(child.options.devtool, json!("source-map"));
        assert_eq!(child.options.stats, json!("verbose"));
        assert!(child.options.bail);
        assert!(child.options.entry.is_empty());
    }

    #[test]
    fn merging_is_idempotent() {
        let compiler = host(json!({ "output": { "path": "/dist" } }));
        let options = BundlePluginOptions::new("sw", "./src/sw.js")
            .with_devtool(false)
            .with_optimization(json!({ "minimize": false }));

        let first = merge_child_options(&options, &compiler).unwrap();
        let second = merge_child_options(&options, &compiler).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_entry_file_is_a_config_error() {
        let compiler = host(json!({}));
        let options = BundlePluginOptions::new("sw", "./src/missing.js");

        let err = merge_child_options(&options, &compiler).unwrap_err();
        assert!(matches!(err, ConfigError::EntryNotFound(path) if path == Path::new("/app/src/missing.js")));
    }

    #[test]
    fn entry_outside_context_is_rejected() {
        let compiler = host(json!({}));
        let options = BundlePluginOptions::new("sw", "../elsewhere/sw.js");

        let err = merge_child_options(&options, &compiler).unwrap_err();
        assert!(matches!(err, ConfigError::EntryOutsideContext { .. }));
    }

    #[test]
    fn relative_context_accepts_entries_inside_it() {
        let runtime = MemoryRuntime::new(".").with_file("src/sw.js", "");
        let options = CompilerOptions::normalize(json!({}), Path::new(".")).unwrap();
        let compiler = MemoryCompiler::new(options, Arc::new(runtime));

        let child =
            merge_child_options(&BundlePluginOptions::new("sw", "./src/sw.js"), &compiler).unwrap();
        assert_eq!(child.entry, PathBuf::from("src/sw.js"));

        let err = merge_child_options(&BundlePluginOptions::new("sw", "../sw.js"), &compiler)
            .unwrap_err();
        assert!(matches!(err, ConfigError::EntryOutsideContext { .. }));
    }

    #[test]
    fn relative_context_is_anchored_at_runtime_cwd() {
        let runtime = MemoryRuntime::new("/app").with_file("/app/web/src/sw.js", "");
        let options = CompilerOptions::normalize(json!({}), Path::new("web")).unwrap();
        let compiler = MemoryCompiler::new(options, Arc::new(runtime));

        let child =
            merge_child_options(&BundlePluginOptions::new("sw", "./src/sw.js"), &compiler).unwrap();
        assert_eq!(child.entry, PathBuf::from("/app/web/src/sw.js"));
    }

    #[test]
    fn malformed_merge_input_is_a_config_error() {
        let compiler = host(json!({}));
        let mut options = BundlePluginOptions::new("sw", "./src/sw.js");
        options.externals_presets = Some(json!("not-an-object"));

        let err = merge_child_options(&options, &compiler).unwrap_err();
        assert!(matches!(err, ConfigError::Merge { .. }));
    }
}
