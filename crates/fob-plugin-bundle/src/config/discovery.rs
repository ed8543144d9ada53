//! File-based discovery of bundle options
//!
//! Bundles can be declared next to the rest of a project's fob configuration,
//! either as `[[bundles]]` tables in `fob.toml` or as a `bundles` array under
//! the `fob` field of `package.json`.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::error::{ConfigError, Result};
use super::options::BundlePluginOptions;

/// File-based bundle discovery
///
/// # Example
///
/// ```no_run
/// use fob_plugin_bundle::BundleDiscovery;
///
/// let bundles = BundleDiscovery::new(".").load().unwrap();
/// for bundle in &bundles {
///     println!("{}", bundle.name);
/// }
/// ```
#[derive(Debug)]
pub struct BundleDiscovery {
    root: PathBuf,
}

impl BundleDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Find a config file declaring bundles
    ///
    /// Searches in this order:
    /// 1. fob.toml
    /// 2. package.json (fob field)
    pub fn find(&self) -> Option<PathBuf> {
        let toml_path = self.root.join("fob.toml");
        if toml_path.exists() {
            return Some(toml_path);
        }

        let pkg_path = self.root.join("package.json");
        let content = fs::read_to_string(&pkg_path).ok()?;
        let parsed: Value = serde_json::from_str(&content).ok()?;
        match parsed.get("fob") {
            Some(fob) if !fob.is_null() => Some(pkg_path),
            _ => None,
        }
    }

    /// Load and validate every declared bundle
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if no config file is found.
    pub fn load(&self) -> Result<Vec<BundlePluginOptions>> {
        let path = self.find().ok_or(ConfigError::NotFound)?;
        let config = self.read_config(&path)?;
        parse_bundles(&config)
    }

    fn read_config(&self, path: &Path) -> Result<Value> {
        let content = fs::read_to_string(path)?;

        if path.file_name() == Some(std::ffi::OsStr::new("package.json")) {
            let parsed: Value =
                serde_json::from_str(&content).map_err(|e| ConfigError::InvalidValue {
                    field: "package.json".to_string(),
                    hint: Some(format!("Invalid JSON: {}", e)),
                })?;
            return Ok(parsed.get("fob").cloned().unwrap_or(Value::Null));
        }

        let toml_val: toml::Value =
            toml::from_str(&content).map_err(|e| ConfigError::InvalidValue {
                field: "toml".to_string(),
                hint: Some(format!("Invalid TOML syntax: {}", e)),
            })?;
        serde_json::to_value(toml_val).map_err(|e| ConfigError::InvalidValue {
            field: "toml".to_string(),
            hint: Some(format!("TOML to JSON conversion failed: {}", e)),
        })
    }
}

fn parse_bundles(config: &Value) -> Result<Vec<BundlePluginOptions>> {
    let Some(bundles) = config.get("bundles") else {
        return Ok(Vec::new());
    };
    let Value::Array(items) = bundles else {
        return Err(ConfigError::InvalidValue {
            field: "bundles".to_string(),
            hint: Some("`bundles` must be an array of tables".to_string()),
        });
    };

    let mut parsed = Vec::with_capacity(items.len());
    for item in items {
        let options = BundlePluginOptions::from_value(item.clone())?;
        options.validate()?;
        if parsed
            .iter()
            .any(|existing: &BundlePluginOptions| existing.name == options.name)
        {
            return Err(ConfigError::InvalidValue {
                field: "bundles".to_string(),
                hint: Some(format!("bundle '{}' is declared twice", options.name)),
            });
        }
        parsed.push(options);
    }
    Ok(parsed)
}

/// Discover bundles declared in the current directory (convenience function)
pub fn discover_bundles() -> Result<Vec<BundlePluginOptions>> {
    let root = std::env::current_dir()?;
    BundleDiscovery::new(&root).load()
}
