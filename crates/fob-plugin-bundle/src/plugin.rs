//! Child build orchestration.
//!
//! On every host build the plugin runs one child build:
//!
//! ```text
//! make ─▶ configure ─▶ run ─▶ reconcile ─▶ make resolves
//!          │            │       │
//!          │            │       └─ diagnostics appended, entries first-writer-wins
//!          │            └─ child bound to the host context and runtime
//!          └─ entry resolved, file dependency added, options merged
//! ```
//!
//! Nothing survives between builds; a rebuild starts again from configure.

use async_trait::async_trait;
use fob_host::{ChildCompiler, ChildOutput, Compilation, Compiler, HostError, MakeHook};
use indexmap::map::Entry;
use std::sync::Arc;

use crate::config::{BundlePluginOptions, ChildConfig, merge_child_options};
use crate::filter::ImportFilter;
use crate::{Error, PLUGIN_NAME, Result};

/// Builds an additional bundle for a selected execution environment as a child
/// of the host build.
///
/// # Example
///
/// ```rust,ignore
/// use fob_plugin_bundle::{BundlePluginOptions, FobBundlePlugin};
/// use fob_host::Target;
///
/// let plugin = FobBundlePlugin::new(
///     BundlePluginOptions::new("sw", "./src/sw.js").with_target(Target::Webworker),
/// );
/// plugin.apply(&compiler);
/// ```
#[derive(Debug, Clone)]
pub struct FobBundlePlugin {
    options: Arc<BundlePluginOptions>,
}

impl FobBundlePlugin {
    pub fn new(options: BundlePluginOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    /// Plugin name used for hook registration
    pub fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    pub fn options(&self) -> &BundlePluginOptions {
        &self.options
    }

    /// Register the plugin's handlers on a compiler
    pub fn apply(&self, compiler: &dyn Compiler) {
        let hooks = compiler.hooks();
        hooks.tap_make(
            PLUGIN_NAME,
            BundleMake {
                options: Arc::clone(&self.options),
            },
        );

        if self.options.filters_imports() {
            hooks.tap_parser(PLUGIN_NAME, ImportFilter::new(self.options.name.clone()));
        }
    }
}

struct BundleMake {
    options: Arc<BundlePluginOptions>,
}

#[async_trait]
impl MakeHook for BundleMake {
    async fn make(
        &self,
        compiler: &dyn Compiler,
        compilation: &mut Compilation,
    ) -> fob_host::Result<()> {
        self.build(compiler, compilation)
            .await
            .map_err(|e| HostError::plugin(PLUGIN_NAME, e))
    }
}

impl BundleMake {
    async fn build(&self, compiler: &dyn Compiler, compilation: &mut Compilation) -> Result<()> {
        let bundle = self.options.name.as_str();

        let config = configure(&self.options, compiler, compilation)?;
        tracing::debug!(
            bundle,
            entry = %config.entry.display(),
            output = %config.options.output.path.display(),
            "configured child build"
        );

        let child = create_child(compiler, compilation, bundle, config)?;
        let output = child.run_as_child().await.map_err(|source| Error::ChildBuild {
            name: bundle.to_string(),
            source,
        })?;

        reconcile(compilation, bundle, output);
        Ok(())
    }
}

/// Resolve the entry, register it as a dependency and merge the child options
fn configure(
    options: &BundlePluginOptions,
    compiler: &dyn Compiler,
    compilation: &mut Compilation,
) -> Result<ChildConfig> {
    let config = merge_child_options(options, compiler)?;
    compilation.add_file_dependency(&config.entry);
    Ok(config)
}

/// Create the child compiler, bound to the host's context and runtime, with
/// the bundle's entry as its only entry.
fn create_child(
    compiler: &dyn Compiler,
    compilation: &Compilation,
    bundle: &str,
    config: ChildConfig,
) -> Result<Box<dyn ChildCompiler>> {
    let mut child = compiler.create_child_compiler(compilation, bundle, config.options)?;
    child.bind(compiler.context(), compiler.runtime());
    child.add_entry(compiler.context(), &config.entry, bundle);
    Ok(child)
}

/// Fold a finished child build into the host compilation
fn reconcile(compilation: &mut Compilation, bundle: &str, output: ChildOutput) {
    let ChildOutput {
        entries,
        compilation: child,
    } = output;

    tracing::debug!(
        bundle,
        warnings = child.warnings.len(),
        errors = child.errors.len(),
        "child build finished"
    );

    compilation.warnings.extend(child.warnings);
    compilation.errors.extend(child.errors);

    for entry in entries {
        match compilation.entrypoints.entry(entry.name.clone()) {
            Entry::Occupied(_) => {
                tracing::warn!(
                    bundle,
                    entry = %entry.name,
                    "host already defines this entry point, keeping the host's"
                );
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
    }

    for (filename, asset) in child.assets {
        let key = match compilation.assets.get(&filename) {
            None => filename,
            // Same relative name, different output directory
            Some(existing) if existing.path != asset.path => {
                asset.path.to_string_lossy().into_owned()
            }
            Some(existing) => {
                if existing.content != asset.content {
                    tracing::warn!(
                        bundle,
                        asset = %filename,
                        "asset conflicts with a host asset, keeping the host's"
                    );
                }
                continue;
            }
        };
        compilation.emit_asset(key, asset);
    }

    compilation.file_dependencies.extend(child.file_dependencies);
    compilation.children.push(bundle.to_string());
}
