//! Shared test utilities for fob-plugin-bundle tests

#![allow(dead_code)]

use fob_host::testing::MemoryCompiler;
use fob_host::{Compilation, CompilerOptions, HostError, MemoryRuntime};
use fob_plugin_bundle::{BundlePluginOptions, Error, FobBundlePlugin};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Project context every test host runs in
pub const CONTEXT: &str = "/app";

/// A small project: a host entry with a lazy route and a service worker that
/// lazily loads its own helper.
pub fn project_runtime() -> MemoryRuntime {
    MemoryRuntime::new(CONTEXT)
        .with_file(
            "/app/src/index.js",
            "import './app.js';\nconst route = () => import('./route.js');\n",
        )
        .with_file("/app/src/app.js", "export const app = true;\n")
        .with_file("/app/src/route.js", "export default 'route';\n")
        .with_file(
            "/app/src/sw.js",
            "import './precache.js';\nself.addEventListener('fetch', () => import('./offline.js'));\n",
        )
        .with_file("/app/src/precache.js", "export const manifest = [];\n")
        .with_file("/app/src/offline.js", "export default 'offline';\n")
}

/// A host compiler over `runtime` with the given partial options
pub fn host_compiler(runtime: MemoryRuntime, options: Value) -> MemoryCompiler {
    let options =
        CompilerOptions::normalize(options, Path::new(CONTEXT)).expect("valid host options");
    MemoryCompiler::new(options, Arc::new(runtime))
}

/// A host compiler with the plugin applied
pub fn host_with_plugin(
    runtime: MemoryRuntime,
    options: Value,
    bundle: BundlePluginOptions,
) -> MemoryCompiler {
    let compiler = host_compiler(runtime, options);
    FobBundlePlugin::new(bundle).apply(&compiler);
    compiler
}

/// Run the make taps of `compiler` against an existing compilation
pub async fn run_make(
    compiler: &MemoryCompiler,
    compilation: &mut Compilation,
) -> Result<(), HostError> {
    use fob_host::Compiler;

    for (_, hook) in compiler.hooks().make_taps() {
        hook.make(compiler, compilation).await?;
    }
    Ok(())
}

/// Extract the plugin error from a failed build
pub fn plugin_error(err: &HostError) -> &Error {
    match err {
        HostError::Plugin { plugin, source } => {
            assert_eq!(plugin, fob_plugin_bundle::PLUGIN_NAME);
            source
                .downcast_ref::<Error>()
                .expect("plugin error should be a fob_plugin_bundle::Error")
        }
        other => panic!("Expected a plugin error, got: {other}"),
    }
}
