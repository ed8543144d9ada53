#![cfg_attr(docsrs, feature(doc_cfg))]

//! # fob-host
//!
//! The host pipeline contract that fob plugins are written against.
//!
//! A host build pipeline owns a [`Compiler`], which produces one
//! [`Compilation`] per build. Plugins never see the bundling machinery itself:
//! they register handlers on the compiler's [`Hooks`] and use the small set of
//! primitives the compiler exposes (child compilers, option defaulting, the
//! shared [`Runtime`]).
//!
//! ```text
//! Compiler ──run──▶ Compilation
//!    │                  ▲
//!    ├─ hooks.make ─────┘   (async, once per build)
//!    └─ hooks.parser ──▶ JavascriptParser ──▶ import_call taps
//! ```
//!
//! The `test-utils` feature adds [`testing::MemoryCompiler`], an in-memory
//! reference host used by plugin test suites.

pub mod compilation;
pub mod compiler;
pub mod hooks;
pub mod options;
pub mod parser;
pub mod runtime;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod testing;

pub use compilation::{Asset, Compilation, Diagnostic, DiagnosticSeverity, EntryPoint};
pub use compiler::{ChildCompiler, ChildOutput, Compiler};
pub use hooks::{HookEvent, Hooks, MakeHook, ParserHook};
pub use options::{CompilerOptions, Mode, ModuleOptions, OptimizationOptions, OutputOptions, Target};
pub use parser::{ImportCall, ImportCallSignal, JavascriptParser, ParserOptions, ParserState};
pub use runtime::{MemoryRuntime, Runtime, RuntimeError, RuntimeResult};

use std::path::PathBuf;

/// Errors reported by host operations.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Entry module could not be found or read.
    #[error("Entry module not found: {0}")]
    EntryNotFound(PathBuf),

    /// Options failed host-wide normalization.
    #[error("Invalid compiler options: {0}")]
    InvalidOptions(String),

    /// A child build failed before producing a compilation.
    #[error("Child compilation '{name}' failed: {reason}")]
    ChildCompilation { name: String, reason: String },

    /// A plugin handler aborted the build step.
    #[error("Plugin '{plugin}' failed: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error from the filesystem runtime.
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl HostError {
    /// Wrap a plugin error so it can be returned from a hook handler.
    pub fn plugin(
        plugin: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        HostError::Plugin {
            plugin: plugin.into(),
            source: source.into(),
        }
    }
}

/// Result type alias for host operations.
pub type Result<T> = std::result::Result<T, HostError>;
