//! Compiler primitives exposed to plugins.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use crate::Result;
use crate::compilation::{Compilation, EntryPoint};
use crate::hooks::Hooks;
use crate::options::CompilerOptions;
use crate::runtime::Runtime;

/// A host build pipeline
pub trait Compiler: Send + Sync + std::fmt::Debug {
    /// Build name (`None` for an unnamed root build)
    fn name(&self) -> Option<&str>;

    /// Normalized options this compiler runs with
    fn options(&self) -> &CompilerOptions;

    /// Base directory entry points are resolved against
    fn context(&self) -> &Path {
        &self.options().context
    }

    /// Runtime shared with every child compiler
    fn runtime(&self) -> Arc<dyn Runtime>;

    fn hooks(&self) -> &Hooks;

    /// Apply host-wide defaulting rules to a partial configuration
    fn apply_defaults(&self, partial: Value) -> Result<CompilerOptions> {
        CompilerOptions::normalize(partial, self.context())
    }

    /// Create a child compiler for the given compilation.
    ///
    /// The child inherits this compiler's parser taps but none of its make
    /// taps, so plugins that start child builds are not re-entered.
    fn create_child_compiler(
        &self,
        compilation: &Compilation,
        name: &str,
        options: CompilerOptions,
    ) -> Result<Box<dyn ChildCompiler>>;
}

/// Output of a finished child build
#[derive(Debug, Clone)]
pub struct ChildOutput {
    /// Entry records the child produced
    pub entries: Vec<EntryPoint>,
    /// The child's own compilation
    pub compilation: Compilation,
}

/// A nested build created by [`Compiler::create_child_compiler`]
#[async_trait]
pub trait ChildCompiler: Send + std::fmt::Debug {
    fn name(&self) -> &str;

    fn options(&self) -> &CompilerOptions;

    /// Bind the child to a context directory and runtime. Both are shared
    /// with the parent, never copied.
    fn bind(&mut self, context: &Path, runtime: Arc<dyn Runtime>);

    /// Add an entry module for `request` under `name`
    fn add_entry(&mut self, context: &Path, request: &Path, name: &str);

    /// Run the child build to completion.
    ///
    /// `Err` is a fatal failure of the child pass itself; compile errors of
    /// its modules are reported in the returned compilation.
    async fn run_as_child(self: Box<Self>) -> Result<ChildOutput>;
}
