//! In-memory reference host.
//!
//! [`MemoryCompiler`] implements just enough of a build pipeline to exercise
//! plugins end to end: it walks static and dynamic imports found by a literal
//! scanner, fires the parser extension point for every module, turns each
//! literal `import()` that no plugin skipped into a split chunk and emits one
//! asset per chunk. It is not a bundler; module sources are concatenated
//! as-is.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use path_clean::PathClean;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::compilation::{Asset, Compilation, Diagnostic, EntryPoint};
use crate::compiler::{ChildCompiler, ChildOutput, Compiler};
use crate::hooks::Hooks;
use crate::options::CompilerOptions;
use crate::parser::{
    ImportCall, ImportCallSignal, JAVASCRIPT_AUTO, JavascriptParser, ParserOptions, ParserState,
};
use crate::runtime::Runtime;
use crate::{HostError, Result};

static STATIC_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*(?:import|export)\s+(?:[\w*{}\s,]+?\s+from\s+)?["']([^"']+)["']"#)
        .unwrap_or_else(|e| panic!("invalid static import pattern: {e}"))
});

static DYNAMIC_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bimport\s*\(\s*(?:["']([^"']*)["']\s*\))?"#)
        .unwrap_or_else(|e| panic!("invalid dynamic import pattern: {e}"))
});

/// Imports found in a module source
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScannedModule {
    pub static_imports: Vec<String>,
    pub dynamic_imports: Vec<ImportCall>,
}

/// Find `import`/`export ... from` requests and `import()` expressions
pub fn scan_module(source: &str) -> ScannedModule {
    let static_imports = STATIC_IMPORT
        .captures_iter(source)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect();

    let dynamic_imports = DYNAMIC_IMPORT
        .captures_iter(source)
        .filter_map(|c| {
            let whole = c.get(0)?;
            Some(ImportCall {
                request: c.get(1).map(|m| m.as_str().to_string()),
                offset: whole.start(),
            })
        })
        .collect();

    ScannedModule {
        static_imports,
        dynamic_imports,
    }
}

/// Reference host compiler
#[derive(Debug)]
pub struct MemoryCompiler {
    options: CompilerOptions,
    runtime: Arc<dyn Runtime>,
    hooks: Arc<Hooks>,
    children_created: AtomicUsize,
    child_failure: Option<String>,
}

impl MemoryCompiler {
    pub fn new(options: CompilerOptions, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            options,
            runtime,
            hooks: Arc::new(Hooks::new()),
            children_created: AtomicUsize::new(0),
            child_failure: None,
        }
    }

    /// Make every child build fail with `reason` instead of running
    pub fn fail_child_builds(mut self, reason: impl Into<String>) -> Self {
        self.child_failure = Some(reason.into());
        self
    }

    /// Number of child compilers created so far
    pub fn children_created(&self) -> usize {
        self.children_created.load(Ordering::SeqCst)
    }

    /// An empty compilation for this compiler
    pub fn new_compilation(&self) -> Compilation {
        Compilation::new(self.options.name.clone())
    }

    /// Build the configured entries, then run the make taps.
    pub async fn run(&self) -> Result<Compilation> {
        let mut compilation = self.new_compilation();
        let mut parser = self.hooks.create_parser(&parser_options(&self.options));

        let entries: Vec<(String, PathBuf)> = self
            .options
            .entry
            .iter()
            .map(|(name, request)| (name.clone(), self.options.context.join(request).clean()))
            .collect();
        for (name, path) in entries {
            build_entry(
                &self.options,
                self.runtime.as_ref(),
                &mut parser,
                &mut compilation,
                &name,
                path,
            )
            .await?;
        }

        for (plugin, hook) in self.hooks.make_taps() {
            tracing::debug!(plugin = %plugin, "running make tap");
            hook.make(self, &mut compilation).await?;
        }

        Ok(compilation)
    }
}

impl Compiler for MemoryCompiler {
    fn name(&self) -> Option<&str> {
        self.options.name.as_deref()
    }

    fn options(&self) -> &CompilerOptions {
        &self.options
    }

    fn runtime(&self) -> Arc<dyn Runtime> {
        Arc::clone(&self.runtime)
    }

    fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    fn create_child_compiler(
        &self,
        _compilation: &Compilation,
        name: &str,
        mut options: CompilerOptions,
    ) -> Result<Box<dyn ChildCompiler>> {
        self.children_created.fetch_add(1, Ordering::SeqCst);
        options.name = Some(name.to_string());
        Ok(Box::new(MemoryChildCompiler {
            name: name.to_string(),
            context: options.context.clone(),
            options,
            runtime: Arc::clone(&self.runtime),
            hooks: Arc::clone(&self.hooks),
            entries: Vec::new(),
            failure: self.child_failure.clone(),
        }))
    }
}

/// Child compiler of a [`MemoryCompiler`]
#[derive(Debug)]
pub struct MemoryChildCompiler {
    name: String,
    options: CompilerOptions,
    context: PathBuf,
    runtime: Arc<dyn Runtime>,
    hooks: Arc<Hooks>,
    entries: Vec<(String, PathBuf)>,
    failure: Option<String>,
}

#[async_trait]
impl ChildCompiler for MemoryChildCompiler {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &CompilerOptions {
        &self.options
    }

    fn bind(&mut self, context: &Path, runtime: Arc<dyn Runtime>) {
        self.context = context.to_path_buf();
        self.runtime = runtime;
    }

    fn add_entry(&mut self, context: &Path, request: &Path, name: &str) {
        self.entries
            .push((name.to_string(), context.join(request).clean()));
    }

    async fn run_as_child(self: Box<Self>) -> Result<ChildOutput> {
        let this = *self;
        if let Some(reason) = this.failure {
            return Err(HostError::ChildCompilation {
                name: this.name,
                reason,
            });
        }

        let mut compilation = Compilation::new(Some(this.name.clone()));
        let mut parser = this.hooks.create_parser(&parser_options(&this.options));
        for (name, path) in &this.entries {
            build_entry(
                &this.options,
                this.runtime.as_ref(),
                &mut parser,
                &mut compilation,
                name,
                path.clone(),
            )
            .await?;
        }

        let entries = compilation.entrypoints.values().cloned().collect();
        Ok(ChildOutput {
            entries,
            compilation,
        })
    }
}

fn parser_options(options: &CompilerOptions) -> ParserOptions {
    ParserOptions::from_value(options.parser_options(JAVASCRIPT_AUTO))
}

async fn build_entry(
    options: &CompilerOptions,
    runtime: &dyn Runtime,
    parser: &mut JavascriptParser,
    compilation: &mut Compilation,
    name: &str,
    path: PathBuf,
) -> Result<()> {
    if !runtime.exists(&path) {
        return Err(HostError::EntryNotFound(path));
    }

    let mut walk = GraphWalk {
        runtime,
        parser,
        compilation,
        seen: FxHashSet::default(),
    };

    let mut chunks = Vec::new();
    let mut pending = VecDeque::from([path]);
    while let Some(root) = pending.pop_front() {
        if walk.seen.contains(&root) {
            continue;
        }
        let (modules, async_roots) = walk.collect_chunk(root).await;
        chunks.push(modules);
        pending.extend(async_roots);
    }

    let output = &options.output;
    let mut files = Vec::with_capacity(chunks.len());
    for (index, modules) in chunks.into_iter().enumerate() {
        let filename = if index == 0 {
            output.render_filename(name)
        } else {
            output.render_chunk_filename(&format!("{name}-{index}"))
        };
        let content = modules
            .iter()
            .map(|(module, source)| format!("// {}\n{}\n", module.display(), source))
            .collect::<String>();
        walk.compilation.emit_asset(
            filename.clone(),
            Asset {
                path: output.path.join(&filename),
                content: content.into_bytes(),
            },
        );
        files.push(filename);
    }

    walk.compilation
        .entrypoints
        .entry(name.to_string())
        .or_insert(EntryPoint {
            name: name.to_string(),
            files,
            output_path: output.path.clone(),
        });
    Ok(())
}

struct GraphWalk<'a> {
    runtime: &'a dyn Runtime,
    parser: &'a mut JavascriptParser,
    compilation: &'a mut Compilation,
    seen: FxHashSet<PathBuf>,
}

impl GraphWalk<'_> {
    /// Collect the modules statically reachable from `root`, returning them
    /// with the roots of the split chunks they request.
    async fn collect_chunk(&mut self, root: PathBuf) -> (Vec<(PathBuf, String)>, Vec<PathBuf>) {
        let compilation_name = self.compilation.name().map(str::to_string);
        let mut modules = Vec::new();
        let mut async_roots = Vec::new();
        let mut queue = VecDeque::from([root]);

        while let Some(path) = queue.pop_front() {
            if !self.seen.insert(path.clone()) {
                continue;
            }

            let source = match self.runtime.read_file(&path).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(_) => {
                    self.compilation.push_diagnostic(
                        Diagnostic::error(format!(
                            "Module not found: Can't resolve '{}'",
                            path.display()
                        ))
                        .with_compilation(compilation_name.as_deref()),
                    );
                    continue;
                }
            };
            self.compilation.add_file_dependency(&path);

            self.parser.state = ParserState {
                compilation_name: compilation_name.clone(),
                module: path.clone(),
            };
            let scanned = scan_module(&source);

            for request in &scanned.static_imports {
                match self.runtime.resolve(request, &path) {
                    Ok(resolved) => queue.push_back(resolved),
                    Err(e) => self.push_error(&path, e.to_string(), &compilation_name),
                }
            }

            for call in &scanned.dynamic_imports {
                if self.parser.call_import(call) == ImportCallSignal::Skip {
                    continue;
                }
                match &call.request {
                    Some(request) => match self.runtime.resolve(request, &path) {
                        Ok(resolved) => async_roots.push(resolved),
                        Err(e) => self.push_error(&path, e.to_string(), &compilation_name),
                    },
                    None => self.compilation.push_diagnostic(
                        Diagnostic::warning(
                            "Critical dependency: the request of a dependency is an expression",
                        )
                        .with_module(&path)
                        .with_compilation(compilation_name.as_deref()),
                    ),
                }
            }

            modules.push((path, source));
        }

        (modules, async_roots)
    }

    fn push_error(&mut self, module: &Path, message: String, compilation: &Option<String>) {
        self.compilation.push_diagnostic(
            Diagnostic::error(message)
                .with_module(module)
                .with_compilation(compilation.as_deref()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MemoryRuntime;
    use serde_json::json;

    fn compiler(runtime: MemoryRuntime, entry: serde_json::Value) -> MemoryCompiler {
        let options = CompilerOptions::normalize(
            json!({ "entry": entry, "output": { "path": "/dist" } }),
            Path::new("/app"),
        )
        .unwrap();
        MemoryCompiler::new(options, Arc::new(runtime))
    }

    #[test]
    fn scan_finds_static_and_dynamic_imports() {
        let scanned = scan_module(
            r#"
import { a } from "./a.js";
import './side-effect';
export * from "./re-export.js";
const lazy = () => import("./lazy.js");
const dynamic = (name) => import(name);
"#,
        );

        assert_eq!(
            scanned.static_imports,
            vec!["./a.js", "./side-effect", "./re-export.js"]
        );
        assert_eq!(scanned.dynamic_imports.len(), 2);
        assert_eq!(
            scanned.dynamic_imports[0].request.as_deref(),
            Some("./lazy.js")
        );
        assert_eq!(scanned.dynamic_imports[1].request, None);
    }

    #[tokio::test]
    async fn run_emits_entry_and_split_chunks() {
        let runtime = MemoryRuntime::new("/app")
            .with_file("/app/src/index.js", "import './util.js';\nimport('./lazy.js');")
            .with_file("/app/src/util.js", "export const util = 1;")
            .with_file("/app/src/lazy.js", "export default 2;");
        let compiler = compiler(runtime, json!({ "main": "./src/index.js" }));

        let compilation = compiler.run().await.unwrap();

        let main = &compilation.entrypoints["main"];
        assert_eq!(main.files, vec!["main.js", "main-1.js"]);
        assert_eq!(main.output_path, PathBuf::from("/dist"));
        assert!(compilation.assets.contains_key("main.js"));
        assert!(compilation.assets.contains_key("main-1.js"));
        assert_eq!(compilation.file_dependencies.len(), 3);
        assert!(compilation.errors.is_empty());
    }

    #[tokio::test]
    async fn run_reports_missing_modules_and_expression_imports() {
        let runtime = MemoryRuntime::new("/app").with_file(
            "/app/src/index.js",
            "import './missing.js';\nconst load = (n) => import(n);",
        );
        let compiler = compiler(runtime, json!({ "main": "./src/index.js" }));

        let compilation = compiler.run().await.unwrap();

        assert_eq!(compilation.errors.len(), 1);
        assert!(compilation.errors[0].message.contains("Module not found"));
        assert_eq!(compilation.warnings.len(), 1);
        assert!(
            compilation.warnings[0]
                .message
                .starts_with("Critical dependency")
        );
    }

    #[tokio::test]
    async fn run_fails_on_missing_entry() {
        let compiler = compiler(MemoryRuntime::new("/app"), json!({ "main": "./nope.js" }));
        let err = compiler.run().await.unwrap_err();
        assert!(matches!(err, HostError::EntryNotFound(_)));
    }

    #[tokio::test]
    async fn child_compiler_runs_its_own_entry() {
        let runtime = MemoryRuntime::new("/app").with_file("/app/src/sw.js", "self.x = 1;");
        let compiler = compiler(runtime, json!({}));
        let compilation = compiler.new_compilation();

        let mut child = compiler
            .create_child_compiler(&compilation, "sw", compiler.options().clone())
            .unwrap();
        child.bind(compiler.context(), compiler.runtime());
        child.add_entry(compiler.context(), Path::new("./src/sw.js"), "sw");
        let output = child.run_as_child().await.unwrap();

        assert_eq!(compiler.children_created(), 1);
        assert_eq!(output.compilation.name(), Some("sw"));
        assert_eq!(output.entries.len(), 1);
        assert_eq!(output.entries[0].files, vec!["sw.js"]);
    }

    #[tokio::test]
    async fn failing_child_reports_fatal_error() {
        let compiler =
            compiler(MemoryRuntime::new("/app"), json!({})).fail_child_builds("out of memory");
        let compilation = compiler.new_compilation();
        let child = compiler
            .create_child_compiler(&compilation, "sw", compiler.options().clone())
            .unwrap();

        let err = child.run_as_child().await.unwrap_err();
        assert!(matches!(err, HostError::ChildCompilation { .. }));
    }
}
