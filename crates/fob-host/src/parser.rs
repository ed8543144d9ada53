//! Parser-level extension point.
//!
//! Each compilation owns one [`JavascriptParser`]. Plugins tap its
//! `import_call` hook once, when the parser is created; the handlers are then
//! called for every dynamic `import()` expression with the parser's current
//! [`ParserState`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Module type the JavaScript parser is registered for
pub const JAVASCRIPT_AUTO: &str = "javascript/auto";

/// Options the host configured for a parser (`module.parser[<type>]`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserOptions {
    /// Whether dynamic `import()` expressions are handled. `None` means the
    /// host default (enabled).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<bool>,
}

impl ParserOptions {
    /// Read parser options from a raw `module.parser` entry, ignoring keys
    /// this parser does not understand.
    pub fn from_value(value: Option<&Value>) -> Self {
        value
            .and_then(|v| v.get("import"))
            .and_then(Value::as_bool)
            .map(|import| Self {
                import: Some(import),
            })
            .unwrap_or_default()
    }
}

/// Parser state for the module currently being parsed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserState {
    /// Name of the compilation the module belongs to (`None` for an unnamed
    /// root build)
    pub compilation_name: Option<String>,
    /// Module being parsed
    pub module: PathBuf,
}

/// A dynamic `import()` expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCall {
    /// Literal request, or `None` when the argument is an expression
    pub request: Option<String>,
    /// Byte offset of the expression in the module source
    pub offset: usize,
}

/// Result of an `import_call` handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportCallSignal {
    /// No opinion; later handlers and the default handling run
    Continue,
    /// Stop: the expression is not turned into a split point
    Skip,
}

type ImportCallHandler = Arc<dyn Fn(&ParserState, &ImportCall) -> ImportCallSignal + Send + Sync>;

/// Hooks exposed by a parser
#[derive(Default)]
pub struct ParserHooks {
    import_call: Vec<(String, ImportCallHandler)>,
}

impl ParserHooks {
    /// Tap the `import_call` hook
    pub fn tap_import_call<F>(&mut self, plugin: impl Into<String>, handler: F)
    where
        F: Fn(&ParserState, &ImportCall) -> ImportCallSignal + Send + Sync + 'static,
    {
        self.import_call.push((plugin.into(), Arc::new(handler)));
    }

    /// Number of `import_call` taps
    pub fn import_call_taps(&self) -> usize {
        self.import_call.len()
    }
}

impl fmt::Debug for ParserHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.import_call.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("ParserHooks")
            .field("import_call", &names)
            .finish()
    }
}

/// JavaScript parser owned by one compilation
#[derive(Debug, Default)]
pub struct JavascriptParser {
    pub hooks: ParserHooks,
    pub state: ParserState,
}

impl JavascriptParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the `import_call` taps for an expression.
    ///
    /// Taps run in registration order; the first `Skip` wins.
    pub fn call_import(&self, call: &ImportCall) -> ImportCallSignal {
        for (plugin, handler) in &self.hooks.import_call {
            if handler(&self.state, call) == ImportCallSignal::Skip {
                tracing::trace!(
                    plugin = %plugin,
                    module = %self.state.module.display(),
                    "import() skipped by plugin"
                );
                return ImportCallSignal::Skip;
            }
        }
        ImportCallSignal::Continue
    }
}
