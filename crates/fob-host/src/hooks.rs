//! Compiler extension points.
//!
//! Handlers are registered per [`HookEvent`] under the name of the plugin that
//! owns them and run in registration order.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::Result;
use crate::compilation::Compilation;
use crate::compiler::Compiler;
use crate::parser::{JavascriptParser, ParserOptions};

/// Events a plugin can tap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// Once per build, before the compilation is sealed. Async.
    Make,
    /// Once per compilation, when its JavaScript parser is created.
    Parser,
}

/// Handler for [`HookEvent::Make`]
///
/// The build step does not continue until the returned future resolves; an
/// error aborts the build.
#[async_trait]
pub trait MakeHook: Send + Sync {
    async fn make(&self, compiler: &dyn Compiler, compilation: &mut Compilation) -> Result<()>;
}

/// Handler for [`HookEvent::Parser`]
pub trait ParserHook: Send + Sync {
    fn parser(&self, parser: &mut JavascriptParser, options: &ParserOptions);
}

enum Tap {
    Make(Arc<dyn MakeHook>),
    Parser(Arc<dyn ParserHook>),
}

impl Tap {
    fn event(&self) -> HookEvent {
        match self {
            Tap::Make(_) => HookEvent::Make,
            Tap::Parser(_) => HookEvent::Parser,
        }
    }
}

/// Hook registry owned by a compiler
#[derive(Default)]
pub struct Hooks {
    taps: RwLock<Vec<(String, Tap)>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a [`HookEvent::Make`] handler
    pub fn tap_make(&self, plugin: impl Into<String>, hook: impl MakeHook + 'static) {
        self.taps
            .write()
            .push((plugin.into(), Tap::Make(Arc::new(hook))));
    }

    /// Register a [`HookEvent::Parser`] handler
    pub fn tap_parser(&self, plugin: impl Into<String>, hook: impl ParserHook + 'static) {
        self.taps
            .write()
            .push((plugin.into(), Tap::Parser(Arc::new(hook))));
    }

    /// Make handlers in registration order
    pub fn make_taps(&self) -> Vec<(String, Arc<dyn MakeHook>)> {
        self.taps
            .read()
            .iter()
            .filter_map(|(name, tap)| match tap {
                Tap::Make(hook) => Some((name.clone(), Arc::clone(hook))),
                Tap::Parser(_) => None,
            })
            .collect()
    }

    /// Parser handlers in registration order
    pub fn parser_taps(&self) -> Vec<(String, Arc<dyn ParserHook>)> {
        self.taps
            .read()
            .iter()
            .filter_map(|(name, tap)| match tap {
                Tap::Parser(hook) => Some((name.clone(), Arc::clone(hook))),
                Tap::Make(_) => None,
            })
            .collect()
    }

    /// Names of the plugins tapping `event`
    pub fn tapped_by(&self, event: HookEvent) -> Vec<String> {
        self.taps
            .read()
            .iter()
            .filter(|(_, tap)| tap.event() == event)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Create a parser for a compilation and let every parser tap install
    /// its handlers on it.
    pub fn create_parser(&self, options: &ParserOptions) -> JavascriptParser {
        let mut parser = JavascriptParser::new();
        for (_, hook) in self.parser_taps() {
            hook.parser(&mut parser, options);
        }
        parser
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("make", &self.tapped_by(HookEvent::Make))
            .field("parser", &self.tapped_by(HookEvent::Parser))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ImportCall, ImportCallSignal};

    struct SkipAll;

    impl ParserHook for SkipAll {
        fn parser(&self, parser: &mut JavascriptParser, options: &ParserOptions) {
            if options.import == Some(false) {
                return;
            }
            parser
                .hooks
                .tap_import_call("skip-all", |_, _| ImportCallSignal::Skip);
        }
    }

    #[test]
    fn taps_are_listed_per_event() {
        let hooks = Hooks::new();
        hooks.tap_parser("first", SkipAll);
        hooks.tap_parser("second", SkipAll);

        assert_eq!(hooks.tapped_by(HookEvent::Parser), vec!["first", "second"]);
        assert!(hooks.tapped_by(HookEvent::Make).is_empty());
        assert!(hooks.make_taps().is_empty());
    }

    #[test]
    fn create_parser_runs_parser_taps() {
        let hooks = Hooks::new();
        hooks.tap_parser("skip-all", SkipAll);

        let parser = hooks.create_parser(&ParserOptions::default());
        let call = ImportCall {
            request: None,
            offset: 0,
        };
        assert_eq!(parser.call_import(&call), ImportCallSignal::Skip);

        let disabled = hooks.create_parser(&ParserOptions {
            import: Some(false),
        });
        assert_eq!(disabled.hooks.import_call_taps(), 0);
    }
}
