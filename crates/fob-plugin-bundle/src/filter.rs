//! Dynamic import filtering.
//!
//! A bundle built as a child pass is emitted as a single file, so its own
//! `import()` expressions must not become split chunks. The filter taps every
//! JavaScript parser and answers `Skip` for expressions parsed by the bundle's
//! child build, leaving every other build untouched.

use fob_host::{
    ImportCall, ImportCallSignal, JavascriptParser, ParserHook, ParserOptions, ParserState,
};

use crate::PLUGIN_NAME;

/// Decide whether an `import()` parsed under `state` is skipped for `bundle`
pub fn import_signal(state: &ParserState, bundle: &str) -> ImportCallSignal {
    if state.compilation_name.as_deref() == Some(bundle) {
        ImportCallSignal::Skip
    } else {
        ImportCallSignal::Continue
    }
}

/// Parser hook installing the `import_call` filter
#[derive(Debug, Clone)]
pub(crate) struct ImportFilter {
    bundle: String,
}

impl ImportFilter {
    pub(crate) fn new(bundle: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
        }
    }
}

impl ParserHook for ImportFilter {
    fn parser(&self, parser: &mut JavascriptParser, options: &ParserOptions) {
        // Import handling is off for this parser; nothing to filter
        if options.import == Some(false) {
            return;
        }

        let bundle = self.bundle.clone();
        parser
            .hooks
            .tap_import_call(PLUGIN_NAME, move |state: &ParserState, _call: &ImportCall| {
                import_signal(state, &bundle)
            });
    }
}
