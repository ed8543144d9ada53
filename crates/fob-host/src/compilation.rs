//! Build result set produced by one compiler run.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// A compile warning or error attached to a compilation.
///
/// These are the non-fatal diagnostics of a build: they are collected and
/// reported together, they never abort the build step on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
    /// Module the diagnostic originates from, if any
    pub module: Option<PathBuf>,
    /// Name of the compilation that produced it
    pub compilation: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            message: message.into(),
            module: None,
            compilation: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            message: message.into(),
            module: None,
            compilation: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<PathBuf>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_compilation(mut self, name: Option<&str>) -> Self {
        self.compilation = name.map(str::to_string);
        self
    }
}

/// A named entry point and the files it emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    /// Emitted filenames, relative to `output_path`; the entry chunk comes first
    pub files: Vec<String>,
    /// Output directory the files are written to
    pub output_path: PathBuf,
}

impl EntryPoint {
    /// Absolute path of the entry chunk
    pub fn entry_file(&self) -> Option<PathBuf> {
        self.files.first().map(|file| self.output_path.join(file))
    }
}

/// An emitted output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Absolute output path
    pub path: PathBuf,
    pub content: Vec<u8>,
}

/// Build result set
///
/// Owned by the host for the duration of one build. Plugins append to it from
/// hook handlers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compilation {
    name: Option<String>,
    pub warnings: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
    /// Entry records keyed by entry name, in insertion order
    pub entrypoints: IndexMap<String, EntryPoint>,
    /// Emitted assets keyed by filename relative to their output directory.
    /// Child assets whose relative name is already taken by a file in another
    /// directory are keyed by their absolute path.
    pub assets: IndexMap<String, Asset>,
    /// Files whose change must invalidate this build
    pub file_dependencies: IndexSet<PathBuf>,
    /// Names of child compilations that ran as part of this build
    pub children: Vec<String>,
}

impl Compilation {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Name of the compiler that owns this compilation
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Register a build-time dependency. Returns `false` if already present.
    pub fn add_file_dependency(&mut self, path: impl AsRef<Path>) -> bool {
        self.file_dependencies.insert(path.as_ref().to_path_buf())
    }

    /// Record a diagnostic in the list matching its severity
    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            DiagnosticSeverity::Error => self.errors.push(diagnostic),
            DiagnosticSeverity::Warning => self.warnings.push(diagnostic),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Emit an asset. Returns `false` and leaves the existing asset in place
    /// when the filename is already taken.
    pub fn emit_asset(&mut self, filename: impl Into<String>, asset: Asset) -> bool {
        match self.assets.entry(filename.into()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(asset);
                true
            }
        }
    }
}
