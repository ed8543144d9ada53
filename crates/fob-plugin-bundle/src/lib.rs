#![cfg_attr(docsrs, feature(doc_cfg))]

//! # fob-plugin-bundle
//!
//! Builds an additional, independently configured bundle from the same source
//! tree as the host build, e.g. a service worker for the `webworker` target
//! next to the main web application.
//!
//! The bundle is compiled by a child build started from the host's `make`
//! step. Its warnings and errors are appended to the host compilation and its
//! entry point is added to the host's entry points unless the host already
//! defines one with the same name.
//!
//! ## Example
//!
//! ```rust,ignore
//! use fob_plugin_bundle::{BundlePluginOptions, FobBundlePlugin};
//! use fob_host::Target;
//!
//! let options = BundlePluginOptions::new("sw", "./src/sw.js")
//!     .with_target(Target::Webworker)
//!     .with_devtool(false);
//!
//! FobBundlePlugin::new(options).apply(&compiler);
//! let compilation = compiler.run().await?;
//! assert!(compilation.entrypoints.contains_key("sw"));
//! ```
//!
//! ## Options
//!
//! Everything but `name` and `entry` is optional. The output directory
//! defaults to the host's and the filename to `<name>.<ext>`, where `ext` is
//! the extension of the host's filename template. `target`, `devtool`,
//! `optimization`, `stats` and the other keys in [`PASS_THROUGH_KEYS`] are
//! deep-merged over the host's options. Set `import` to `false` to keep the
//! host's `import()` handling inside the bundle.

pub mod config;
pub mod filter;
pub mod plugin;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

pub use config::{
    BundleDiscovery, BundlePluginOptions, ChildConfig, ConfigError, OutputOverrides,
    PASS_THROUGH_KEYS, discover_bundles, merge_child_options, merge_values,
};
pub use filter::import_signal;
pub use plugin::FobBundlePlugin;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

use fob_host::HostError;

/// Name the plugin registers its hooks under
pub const PLUGIN_NAME: &str = "fob-bundle";

/// Error types for fob-plugin-bundle operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The bundle's configuration is invalid. No child build was started.
    #[error("Invalid bundle configuration: {0}")]
    Config(#[from] ConfigError),

    /// The child build failed as a whole.
    #[error("Child build '{name}' failed: {source}")]
    ChildBuild {
        name: String,
        #[source]
        source: HostError,
    },

    /// The host refused to create the child build.
    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

/// Result type alias for fob-plugin-bundle operations.
pub type Result<T> = std::result::Result<T, Error>;

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Config(ConfigError::MissingEntry { .. }) => "BUNDLE_MISSING_ENTRY",
            Error::Config(ConfigError::EntryNotFound(_)) => "BUNDLE_ENTRY_NOT_FOUND",
            Error::Config(ConfigError::EntryOutsideContext { .. }) => "BUNDLE_ENTRY_OUTSIDE_CONTEXT",
            Error::Config(_) => "BUNDLE_INVALID_CONFIG",
            Error::ChildBuild { .. } => "BUNDLE_CHILD_BUILD_FAILED",
            Error::Host(_) => "BUNDLE_HOST_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Config(err) => err
                .hint()
                .map(|hint| Box::new(hint) as Box<dyn std::fmt::Display>),
            Error::ChildBuild { name, .. } => Some(Box::new(format!(
                "The '{}' bundle could not be built. Fix the error above; the next rebuild retries it.",
                name
            ))),
            Error::Host(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic;
    use std::path::PathBuf;

    #[test]
    fn error_codes_are_stable() {
        let err = Error::from(ConfigError::EntryNotFound(PathBuf::from("/app/sw.js")));
        assert_eq!(err.code().unwrap().to_string(), "BUNDLE_ENTRY_NOT_FOUND");
        assert!(err.help().unwrap().to_string().contains("/app/sw.js"));

        let err = Error::ChildBuild {
            name: "sw".to_string(),
            source: HostError::EntryNotFound(PathBuf::from("/app/sw.js")),
        };
        assert_eq!(err.code().unwrap().to_string(), "BUNDLE_CHILD_BUILD_FAILED");
        assert!(err.to_string().contains("'sw'"));
    }
}
