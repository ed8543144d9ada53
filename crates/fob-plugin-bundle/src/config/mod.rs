//! Bundle configuration: options, child option merging and discovery.

pub mod discovery;
pub mod error;
pub mod merge;
pub mod options;

pub use discovery::{BundleDiscovery, discover_bundles};
pub use error::ConfigError;
pub use merge::{
    ChildConfig, PASS_THROUGH_KEYS, child_overrides, merge_child_options, merge_values,
    resolve_entry,
};
pub use options::{BundlePluginOptions, OutputOverrides};
