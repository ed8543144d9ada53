//! Error types for bundle options validation and loading.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Entry resolution errors
    #[error("bundle '{bundle}' has no entry")]
    MissingEntry { bundle: String },

    #[error("entry path not found: {0}")]
    EntryNotFound(PathBuf),

    #[error("entry path {entry} is outside the build context {context}")]
    EntryOutsideContext { entry: PathBuf, context: PathBuf },

    // Option errors
    #[error("invalid bundle name '{name}'")]
    InvalidName { name: String },

    #[error("invalid config value for '{field}'")]
    InvalidValue { field: String, hint: Option<String> },

    #[error("failed to merge child options: {message}")]
    Merge { message: String },

    // Discovery errors
    #[error("config not found")]
    NotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Extra guidance for the user, when there is any
    pub fn hint(&self) -> Option<String> {
        match self {
            ConfigError::MissingEntry { .. } => {
                Some("Set `entry` to the module the bundle starts from".to_string())
            }
            ConfigError::EntryNotFound(path) => Some(format!(
                "Check that {} exists relative to the build context",
                path.display()
            )),
            ConfigError::EntryOutsideContext { .. } => {
                Some("Move the entry inside the project or point `context` at its parent".to_string())
            }
            ConfigError::InvalidName { .. } => {
                Some("Bundle names must be non-empty and contain no whitespace".to_string())
            }
            ConfigError::InvalidValue { hint, .. } => hint.clone(),
            _ => None,
        }
    }
}
