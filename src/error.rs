use std::path::PathBuf;

use thiserror::Error;

use crate::projector::FlatId;

pub type Result<T> = std::result::Result<T, CategoryError>;

#[derive(Debug, Error)]
pub enum CategoryError {
    /// Category names must contain at least one non-whitespace character.
    #[error("category name must not be blank")]
    BlankName,

    /// The flat handle is not registered in the identity maps. Callers holding
    /// a handle from an older projection hit this.
    #[error("flat node {0:?} has no nested counterpart")]
    IdentityMismatch(FlatId),

    #[error("failed to parse seed data from {path}: {source}")]
    Seed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
