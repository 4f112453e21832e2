//! Collaborator-level errors: everything a caller of [`crate::engine::Db`]
//! can hit, layered over the core's [`StorageError`].

use crate::error::StorageError;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("could not parse SQL: {0}")]
    ParseError(String),
}
