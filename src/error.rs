//! Crate-level error type.
//!
//! Only boundary operations fail: writes with missing identifiers,
//! stale version tokens, storage failures and unreadable configuration.
//! Allocation itself never errors; an unsatisfiable demand is reported
//! through [`Coverage`](crate::models::Coverage) instead.

use thiserror::Error;

use crate::repository::RepositoryError;
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {}", format_validation(.0))]
    Validation(Vec<ValidationError>),

    #[error("version conflict on {entity}: expected {expected}, found {actual}")]
    VersionConflict {
        entity: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error("repository failure: {0}")]
    Repository(RepositoryError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for a single validation failure.
    pub fn invalid(error: ValidationError) -> Self {
        Error::Validation(vec![error])
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::VersionConflict {
                entity,
                expected,
                actual,
            } => Error::VersionConflict {
                entity,
                expected,
                actual,
            },
            other => Error::Repository(other),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;
