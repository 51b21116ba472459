use thiserror::Error;

use crate::db_types::CatalogKind;

#[derive(Debug, Clone, Error)]
pub enum IdentifierError {
    #[error("Cannot derive an identifier: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for IdentifierError {
    fn from(e: sqlx::Error) -> Self {
        IdentifierError::DatabaseError(e.to_string())
    }
}

/// Existence checks used by the slug and registration number generators.
#[allow(async_fn_in_trait)]
pub trait IdentifierLookup {
    /// Whether a catalog item of `kind` already uses `slug`. The item with id `exclude_id`, if given, is ignored so that
    /// an item can keep its own slug when it is renamed.
    async fn slug_exists(&self, kind: CatalogKind, slug: &str, exclude_id: Option<i64>)
        -> Result<bool, IdentifierError>;

    async fn registration_number_exists(&self, registration_number: &str) -> Result<bool, IdentifierError>;
}
