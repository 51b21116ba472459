use thiserror::Error;

use crate::db_types::{CatalogItem, CatalogItemUpdate, CatalogKind, NewCatalogItem};

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Catalog item {0} does not exist")]
    NotFound(i64),
    #[error("There is no {0} with slug '{1}'")]
    SlugNotFound(CatalogKind, String),
    #[error("The slug '{0}' is already in use")]
    SlugTaken(String),
    #[error("Invalid catalog request: {0}")]
    InvalidInput(String),
    #[error("Insufficient permissions: {0}")]
    Forbidden(String),
    #[error("Nothing to update")]
    NoOp,
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Stores a new item under the given slug. A slug collision yields [`CatalogError::SlugTaken`].
    async fn insert_catalog_item(&self, item: NewCatalogItem, slug: &str) -> Result<CatalogItem, CatalogError>;

    async fn fetch_catalog_item(&self, id: i64) -> Result<Option<CatalogItem>, CatalogError>;

    async fn fetch_catalog_item_by_slug(
        &self,
        kind: CatalogKind,
        slug: &str,
    ) -> Result<Option<CatalogItem>, CatalogError>;

    /// Lists items of the given kind, ordered by title.
    async fn fetch_catalog(&self, kind: CatalogKind, published_only: bool) -> Result<Vec<CatalogItem>, CatalogError>;

    async fn update_catalog_item(&self, id: i64, update: CatalogItemUpdate) -> Result<CatalogItem, CatalogError>;
}
