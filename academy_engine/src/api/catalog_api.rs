//! Catalog management: published listings for visitors, and creation and editing for staff.
//!
//! Every catalog item has a slug that is unique within its kind. Slugs are derived from the title when an item is
//! created, and re-derived when the title changes.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{CatalogItem, CatalogItemUpdate, CatalogKind, CourseType, NewCatalogItem, Role},
    helpers::generate_slug,
    traits::{CatalogError, CatalogManagement, IdentifierError, IdentifierLookup},
};

/// A concurrent writer can claim a slug between the availability check and the insert. Only that race is retried.
const SLUG_INSERT_ATTEMPTS: usize = 3;

impl From<IdentifierError> for CatalogError {
    fn from(e: IdentifierError) -> Self {
        match e {
            IdentifierError::InvalidInput(s) => CatalogError::InvalidInput(s),
            IdentifierError::DatabaseError(s) => CatalogError::DatabaseError(s),
        }
    }
}

pub struct CatalogApi<B> {
    db: B,
}

impl<B: Debug> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi ({:?})", self.db)
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement + IdentifierLookup
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Creates a catalog item on behalf of a user with the given role. Administrators can create any kind of item;
    /// instructors can only create courses.
    pub async fn create_item(&self, mut item: NewCatalogItem, role: Role) -> Result<CatalogItem, CatalogError> {
        check_permission(role, item.kind)?;
        item.title = item.title.trim().to_string();
        if item.title.is_empty() {
            return Err(CatalogError::InvalidInput("title is required".into()));
        }
        check_price(item.price)?;
        let mut attempt = 1;
        loop {
            let slug = generate_slug(&self.db, item.kind, &item.title, None).await?;
            match self.db.insert_catalog_item(item.clone(), &slug).await {
                Ok(created) => {
                    info!("📚️ Catalog {} '{}' created as #{}", created.kind, created.slug, created.id);
                    return Ok(created);
                },
                Err(CatalogError::SlugTaken(s)) if attempt < SLUG_INSERT_ATTEMPTS => {
                    debug!("📚️ Slug '{s}' was claimed concurrently. Retrying ({attempt}/{SLUG_INSERT_ATTEMPTS})");
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Lists the items of one kind, ordered by title.
    pub async fn list(&self, kind: CatalogKind, published_only: bool) -> Result<Vec<CatalogItem>, CatalogError> {
        self.db.fetch_catalog(kind, published_only).await
    }

    pub async fn fetch_item(&self, id: i64) -> Result<CatalogItem, CatalogError> {
        self.db.fetch_catalog_item(id).await?.ok_or(CatalogError::NotFound(id))
    }

    /// Fetches a published item by its slug. Unpublished items are only reachable by id.
    pub async fn fetch_by_slug(&self, kind: CatalogKind, slug: &str) -> Result<CatalogItem, CatalogError> {
        self.db
            .fetch_catalog_item_by_slug(kind, slug)
            .await?
            .filter(|item| item.published)
            .ok_or_else(|| CatalogError::SlugNotFound(kind, slug.to_string()))
    }

    /// Applies a partial update. When the title changes, a new slug is generated; the item's current slug does not
    /// count as a collision.
    pub async fn update_item(
        &self,
        id: i64,
        mut update: CatalogItemUpdate,
        role: Role,
    ) -> Result<CatalogItem, CatalogError> {
        let existing = self.fetch_item(id).await?;
        check_permission(role, existing.kind)?;
        check_price(update.price)?;
        update.slug = None;
        if let Some(title) = update.title.as_mut() {
            *title = title.trim().to_string();
            if title.is_empty() {
                return Err(CatalogError::InvalidInput("title cannot be empty".into()));
            }
        }
        if update.is_empty() {
            return Err(CatalogError::NoOp);
        }
        let title_changed = update.title.as_deref().is_some_and(|t| t != existing.title);
        let mut attempt = 1;
        loop {
            if title_changed {
                let title = update.title.as_deref().unwrap_or_default();
                update.slug = Some(generate_slug(&self.db, existing.kind, title, Some(id)).await?);
            }
            match self.db.update_catalog_item(id, update.clone()).await {
                Ok(updated) => {
                    if updated.slug != existing.slug {
                        info!("📚️ Catalog item #{id} renamed. Slug '{}' is now '{}'", existing.slug, updated.slug);
                    }
                    return Ok(updated);
                },
                Err(CatalogError::SlugTaken(s)) if title_changed && attempt < SLUG_INSERT_ATTEMPTS => {
                    debug!("📚️ Slug '{s}' was claimed concurrently. Retrying ({attempt}/{SLUG_INSERT_ATTEMPTS})");
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }
}

fn check_permission(role: Role, kind: CatalogKind) -> Result<(), CatalogError> {
    match (role, kind) {
        (Role::Admin, _) | (Role::Instructor, CourseType::Course) => Ok(()),
        (Role::Instructor, kind) => Err(CatalogError::Forbidden(format!("Instructors cannot manage {kind} items"))),
        (Role::Student, _) => Err(CatalogError::Forbidden("Students cannot manage the catalog".into())),
    }
}

fn check_price(price: Option<f64>) -> Result<(), CatalogError> {
    match price {
        Some(p) if !p.is_finite() || p < 0.0 => Err(CatalogError::InvalidInput(format!("{p} is not a valid price"))),
        _ => Ok(()),
    }
}
