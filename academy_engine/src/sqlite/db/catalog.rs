use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{CatalogItem, CatalogItemUpdate, CatalogKind, NewCatalogItem},
    traits::CatalogError,
};

pub async fn slug_exists(
    kind: CatalogKind,
    slug: &str,
    exclude_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM catalog_items WHERE kind = $1 AND slug = $2 AND ($3 IS NULL OR id <> $3))",
    )
    .bind(kind)
    .bind(slug)
    .bind(exclude_id)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

pub async fn insert_catalog_item(
    item: NewCatalogItem,
    slug: &str,
    conn: &mut SqliteConnection,
) -> Result<CatalogItem, CatalogError> {
    let result: Result<CatalogItem, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO catalog_items (kind, title, slug, description, price, currency, published)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(item.kind)
    .bind(item.title)
    .bind(slug)
    .bind(item.description)
    .bind(item.price)
    .bind(item.currency)
    .bind(item.published)
    .fetch_one(conn)
    .await;
    match result {
        Ok(item) => {
            debug!("🗃️ Catalog {} #{} saved as '{}'", item.kind, item.id, item.slug);
            Ok(item)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(CatalogError::SlugTaken(slug.to_string())),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_catalog_item(id: i64, conn: &mut SqliteConnection) -> Result<Option<CatalogItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM catalog_items WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_catalog_item_by_slug(
    kind: CatalogKind,
    slug: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<CatalogItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM catalog_items WHERE kind = $1 AND slug = $2")
        .bind(kind)
        .bind(slug)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_catalog(
    kind: CatalogKind,
    published_only: bool,
    conn: &mut SqliteConnection,
) -> Result<Vec<CatalogItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM catalog_items WHERE kind = $1 AND ($2 = 0 OR published = 1) ORDER BY title ASC")
        .bind(kind)
        .bind(published_only)
        .fetch_all(conn)
        .await
}

pub async fn update_catalog_item(
    id: i64,
    update: CatalogItemUpdate,
    conn: &mut SqliteConnection,
) -> Result<CatalogItem, CatalogError> {
    if update.is_empty() {
        debug!("🗃️ No fields to update for catalog item #{id}. Update request skipped.");
        return Err(CatalogError::NoOp);
    }
    let new_slug = update.slug.clone();
    let mut builder = QueryBuilder::new("UPDATE catalog_items SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(title) = update.title {
        set_clause.push("title = ");
        set_clause.push_bind_unseparated(title);
    }
    if let Some(slug) = update.slug {
        set_clause.push("slug = ");
        set_clause.push_bind_unseparated(slug);
    }
    if let Some(description) = update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description);
    }
    if let Some(price) = update.price {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(price);
    }
    if let Some(currency) = update.currency {
        set_clause.push("currency = ");
        set_clause.push_bind_unseparated(currency);
    }
    if let Some(published) = update.published {
        set_clause.push("published = ");
        set_clause.push_bind_unseparated(published);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let result = builder.build_query_as::<CatalogItem>().fetch_optional(conn).await;
    match result {
        Ok(Some(item)) => Ok(item),
        Ok(None) => Err(CatalogError::NotFound(id)),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(CatalogError::SlugTaken(new_slug.unwrap_or_default()))
        },
        Err(e) => Err(e.into()),
    }
}
