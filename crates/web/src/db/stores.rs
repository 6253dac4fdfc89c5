//! `PostgreSQL` store repository.
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate builds
//! without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use storefinder_core::{Location, Slug, StoreId, TagCount};

use super::{RepositoryError, StoreRepository, conflict_or_database};
use crate::models::{Store, StoreFields};

macro_rules! store_columns {
    () => {
        "id, name, slug, description, tags, lng, lat, address, photo, created_at"
    };
}

/// Row shape of `storefinder.store`.
#[derive(sqlx::FromRow)]
struct StoreRow {
    id: i32,
    name: String,
    slug: String,
    description: Option<String>,
    tags: Vec<String>,
    lng: f64,
    lat: f64,
    address: String,
    photo: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        let slug = Slug::parse(&row.slug).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid slug in database: {e}"))
        })?;
        let location = Location::new(row.lng, row.lat, &row.address).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid location in database: {e}"))
        })?;

        Ok(Self {
            id: StoreId::new(row.id),
            name: row.name,
            slug,
            description: row.description,
            tags: row.tags,
            location,
            photo: row.photo,
            created_at: row.created_at,
        })
    }
}

fn into_stores(rows: Vec<StoreRow>) -> Result<Vec<Store>, RepositoryError> {
    rows.into_iter().map(Store::try_from).collect()
}

/// Store repository backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgStoreRepository {
    pool: PgPool,
}

impl PgStoreRepository {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreRepository for PgStoreRepository {
    async fn insert(&self, fields: &StoreFields, slug: &Slug) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(concat!(
            "INSERT INTO storefinder.store ",
            "(name, slug, description, tags, lng, lat, address, photo) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7, $8) ",
            "RETURNING ",
            store_columns!()
        ))
        .bind(&fields.name)
        .bind(slug.as_str())
        .bind(fields.description.as_deref())
        .bind(&fields.tags)
        .bind(fields.location.lng())
        .bind(fields.location.lat())
        .bind(&fields.location.address)
        .bind(fields.photo.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "slug"))?;

        row.try_into()
    }

    async fn update(
        &self,
        id: StoreId,
        fields: &StoreFields,
        slug: &Slug,
    ) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(concat!(
            "UPDATE storefinder.store SET ",
            "name = $2, slug = $3, description = $4, tags = $5, ",
            "lng = $6, lat = $7, address = $8, photo = $9 ",
            "WHERE id = $1 ",
            "RETURNING ",
            store_columns!()
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(slug.as_str())
        .bind(fields.description.as_deref())
        .bind(&fields.tags)
        .bind(fields.location.lng())
        .bind(fields.location.lat())
        .bind(&fields.location.address)
        .bind(fields.photo.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "slug"))?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn list(&self) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(concat!(
            "SELECT ",
            store_columns!(),
            " FROM storefinder.store ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        into_stores(rows)
    }

    async fn get_by_slug(&self, slug: &Slug) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(concat!(
            "SELECT ",
            store_columns!(),
            " FROM storefinder.store WHERE slug = $1"
        ))
        .bind(slug.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Store::try_from).transpose()
    }

    async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(concat!(
            "SELECT ",
            store_columns!(),
            " FROM storefinder.store WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Store::try_from).transpose()
    }

    async fn count_slug_variants(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<usize, RepositoryError> {
        // Slugs are [a-z0-9-] only, so the base needs no regex escaping.
        let pattern = format!("^{base}(-[0-9]+)?$");
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM storefinder.store \
             WHERE slug ~* $1 AND ($2::int4 IS NULL OR id <> $2)",
        )
        .bind(pattern)
        .bind(exclude.map(|id| id.as_i32()))
        .fetch_one(&self.pool)
        .await?;

        usize::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative count {count}")))
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT tag, COUNT(*) AS count \
             FROM storefinder.store, unnest(tags) AS tag \
             GROUP BY tag \
             ORDER BY count DESC, MIN(id)",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(tag, count)| TagCount {
                tag,
                count: u64::try_from(count).unwrap_or_default(),
            })
            .collect())
    }

    async fn list_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(concat!(
            "SELECT ",
            store_columns!(),
            " FROM storefinder.store ",
            "WHERE CASE WHEN $1::text IS NULL THEN cardinality(tags) > 0 ELSE $1 = ANY(tags) END ",
            "ORDER BY created_at DESC, id DESC"
        ))
        .bind(tag)
        .fetch_all(&self.pool)
        .await?;

        into_stores(rows)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(concat!(
            "SELECT ",
            store_columns!(),
            " FROM storefinder.store, plainto_tsquery('english', $1) AS q ",
            "WHERE search_vector @@ q ",
            "ORDER BY ts_rank(search_vector, q) DESC, id ",
            "LIMIT $2"
        ))
        .bind(query)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        into_stores(rows)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
