//! Store service.
//!
//! Creating and renaming stores picks a unique slug in two steps: count the
//! existing stores whose slug is the base or a numbered variant of it, then
//! write with the next free suffix. The unique index on `slug` is the real
//! guarantee; when a concurrent write takes the candidate first, the write
//! is retried with the next suffix.

use std::future::Future;

use thiserror::Error;

use storefinder_core::{Slug, StoreId, TagCount};

use crate::db::{RepositoryError, StoreRepository};
use crate::models::{Store, StoreDraft, StorePatch, ValidationErrors};

/// Writes attempted before giving up on finding a free slug.
pub const MAX_SLUG_ATTEMPTS: u32 = 16;

/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Upper bound on search results per request.
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Submitted fields failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// No store matches the slug or ID.
    #[error("store not found")]
    NotFound,

    /// Every slug tried was taken by a concurrent write.
    #[error("no free slug for {base} after {MAX_SLUG_ATTEMPTS} attempts")]
    SlugExhausted { base: String },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// Store service.
pub struct StoreService<'a> {
    stores: &'a dyn StoreRepository,
}

impl<'a> StoreService<'a> {
    /// Create a new store service.
    #[must_use]
    pub const fn new(stores: &'a dyn StoreRepository) -> Self {
        Self { stores }
    }

    /// Validate and save a new store under a unique slug.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if required fields are missing or invalid.
    /// Returns `StoreError::SlugExhausted` if no free slug was found.
    #[tracing::instrument(skip_all, fields(name = %draft.name))]
    pub async fn create(&self, draft: StoreDraft) -> Result<Store, StoreError> {
        let fields = draft.validate()?;
        let base = Slug::from_name(&fields.name);

        let stores = self.stores;
        let fields = &fields;
        let store = self
            .with_unique_slug(&base, None, |slug| async move {
                stores.insert(fields, &slug).await
            })
            .await?;

        tracing::info!(store_id = %store.id, slug = %store.slug, "store created");
        Ok(store)
    }

    /// Apply a patch to a store and re-validate it.
    ///
    /// The slug is recomputed only when the name changes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no store has this ID.
    /// Returns `StoreError::Validation` if the patched store is invalid.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: StoreId, patch: StorePatch) -> Result<Store, StoreError> {
        let current = self.find_by_id(id).await?;
        let fields = patch.apply(&current).validate()?;

        if fields.name == current.name {
            return Ok(self.stores.update(id, &fields, &current.slug).await?);
        }

        let base = Slug::from_name(&fields.name);
        let stores = self.stores;
        let fields = &fields;
        let store = self
            .with_unique_slug(&base, Some(id), |slug| async move {
                stores.update(id, fields, &slug).await
            })
            .await?;

        tracing::info!(from = %current.slug, to = %store.slug, "store renamed");
        Ok(store)
    }

    /// All stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn find_all(&self) -> Result<Vec<Store>, StoreError> {
        Ok(self.stores.list().await?)
    }

    /// Look up a store by slug. Malformed slugs are simply not found.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no store has this slug.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Store, StoreError> {
        let slug = Slug::parse(slug).map_err(|_| StoreError::NotFound)?;
        self.stores
            .get_by_slug(&slug)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Look up a store by ID.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no store has this ID.
    pub async fn find_by_id(&self, id: StoreId) -> Result<Store, StoreError> {
        self.stores.get_by_id(id).await?.ok_or(StoreError::NotFound)
    }

    /// Tags with usage counts, most used first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn list_tags(&self) -> Result<Vec<TagCount>, StoreError> {
        Ok(self.stores.tag_counts().await?)
    }

    /// Stores carrying `tag`; every tagged store when `tag` is absent or blank.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn find_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, StoreError> {
        let tag = tag.map(str::trim).filter(|t| !t.is_empty());
        Ok(self.stores.list_by_tag(tag).await?)
    }

    /// Text search over names and descriptions.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Store>, StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        Ok(self.stores.search(query, limit).await?)
    }

    /// Run `write` with the first free slug for `base`, bumping the suffix
    /// each time the write reports a slug conflict.
    async fn with_unique_slug<F, Fut>(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
        mut write: F,
    ) -> Result<Store, StoreError>
    where
        F: FnMut(Slug) -> Fut,
        Fut: Future<Output = Result<Store, RepositoryError>>,
    {
        let existing = self.stores.count_slug_variants(base, exclude).await?;
        let mut candidate = base.disambiguate(existing);

        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            match write(candidate.clone()).await {
                Err(RepositoryError::Conflict(_)) => {
                    let next = base
                        .suffix_of(candidate.as_str())
                        .map_or(2, |n| n.saturating_add(1));
                    tracing::debug!(slug = %candidate, attempt, "slug taken, retrying");
                    candidate = base.with_suffix(next);
                }
                result => return Ok(result?),
            }
        }

        tracing::error!(base = %base, "gave up looking for a free slug");
        Err(StoreError::SlugExhausted {
            base: base.to_string(),
        })
    }
}
