//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::WebConfig;
use crate::db::{
    MemoryStoreRepository, MemoryUserRepository, PgStoreRepository, PgUserRepository,
    StoreRepository, UserRepository,
};
use crate::services::{AuthService, MediaStore, StoreService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the repositories, the media store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    stores: Arc<dyn StoreRepository>,
    users: Arc<dyn UserRepository>,
    media: MediaStore,
}

impl AppState {
    /// Create application state over the given repositories.
    #[must_use]
    pub fn new(
        config: WebConfig,
        stores: Arc<dyn StoreRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        let media = MediaStore::new(config.upload_dir.clone(), config.max_photo_dimension);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                users,
                media,
            }),
        }
    }

    /// State backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(config: WebConfig, pool: PgPool) -> Self {
        Self::new(
            config,
            Arc::new(PgStoreRepository::new(pool.clone())),
            Arc::new(PgUserRepository::new(pool)),
        )
    }

    /// State backed by in-process repositories. Nothing survives a restart.
    #[must_use]
    pub fn in_memory(config: WebConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemoryStoreRepository::new()),
            Arc::new(MemoryUserRepository::new()),
        )
    }

    /// Get a reference to the web configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Get the store repository.
    #[must_use]
    pub fn store_repository(&self) -> &dyn StoreRepository {
        self.inner.stores.as_ref()
    }

    /// Get the media store for photo uploads.
    #[must_use]
    pub fn media(&self) -> &MediaStore {
        &self.inner.media
    }

    /// Store operations (slugs, validation, tags, search).
    #[must_use]
    pub fn stores(&self) -> StoreService<'_> {
        StoreService::new(self.inner.stores.as_ref())
    }

    /// Registration and login.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.inner.users.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_state_is_ready() {
        let state = AppState::in_memory(WebConfig::for_local("/tmp/storefinder-test"));
        assert!(state.store_repository().ping().await.is_ok());
        assert_eq!(state.media().upload_dir().to_str(), Some("/tmp/storefinder-test"));
    }
}
