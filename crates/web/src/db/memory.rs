//! In-process repositories.
//!
//! Used by the test suites and for running the site without a database. They
//! enforce the same uniqueness rules as the `PostgreSQL` schema.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use storefinder_core::{Email, Slug, StoreId, TagCount, UserId, count_tags};

use super::{RepositoryError, StoreRepository, UserRepository};
use crate::models::{Store, StoreFields, User};

#[derive(Default)]
struct StoreTable {
    last_id: i32,
    /// Insertion order, oldest first.
    rows: Vec<Store>,
}

impl StoreTable {
    fn slug_taken(&self, slug: &Slug, except: Option<StoreId>) -> bool {
        self.rows
            .iter()
            .any(|s| Some(s.id) != except && s.slug.as_str().eq_ignore_ascii_case(slug.as_str()))
    }

    fn newest_first(&self, keep: impl Fn(&Store) -> bool) -> Vec<Store> {
        self.rows.iter().rev().filter(|s| keep(*s)).cloned().collect()
    }
}

/// Store repository held in memory.
#[derive(Default)]
pub struct MemoryStoreRepository {
    table: RwLock<StoreTable>,
}

impl MemoryStoreRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreRepository for MemoryStoreRepository {
    async fn insert(&self, fields: &StoreFields, slug: &Slug) -> Result<Store, RepositoryError> {
        let mut table = self.table.write().await;
        if table.slug_taken(slug, None) {
            return Err(RepositoryError::Conflict("slug already exists".to_owned()));
        }

        table.last_id += 1;
        let store = Store {
            id: StoreId::new(table.last_id),
            name: fields.name.clone(),
            slug: slug.clone(),
            description: fields.description.clone(),
            tags: fields.tags.clone(),
            location: fields.location.clone(),
            photo: fields.photo.clone(),
            created_at: Utc::now(),
        };
        table.rows.push(store.clone());
        Ok(store)
    }

    async fn update(
        &self,
        id: StoreId,
        fields: &StoreFields,
        slug: &Slug,
    ) -> Result<Store, RepositoryError> {
        let mut table = self.table.write().await;
        if table.slug_taken(slug, Some(id)) {
            return Err(RepositoryError::Conflict("slug already exists".to_owned()));
        }

        let store = table
            .rows
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(RepositoryError::NotFound)?;
        store.name.clone_from(&fields.name);
        store.slug = slug.clone();
        store.description.clone_from(&fields.description);
        store.tags.clone_from(&fields.tags);
        store.location = fields.location.clone();
        store.photo.clone_from(&fields.photo);
        Ok(store.clone())
    }

    async fn list(&self) -> Result<Vec<Store>, RepositoryError> {
        Ok(self.table.read().await.newest_first(|_| true))
    }

    async fn get_by_slug(&self, slug: &Slug) -> Result<Option<Store>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|s| &s.slug == slug).cloned())
    }

    async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|s| s.id == id).cloned())
    }

    async fn count_slug_variants(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<usize, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .iter()
            .filter(|s| Some(s.id) != exclude && base.is_variant(s.slug.as_str()))
            .count())
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let table = self.table.read().await;
        let lists: Vec<&[String]> = table.rows.iter().map(|s| s.tags.as_slice()).collect();
        Ok(count_tags(&lists))
    }

    async fn list_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let table = self.table.read().await;
        Ok(match tag {
            Some(tag) => table.newest_first(|s| s.tags.iter().any(|t| t == tag)),
            None => table.newest_first(|s| !s.tags.is_empty()),
        })
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Store>, RepositoryError> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let table = self.table.read().await;
        let mut scored: Vec<(usize, &Store)> = table
            .rows
            .iter()
            .filter_map(|store| {
                let name = store.name.to_lowercase();
                let description = store.description.as_deref().unwrap_or("").to_lowercase();
                let mut score = 0;
                for term in &terms {
                    if name.contains(term.as_str()) {
                        score += 2;
                    } else if description.contains(term.as_str()) {
                        score += 1;
                    } else {
                        return None;
                    }
                }
                Some((score, store))
            })
            .collect();

        scored.sort_by(|(a_score, a), (b_score, b)| {
            b_score.cmp(a_score).then(a.id.as_i32().cmp(&b.id.as_i32()))
        });
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// User repository held in memory.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<Vec<(User, String)>>,
}

impl MemoryUserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create_with_password(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.iter().any(|(u, _)| &u.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let id = i32::try_from(users.len() + 1)
            .map_err(|_| RepositoryError::Conflict("user table full".to_owned()))?;
        let user = User {
            id: UserId::new(id),
            email: email.clone(),
            name: name.to_owned(),
            created_at: Utc::now(),
        };
        users.push((user.clone(), password_hash.to_owned()));
        Ok(user)
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|(u, _)| &u.email == email).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::StoreDraft;

    fn fields(name: &str, tags: &[&str]) -> StoreFields {
        StoreDraft {
            name: name.to_string(),
            description: Some(format!("{name} serves coffee")),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            address: "1 High St".to_string(),
            lng: Some(0.0),
            lat: Some(0.0),
            photo: None,
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_slug() {
        let repo = MemoryStoreRepository::new();
        let slug = Slug::from_name("Cafe Nero");
        repo.insert(&fields("Cafe Nero", &[]), &slug).await.unwrap();

        let err = repo.insert(&fields("Cafe Nero", &[]), &slug).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_missing_store() {
        let repo = MemoryStoreRepository::new();
        let err = repo
            .update(StoreId::new(42), &fields("Gone", &[]), &Slug::from_name("Gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_count_slug_variants_excludes_self() {
        let repo = MemoryStoreRepository::new();
        let base = Slug::from_name("Cafe Nero");
        let first = repo.insert(&fields("Cafe Nero", &[]), &base).await.unwrap();
        repo.insert(&fields("Cafe Nero", &[]), &base.with_suffix(2))
            .await
            .unwrap();
        repo.insert(&fields("Cafe Nero Bar", &[]), &Slug::from_name("Cafe Nero Bar"))
            .await
            .unwrap();

        assert_eq!(repo.count_slug_variants(&base, None).await.unwrap(), 2);
        assert_eq!(
            repo.count_slug_variants(&base, Some(first.id)).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let repo = MemoryStoreRepository::new();
        for name in ["One", "Two", "Three"] {
            repo.insert(&fields(name, &[]), &Slug::from_name(name))
                .await
                .unwrap();
        }
        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["Three", "Two", "One"]);
    }

    #[tokio::test]
    async fn test_list_by_tag() {
        let repo = MemoryStoreRepository::new();
        repo.insert(&fields("A", &["Wifi"]), &Slug::from_name("A"))
            .await
            .unwrap();
        repo.insert(&fields("B", &["Licensed"]), &Slug::from_name("B"))
            .await
            .unwrap();
        repo.insert(&fields("C", &[]), &Slug::from_name("C"))
            .await
            .unwrap();

        assert_eq!(repo.list_by_tag(Some("Wifi")).await.unwrap().len(), 1);
        assert_eq!(repo.list_by_tag(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_ranks_name_matches_first() {
        let repo = MemoryStoreRepository::new();
        repo.insert(&fields("Tea House", &[]), &Slug::from_name("Tea House"))
            .await
            .unwrap();
        repo.insert(&fields("Coffee Corner", &[]), &Slug::from_name("Coffee Corner"))
            .await
            .unwrap();

        let hits = repo.search("coffee", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits.first().unwrap().name, "Coffee Corner");

        assert_eq!(repo.search("coffee", 1).await.unwrap().len(), 1);
        assert!(repo.search("   ", 5).await.unwrap().is_empty());
        assert!(repo.search("pizza", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_email_unique() {
        let repo = MemoryUserRepository::new();
        let email = Email::parse("wes@example.com").unwrap();
        repo.create_with_password(&email, "Wes", "hash").await.unwrap();

        let err = repo
            .create_with_password(&email, "Other Wes", "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let (user, hash) = repo.get_password_hash(&email).await.unwrap().unwrap();
        assert_eq!(user.name, "Wes");
        assert_eq!(hash, "hash");
    }
}
