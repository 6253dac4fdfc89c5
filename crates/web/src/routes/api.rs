//! JSON API handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::models::Store;
use crate::services::stores::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};
use crate::state::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

/// One search hit, trimmed to what the typeahead needs.
#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub url: String,
}

impl From<Store> for SearchHit {
    fn from(store: Store) -> Self {
        let url = format!("/store/{}", store.slug);
        Self {
            name: store.name,
            slug: store.slug.into_inner(),
            description: store.description,
            url,
        }
    }
}

/// Full-text search over store names and descriptions.
///
/// A blank query returns an empty list.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchHit>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    let stores = state.stores().search(&query.q, limit).await?;
    Ok(Json(stores.into_iter().map(SearchHit::from).collect()))
}
