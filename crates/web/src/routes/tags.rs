//! Tag route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::instrument;

use storefinder_core::TagCount;

use crate::error::Result;
use crate::filters;
use crate::middleware::Page;
use crate::models::Store;
use crate::state::AppState;

/// A tag in the tag bar.
pub struct TagLink {
    pub tag: String,
    pub count: u64,
    pub active: bool,
}

impl TagLink {
    fn new(count: TagCount, active: Option<&str>) -> Self {
        Self {
            active: active == Some(count.tag.as_str()),
            tag: count.tag,
            count: count.count,
        }
    }
}

/// Tag counts plus the stores under the selected tag.
#[derive(Template, WebTemplate)]
#[template(path = "tags.html")]
pub struct TagsTemplate {
    pub page: Page,
    pub tags: Vec<TagLink>,
    pub active: Option<String>,
    pub stores: Vec<Store>,
}

/// Every tag, and every store that carries at least one.
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>, page: Page) -> Result<impl IntoResponse> {
    render(&state, page, None).await
}

/// Every tag, and the stores carrying `tag`.
#[instrument(skip_all, fields(tag = %tag))]
pub async fn show(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    page: Page,
) -> Result<impl IntoResponse> {
    render(&state, page, Some(tag)).await
}

async fn render(state: &AppState, page: Page, active: Option<String>) -> Result<TagsTemplate> {
    let service = state.stores();
    let (tags, stores) = tokio::try_join!(
        service.list_tags(),
        service.find_by_tag(active.as_deref())
    )?;

    let tags = tags
        .into_iter()
        .map(|count| TagLink::new(count, active.as_deref()))
        .collect();

    Ok(TagsTemplate {
        page,
        tags,
        active,
        stores,
    })
}
