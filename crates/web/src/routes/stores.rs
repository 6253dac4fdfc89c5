//! Store route handlers: listing, detail, and the add/edit forms.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State, multipart::Field},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use storefinder_core::StoreId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{Page, RequireAuth, push_flash};
use crate::models::{Flash, Store, StoreDraft, StorePatch, TAG_CHOICES};
use crate::services::{StoreError, Upload};
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

/// Store listing template.
#[derive(Template, WebTemplate)]
#[template(path = "stores.html")]
pub struct StoresTemplate {
    pub page: Page,
    pub title: String,
    pub stores: Vec<Store>,
}

/// Store detail template.
#[derive(Template, WebTemplate)]
#[template(path = "store.html")]
pub struct StoreTemplate {
    pub page: Page,
    pub store: Store,
}

/// A tag checkbox on the store form.
pub struct TagOption {
    pub name: &'static str,
    pub checked: bool,
}

/// Add/edit store form template.
#[derive(Template, WebTemplate)]
#[template(path = "store_form.html")]
pub struct StoreFormTemplate {
    pub page: Page,
    pub title: String,
    pub action: String,
    pub name: String,
    pub description: String,
    pub address: String,
    pub lng: String,
    pub lat: String,
    pub photo: Option<String>,
    pub tags: Vec<TagOption>,
}

impl StoreFormTemplate {
    fn empty(page: Page) -> Self {
        Self {
            page,
            title: "Add Store".to_string(),
            action: "/stores".to_string(),
            name: String::new(),
            description: String::new(),
            address: String::new(),
            lng: String::new(),
            lat: String::new(),
            photo: None,
            tags: tag_options(&[]),
        }
    }

    fn for_store(page: Page, store: &Store) -> Self {
        Self {
            page,
            title: format!("Edit {}", store.name),
            action: format!("/stores/{}", store.id),
            name: store.name.clone(),
            description: store.description.clone().unwrap_or_default(),
            address: store.location.address.clone(),
            lng: store.location.lng().to_string(),
            lat: store.location.lat().to_string(),
            photo: store.photo.clone(),
            tags: tag_options(&store.tags),
        }
    }
}

fn tag_options(selected: &[String]) -> Vec<TagOption> {
    TAG_CHOICES
        .iter()
        .map(|&name| TagOption {
            name,
            checked: selected.iter().any(|t| t == name),
        })
        .collect()
}

// =============================================================================
// Multipart form
// =============================================================================

/// The store form as submitted. Fields the browser did not send stay `None`.
#[derive(Debug, Default)]
pub struct StoreForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub lng: Option<String>,
    pub lat: Option<String>,
    pub tags: Vec<String>,
    /// Set by a hidden input so that unchecking every tag clears them.
    pub tags_present: bool,
    pub photo: Option<Upload>,
}

impl StoreForm {
    /// Read every part of a multipart store submission.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the body is not valid multipart.
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match name.as_str() {
                "photo" => form.photo = Some(read_upload(field).await?),
                "name" => form.name = Some(read_text(field).await?),
                "description" => form.description = Some(read_text(field).await?),
                "address" => form.address = Some(read_text(field).await?),
                "lng" => form.lng = Some(read_text(field).await?),
                "lat" => form.lat = Some(read_text(field).await?),
                "tags" => form.tags.push(read_text(field).await?),
                "tags_present" => form.tags_present = true,
                other => tracing::debug!(field = %other, "ignoring unknown form field"),
            }
        }

        Ok(form)
    }

    /// A full draft for creating a store. Missing fields are blank.
    #[must_use]
    pub fn into_draft(self, photo: Option<String>) -> StoreDraft {
        StoreDraft {
            name: self.name.unwrap_or_default(),
            description: self.description,
            tags: self.tags,
            address: self.address.unwrap_or_default(),
            lng: self.lng.as_deref().and_then(parse_coordinate),
            lat: self.lat.as_deref().and_then(parse_coordinate),
            photo,
        }
    }

    /// A patch for updating a store. Only submitted fields change.
    #[must_use]
    pub fn into_patch(self, photo: Option<String>) -> StorePatch {
        let tags = (self.tags_present || !self.tags.is_empty()).then_some(self.tags);
        StorePatch {
            name: self.name,
            description: self.description,
            tags,
            address: self.address,
            lng: self.lng.as_deref().map(parse_coordinate),
            lat: self.lat.as_deref().map(parse_coordinate),
            photo,
        }
    }
}

/// An id that is not a number names no store.
fn parse_store_id(raw: &str) -> std::result::Result<StoreId, StoreError> {
    raw.parse::<i32>()
        .map(StoreId::new)
        .map_err(|_| StoreError::NotFound)
}

/// Blank or non-numeric coordinates count as missing.
fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

async fn read_text(field: Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

async fn read_upload(field: Field<'_>) -> Result<Upload> {
    let file_name = field.file_name().map(str::to_owned);
    let content_type = field.content_type().map(str::to_owned);
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(Upload {
        file_name,
        content_type,
        bytes,
    })
}

/// Run the photo through the media pipeline.
///
/// A rejected file is flashed and dropped so the rest of the submission
/// still goes through.
async fn store_photo(
    state: &AppState,
    session: &Session,
    upload: Option<Upload>,
) -> Result<Option<String>> {
    match state.media().process(upload).await {
        Ok(photo) => Ok(photo),
        Err(e) if e.is_rejection() => {
            tracing::info!(error = %e, "photo rejected");
            push_flash(session, Flash::error(e.to_string())).await?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Flash each validation message and send the user back to the form.
async fn back_to_form(
    session: &Session,
    messages: &[String],
    form_url: &str,
) -> Result<Response> {
    for message in messages {
        push_flash(session, Flash::error(message.clone())).await?;
    }
    Ok(Redirect::to(form_url).into_response())
}

// =============================================================================
// Handlers
// =============================================================================

/// Display every store, newest first.
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>, page: Page) -> Result<impl IntoResponse> {
    let stores = state.stores().find_all().await?;
    Ok(StoresTemplate {
        page,
        title: "Stores".to_string(),
        stores,
    })
}

/// Display a single store by slug.
///
/// Flashes are only taken once the store is found, so a 404 leaves them for
/// the next page.
#[instrument(skip_all, fields(slug = %slug))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    session: Session,
) -> Result<impl IntoResponse> {
    let store = state.stores().find_by_slug(&slug).await?;
    let page = Page::for_session(&session).await;
    Ok(StoreTemplate { page, store })
}

/// Display the empty store form.
pub async fn add(RequireAuth(_user): RequireAuth, page: Page) -> impl IntoResponse {
    StoreFormTemplate::empty(page)
}

/// Create a store from the submitted form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = StoreForm::read(multipart).await?;
    let photo = store_photo(&state, &session, form.photo.take()).await?;

    match state.stores().create(form.into_draft(photo)).await {
        Ok(store) => {
            add_breadcrumb(
                "stores",
                "Created store",
                Some(&[("slug", store.slug.as_str())]),
            );
            push_flash(
                &session,
                Flash::success(format!(
                    "Successfully Created {}. Care to leave a review?",
                    store.name
                )),
            )
            .await?;
            Ok(Redirect::to(&format!("/store/{}", store.slug)).into_response())
        }
        Err(StoreError::Validation(errors)) => {
            back_to_form(&session, errors.messages(), "/add").await
        }
        Err(e) => Err(e.into()),
    }
}

/// Display the edit form for a store.
#[instrument(skip_all, fields(store_id = %id))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<String>,
    session: Session,
) -> Result<impl IntoResponse> {
    let store = state.stores().find_by_id(parse_store_id(&id)?).await?;
    let page = Page::for_session(&session).await;
    Ok(StoreFormTemplate::for_store(page, &store))
}

/// Apply the submitted form to an existing store.
#[instrument(skip_all, fields(store_id = %id, user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    session: Session,
    multipart: Multipart,
) -> Result<Response> {
    let id = parse_store_id(&id)?;
    let edit_url = format!("/stores/{id}/edit");

    let mut form = StoreForm::read(multipart).await?;
    let photo = store_photo(&state, &session, form.photo.take()).await?;

    match state.stores().update(id, form.into_patch(photo)).await {
        Ok(store) => {
            push_flash(
                &session,
                Flash::success(format!("Successfully updated {}.", store.name)),
            )
            .await?;
            Ok(Redirect::to(&edit_url).into_response())
        }
        Err(StoreError::Validation(errors)) => {
            back_to_form(&session, errors.messages(), &edit_url).await
        }
        Err(e) => Err(AppError::from(e)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn submitted() -> StoreForm {
        StoreForm {
            name: Some("Cafe Nero".to_string()),
            description: Some(String::new()),
            address: Some("1 High St".to_string()),
            lng: Some("-0.12".to_string()),
            lat: Some("abc".to_string()),
            tags: vec![],
            tags_present: true,
            photo: None,
        }
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate(" 43.5 "), Some(43.5));
        assert_eq!(parse_coordinate(""), None);
        assert_eq!(parse_coordinate("north"), None);
        assert_eq!(parse_coordinate("NaN"), None);
    }

    #[test]
    fn test_parse_store_id() {
        assert_eq!(parse_store_id("42").unwrap(), StoreId::new(42));
        assert!(matches!(parse_store_id("abc"), Err(StoreError::NotFound)));
        assert!(matches!(parse_store_id(""), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_draft_from_form() {
        let draft = submitted().into_draft(Some("a.png".to_string()));
        assert_eq!(draft.name, "Cafe Nero");
        assert_eq!(draft.lng, Some(-0.12));
        assert_eq!(draft.lat, None);
        assert_eq!(draft.photo.as_deref(), Some("a.png"));
    }

    #[test]
    fn test_patch_from_form() {
        let patch = submitted().into_patch(None);
        // Submitted but unparseable fails validation rather than keeping the old value.
        assert_eq!(patch.lat, Some(None));
        // The hidden marker means "no tags checked", which clears them.
        assert_eq!(patch.tags, Some(vec![]));
        assert!(patch.photo.is_none());
    }

    #[test]
    fn test_patch_without_tag_marker_keeps_tags() {
        let form = StoreForm {
            tags_present: false,
            ..submitted()
        };
        assert_eq!(form.into_patch(None).tags, None);
    }

    #[test]
    fn test_tag_options_mark_selected() {
        let options = tag_options(&["Wifi".to_string()]);
        assert_eq!(options.len(), TAG_CHOICES.len());
        assert!(options.iter().any(|o| o.name == "Wifi" && o.checked));
        assert_eq!(options.iter().filter(|o| o.checked).count(), 1);
    }
}
