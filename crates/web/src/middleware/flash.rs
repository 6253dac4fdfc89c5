//! One-shot flash messages stored in the session.
//!
//! Handlers push a message before redirecting; the next rendered page takes
//! every pending message, which removes them from the session.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use super::auth::session_state;
use crate::models::{CurrentUser, Flash, SessionState, session_keys};

/// Queue a flash message for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn push_flash(
    session: &Session,
    flash: Flash,
) -> Result<(), tower_sessions::session::Error> {
    let mut flashes: Vec<Flash> = session
        .get(session_keys::FLASHES)
        .await?
        .unwrap_or_default();
    flashes.push(flash);
    session.insert(session_keys::FLASHES, flashes).await
}

/// Remove and return every pending flash message.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    session
        .remove::<Vec<Flash>>(session_keys::FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Per-request context every full page renders: who is signed in and the
/// flash messages to show.
///
/// Extracting it consumes the pending flashes, so only handlers that render
/// a page should ask for it.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
}

impl Page {
    /// The signed-in user plus every pending flash, which are removed.
    pub async fn for_session(session: &Session) -> Self {
        let mut page = Self::without_flashes(session).await;
        page.flashes = take_flashes(session).await;
        page
    }

    /// The signed-in user only. Pending flashes stay queued.
    pub async fn without_flashes(session: &Session) -> Self {
        let user = match session_state(session).await {
            SessionState::Authenticated(user) => Some(user),
            SessionState::Anonymous => None,
        };
        Self {
            user,
            flashes: Vec::new(),
        }
    }
}

impl<S> FromRequestParts<S> for Page
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Session>() {
            Some(session) => Ok(Self::for_session(session).await),
            None => Ok(Self::default()),
        }
    }
}

/// A [`Page`] for responses that should not use up pending flashes, such
/// as the 404 page.
pub struct QuietPage(pub Page);

impl<S> FromRequestParts<S> for QuietPage
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Session>() {
            Some(session) => Ok(Self(Page::without_flashes(session).await)),
            None => Ok(Self(Page::default())),
        }
    }
}
