//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in user in route handlers, and
//! the helpers that move a session between anonymous and authenticated.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::flash::push_flash;
use crate::models::{CurrentUser, Flash, SessionState, User, session_keys};

/// Flash shown when an anonymous visitor hits a protected page.
pub const LOGIN_REQUIRED_MESSAGE: &str = "You must be logged in to do that!";

/// Extractor that requires a signed-in user.
///
/// If nobody is logged in, the handler does not run: the visitor is sent to
/// the login page with a flash message.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but the user is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Nobody is signed in: send them to the login page.
    RedirectToLogin,
    /// The session layer is missing from the router.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::MissingSession => {
                tracing::error!("RequireAuth used on a route without the session layer");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::MissingSession)?;

        if let SessionState::Authenticated(user) = session_state(&session).await {
            return Ok(Self(user));
        }

        tracing::debug!(path = %parts.uri.path(), "anonymous request to protected page");
        if let Err(e) = push_flash(&session, Flash::error(LOGIN_REQUIRED_MESSAGE)).await {
            tracing::warn!("Failed to store flash: {}", e);
        }
        Err(AuthRejection::RedirectToLogin)
    }
}

/// Read the authentication state of a session. Unreadable session data
/// counts as anonymous.
pub async fn session_state(session: &Session) -> SessionState {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
        .into()
}

/// Sign a user in.
///
/// The session ID is rotated first so an ID planted before login is useless
/// afterwards.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_in(session: &Session, user: &User) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::CURRENT_USER, CurrentUser::from(user))
        .await?;
    crate::error::set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Sign the current user out, rotating the session ID.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_out(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    session.cycle_id().await?;
    crate::error::clear_sentry_user();
    Ok(())
}
