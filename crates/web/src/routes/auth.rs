//! Authentication route handlers.
//!
//! Handles login, registration and logout with email + password. Outcomes
//! are reported through flash messages and `303 See Other` redirects.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Page, push_flash, sign_in, sign_out};
use crate::models::Flash;
use crate::services::AuthError;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(rename = "password-confirm")]
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub page: Page,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub page: Page,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(page: Page) -> impl IntoResponse {
    LoginTemplate { page }
}

/// Handle login form submission.
///
/// Unknown emails and wrong passwords get the same message.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match state.auth().login(&form.email, &form.password).await {
        Ok(user) => {
            sign_in(&session, &user).await?;
            tracing::info!(user_id = %user.id, "user logged in");
            push_flash(&session, Flash::success("You are logged in!")).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("failed login attempt");
            push_flash(&session, Flash::error("Failed Login!")).await?;
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) => Err(AppError::Auth(e)),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(page: Page) -> impl IntoResponse {
    RegisterTemplate { page }
}

/// Handle registration form submission.
///
/// A successful registration signs the new user in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    if form.password != form.password_confirm {
        push_flash(&session, Flash::error("Oops! Your passwords do not match")).await?;
        return Ok(Redirect::to("/register").into_response());
    }

    match state
        .auth()
        .register(&form.email, &form.name, &form.password)
        .await
    {
        Ok(user) => {
            sign_in(&session, &user).await?;
            tracing::info!(user_id = %user.id, "user registered");
            push_flash(&session, Flash::success("You are logged in!")).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => match e.form_message() {
            Some(message) => {
                push_flash(&session, Flash::error(message)).await?;
                Ok(Redirect::to("/register").into_response())
            }
            None => Err(AppError::Auth(e)),
        },
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
pub async fn logout(session: Session) -> Result<Response> {
    sign_out(&session).await?;
    push_flash(&session, Flash::success("You are now logged out!")).await?;
    Ok(Redirect::to("/").into_response())
}
