//! Registration, login and logout through the HTTP layer.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use storefinder_integration_tests::{PASSWORD, TestApp};

#[tokio::test]
async fn test_register_signs_in_and_shows_avatar() {
    let mut app = TestApp::new();

    app.register("Wes@Example.com", "Wes").await.assert_redirect("/");

    let home = app.get("/").await;
    assert_eq!(home.status, StatusCode::OK);
    assert!(home.body.contains("You are logged in!"));
    assert!(home.body.contains("https://gravatar.com/avatar/"));
    assert!(home.body.contains("Logout"));
}

#[tokio::test]
async fn test_login_with_correct_password() {
    let mut app = TestApp::new();
    app.register("wes@example.com", "Wes").await;
    app.post_form("/logout", &[]).await.assert_redirect("/");
    app.get("/").await;

    app.login("WES@example.com", PASSWORD)
        .await
        .assert_redirect("/");
    let home = app.get("/").await;
    assert!(home.body.contains("You are logged in!"));
    assert!(home.body.contains("Logout"));
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_look_the_same() {
    let mut app = TestApp::new();
    app.register("wes@example.com", "Wes").await;
    app.post_form("/logout", &[]).await;
    app.get("/").await;

    app.login("wes@example.com", "not the password")
        .await
        .assert_redirect("/login");
    let wrong_password = app.get("/login").await;

    app.login("nobody@example.com", PASSWORD)
        .await
        .assert_redirect("/login");
    let unknown_email = app.get("/login").await;

    for page in [&wrong_password, &unknown_email] {
        assert!(page.body.contains("Failed Login!"));
        assert!(page.body.contains("Log In"));
        assert!(!page.body.contains("Logout"));
    }
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let mut app = TestApp::new();
    app.register("wes@example.com", "Wes").await;
    app.clear_cookies();

    app.register("  WES@example.COM ", "Other Wes")
        .await
        .assert_redirect("/register");
    let page = app.get("/register").await;
    assert!(page.body.contains("An account with this email already exists"));
}

#[tokio::test]
async fn test_registration_validation_messages() {
    let mut app = TestApp::new();

    app.post_form(
        "/register",
        &[
            ("email", "wes@example.com"),
            ("name", "Wes"),
            ("password", PASSWORD),
            ("password-confirm", "something else"),
        ],
    )
    .await
    .assert_redirect("/register");
    assert!(app.get("/register").await.body.contains("do not match"));

    app.post_form(
        "/register",
        &[
            ("email", "not-an-email"),
            ("name", "Wes"),
            ("password", PASSWORD),
            ("password-confirm", PASSWORD),
        ],
    )
    .await
    .assert_redirect("/register");
    assert!(
        app.get("/register")
            .await
            .body
            .contains("You must supply a valid email!")
    );
}

#[tokio::test]
async fn test_logout_flashes_and_forgets_user() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;

    app.post_form("/logout", &[]).await.assert_redirect("/");
    let home = app.get("/").await;
    assert!(home.body.contains("You are now logged out!"));
    assert!(home.body.contains("Log In"));

    let gated = app.get("/add").await;
    gated.assert_redirect("/login");
}

#[tokio::test]
async fn test_login_attempts_are_rate_limited() {
    let mut app = TestApp::new();

    let mut statuses = Vec::new();
    for _ in 0..8 {
        statuses.push(app.login("wes@example.com", "wrong password").await.status);
    }

    assert_eq!(statuses.first(), Some(&StatusCode::SEE_OTHER));
    assert_eq!(statuses.last(), Some(&StatusCode::TOO_MANY_REQUESTS));
}
