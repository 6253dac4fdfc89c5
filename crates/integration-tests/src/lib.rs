//! Integration tests for Storefinder.
//!
//! The whole application (routes, middleware, session layer) is driven
//! in-process with `tower::ServiceExt::oneshot`, over in-memory repositories,
//! an in-memory session store and a temporary upload directory. No database
//! or running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storefinder-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::io::Cursor;
use std::path::Path;

use axum::{
    Router,
    body::Body,
    http::{
        HeaderMap, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
};
use image::{DynamicImage, ImageFormat, RgbImage};
use tempfile::TempDir;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use storefinder_web::config::WebConfig;
use storefinder_web::middleware::session::SESSION_COOKIE_NAME;
use storefinder_web::middleware::session_layer_with_store;
use storefinder_web::routes;
use storefinder_web::state::AppState;

/// A password that passes the strength check.
pub const PASSWORD: &str = "correct horse battery";

/// One browser talking to a fresh application instance.
pub struct TestApp {
    router: Router,
    state: AppState,
    upload_dir: TempDir,
    cookie: Option<String>,
}

/// A fully buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Redirect target, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// Assert a `303 See Other` to `path`.
    pub fn assert_redirect(&self, path: &str) {
        assert_eq!(self.status, StatusCode::SEE_OTHER, "body: {}", self.body);
        assert_eq!(self.location(), Some(path));
    }

    /// Parse the body as JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Fresh application with empty repositories and no session.
    #[must_use]
    pub fn new() -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let config = WebConfig::for_local(upload_dir.path());
        let session_layer = session_layer_with_store(MemoryStore::default(), &config);
        let state = AppState::in_memory(config);
        let router = routes::app(state.clone()).layer(session_layer);

        Self {
            router,
            state,
            upload_dir,
            cookie: None,
        }
    }

    /// Shared state, for inspecting the repositories directly.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Where uploaded photos end up.
    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        self.upload_dir.path()
    }

    /// Forget the session cookie, like a new browser.
    pub fn clear_cookies(&mut self) {
        self.cookie = None;
    }

    /// Send a request, carrying and updating the session cookie.
    pub async fn send(&mut self, mut request: Request<Body>) -> TestResponse {
        let headers = request.headers_mut();
        // The rate limiter keys on the client address.
        headers.insert("x-forwarded-for", "203.0.113.10".parse().unwrap());
        if let Some(cookie) = &self.cookie {
            headers.insert(COOKIE, cookie.parse().unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();

        for value in response.headers().get_all(SET_COOKIE) {
            let pair = value.to_str().unwrap().split(';').next().unwrap().trim();
            if pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")) {
                self.cookie = Some(pair.to_owned());
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// GET a path.
    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Request::get(path).body(Body::empty()).unwrap())
            .await
    }

    /// POST a urlencoded form.
    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let request = Request::post(path)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// POST a multipart form.
    pub async fn post_multipart(&mut self, path: &str, form: MultipartForm) -> TestResponse {
        let (content_type, body) = form.finish();
        let request = Request::post(path)
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Register (which also signs in).
    pub async fn register(&mut self, email: &str, name: &str) -> TestResponse {
        self.post_form(
            "/register",
            &[
                ("email", email),
                ("name", name),
                ("password", PASSWORD),
                ("password-confirm", PASSWORD),
            ],
        )
        .await
    }

    /// Log in with email and password.
    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        self.post_form("/login", &[("email", email), ("password", password)])
            .await
    }

    /// Register a throwaway user and stay signed in.
    pub async fn sign_in_as_new_user(&mut self) {
        let response = self.register("tester@example.com", "Tester").await;
        response.assert_redirect("/");
        // Drain the welcome flash.
        self.get("/").await;
    }

    /// Submit the add form and return the redirect target.
    pub async fn create_store(&mut self, form: MultipartForm) -> String {
        let response = self.post_multipart("/stores", form).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "body: {}", response.body);
        response.location().unwrap().to_owned()
    }
}

/// Minimal percent-encoding for form bodies.
fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(byte));
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Builder for `multipart/form-data` bodies.
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    #[must_use]
    pub fn new() -> Self {
        Self {
            boundary: "storefinder-test-boundary".to_owned(),
            body: Vec::new(),
        }
    }

    /// A store form with name, address and coordinates filled in.
    #[must_use]
    pub fn store(name: &str) -> Self {
        Self::new()
            .text("name", name)
            .text("description", "A lovely place.")
            .text("address", "1 High St, London")
            .text("lng", "-0.1278")
            .text("lat", "51.5074")
    }

    /// Add a text field.
    #[must_use]
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    /// Add a file field.
    #[must_use]
    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Content-Type header value and body.
    #[must_use]
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}

/// Encode a solid-colour RGB image.
#[must_use]
pub fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40])));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}
