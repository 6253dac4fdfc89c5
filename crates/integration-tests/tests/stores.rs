//! Store pages, the add/edit forms and photo uploads.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use image::{GenericImageView, ImageFormat};
use storefinder_integration_tests::{MultipartForm, TestApp, image_bytes};

#[tokio::test]
async fn test_add_form_requires_login() {
    let mut app = TestApp::new();

    app.get("/add").await.assert_redirect("/login");
    let login = app.get("/login").await;
    assert!(login.body.contains("You must be logged in to do that!"));
}

#[tokio::test]
async fn test_anonymous_create_never_reaches_handler() {
    let mut app = TestApp::new();

    app.post_multipart("/stores", MultipartForm::store("Sneaky Store"))
        .await
        .assert_redirect("/login");

    let stores = app.state().stores().find_all().await.unwrap();
    assert!(stores.is_empty());
}

#[tokio::test]
async fn test_create_and_view_store() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;

    let location = app
        .create_store(MultipartForm::store("Cafe Nero").text("tags", "Wifi"))
        .await;
    assert_eq!(location, "/store/cafe-nero");

    let page = app.get(&location).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Successfully Created Cafe Nero. Care to leave a review?"));
    assert!(page.body.contains("1 High St, London"));
    assert!(page.body.contains("#Wifi"));
    assert!(page.body.contains("/static/images/store.svg"));

    // The flash is gone on the next view.
    let again = app.get(&location).await;
    assert!(!again.body.contains("Successfully Created"));
}

#[tokio::test]
async fn test_duplicate_names_get_numbered_slugs() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;

    let mut locations = Vec::new();
    for _ in 0..3 {
        locations.push(app.create_store(MultipartForm::store("Cafe Nero")).await);
    }

    assert_eq!(
        locations,
        ["/store/cafe-nero", "/store/cafe-nero-2", "/store/cafe-nero-3"]
    );
}

#[tokio::test]
async fn test_missing_fields_flash_every_error() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;

    let response = app
        .post_multipart("/stores", MultipartForm::new().text("name", "  "))
        .await;
    response.assert_redirect("/add");

    let form = app.get("/add").await;
    assert!(form.body.contains("You must supply a store name!"));
    assert!(form.body.contains("You must supply an address!"));
    assert!(form.body.contains("You must supply coordinates!"));
    assert!(app.state().stores().find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_png_upload_is_resized_and_stored() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;

    let png = image_bytes(1600, 400, ImageFormat::Png);
    app.create_store(MultipartForm::store("Big Photo").file("photo", "big.png", "image/png", &png))
        .await;

    let store = app.state().stores().find_by_slug("big-photo").await.unwrap();
    let photo = store.photo.unwrap();
    assert!(photo.ends_with(".png"));

    let stored = image::open(app.upload_dir().join(&photo)).unwrap();
    assert_eq!(stored.dimensions(), (800, 200));

    let served = app.get(&format!("/uploads/{photo}")).await;
    assert_eq!(served.status, StatusCode::OK);
}

#[tokio::test]
async fn test_each_upload_gets_its_own_file() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;

    let jpeg = image_bytes(300, 300, ImageFormat::Jpeg);
    for name in ["First", "Second"] {
        app.create_store(MultipartForm::store(name).file("photo", "same.jpg", "image/jpeg", &jpeg))
            .await;
    }

    let photos: Vec<String> = app
        .state()
        .stores()
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .filter_map(|s| s.photo)
        .collect();
    assert_eq!(photos.len(), 2);
    assert_ne!(photos.first(), photos.get(1));
    assert!(photos.iter().all(|p| p.ends_with(".jpeg")));
}

#[tokio::test]
async fn test_text_upload_is_rejected_but_store_is_created() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;

    let location = app
        .create_store(MultipartForm::store("Plain Text").file(
            "photo",
            "notes.txt",
            "text/plain",
            b"definitely not an image",
        ))
        .await;
    assert_eq!(location, "/store/plain-text");

    let page = app.get(&location).await;
    assert!(page.body.contains("That filetype isn"));
    assert!(page.body.contains("Successfully Created Plain Text."));

    let store = app.state().stores().find_by_slug("plain-text").await.unwrap();
    assert!(store.photo.is_none());
    assert_eq!(std::fs::read_dir(app.upload_dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_empty_file_part_is_ignored() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;

    app.create_store(MultipartForm::store("No Photo").file(
        "photo",
        "",
        "application/octet-stream",
        b"",
    ))
    .await;

    let page = app.get("/store/no-photo").await;
    assert!(!page.body.contains("filetype"));
}

#[tokio::test]
async fn test_edit_keeps_slug_unless_name_changes() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;
    app.create_store(MultipartForm::store("Cafe Nero").text("tags", "Wifi"))
        .await;
    let id = app
        .state()
        .stores()
        .find_by_slug("cafe-nero")
        .await
        .unwrap()
        .id;
    let edit_url = format!("/stores/{id}/edit");

    let form = app.get(&edit_url).await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("value=\"Cafe Nero\""));

    // Same name, new address, every tag unchecked.
    app.post_multipart(
        &format!("/stores/{id}"),
        MultipartForm::store("Cafe Nero")
            .text("address", "2 Low Rd")
            .text("tags_present", "1"),
    )
    .await
    .assert_redirect(&edit_url);
    let store = app.state().stores().find_by_id(id).await.unwrap();
    assert_eq!(store.slug.as_str(), "cafe-nero");
    assert!(store.tags.is_empty());
    assert!(
        app.get(&edit_url)
            .await
            .body
            .contains("Successfully updated Cafe Nero.")
    );

    // Renamed.
    app.post_multipart(&format!("/stores/{id}"), MultipartForm::store("Nero Espresso"))
        .await
        .assert_redirect(&edit_url);
    let store = app.state().stores().find_by_id(id).await.unwrap();
    assert_eq!(store.slug.as_str(), "nero-espresso");
    assert_eq!(app.get("/store/cafe-nero").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_with_blank_coordinates_fails() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;
    app.create_store(MultipartForm::store("Cafe Nero")).await;
    let id = app
        .state()
        .stores()
        .find_by_slug("cafe-nero")
        .await
        .unwrap()
        .id;

    app.post_multipart(
        &format!("/stores/{id}"),
        MultipartForm::new()
            .text("name", "Cafe Nero")
            .text("address", "1 High St")
            .text("lng", "")
            .text("lat", "51.5"),
    )
    .await
    .assert_redirect(&format!("/stores/{id}/edit"));

    let form = app.get(&format!("/stores/{id}/edit")).await;
    assert!(form.body.contains("You must supply coordinates!"));
}

#[tokio::test]
async fn test_unknown_pages_are_404() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;

    for path in [
        "/store/nowhere",
        "/store/Not_A_Slug",
        "/stores/999/edit",
        "/stores/abc/edit",
        "/no/such/page",
    ] {
        let response = app.get(path).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{path}");
        assert!(response.body.contains("Not Found"), "{path}");
    }

    let response = app
        .post_multipart("/stores/abc", MultipartForm::store("Nowhere"))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body.contains("Not Found"));
}

#[tokio::test]
async fn test_404_keeps_pending_flash_for_next_page() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;
    let location = app.create_store(MultipartForm::store("Cafe Nero")).await;

    for path in ["/no/such/page", "/store/nowhere", "/stores/abc/edit"] {
        let missing = app.get(path).await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND, "{path}");
        assert!(!missing.body.contains("Successfully Created"), "{path}");
    }

    let page = app.get(&location).await;
    assert!(page.body.contains("Successfully Created Cafe Nero."));
}

#[tokio::test]
async fn test_favicon_request_does_not_eat_flash() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;
    let location = app.create_store(MultipartForm::store("Cafe Nero")).await;

    let favicon = app.get("/favicon.ico").await;
    assert_eq!(favicon.status, StatusCode::PERMANENT_REDIRECT);
    assert_eq!(favicon.location(), Some("/static/images/store.svg"));

    assert!(
        app.get(&location)
            .await
            .body
            .contains("Successfully Created Cafe Nero.")
    );
}

#[tokio::test]
async fn test_store_listing_newest_first() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;
    app.create_store(MultipartForm::store("Older")).await;
    app.create_store(MultipartForm::store("Newer")).await;
    app.get("/").await;

    let listing = app.get("/stores").await;
    let older = listing.body.find("Older").unwrap();
    let newer = listing.body.find("Newer").unwrap();
    assert!(newer < older);
}
