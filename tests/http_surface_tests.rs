//! Integration tests for the HTTP surface: session gating, validation and
//! the QR scan redirect, driven through the assembled router.

mod support;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tower::ServiceExt;

use portal_maintenance::config::AppConfig;
use portal_maintenance::repositories::QrCodeRepository;
use portal_maintenance::server::{AppState, create_app};
use support::setup_db;

async fn test_app() -> (Arc<DatabaseConnection>, Router) {
    let db = setup_db().await;

    let config = AppConfig {
        profile: "test".to_string(),
        ..Default::default()
    };

    // AppState owns its own handle onto the same single-connection pool.
    let state = AppState::new(config, (*db).clone()).with_mailer(Arc::new(
        portal_maintenance::mail::MockMailer::new(),
    ));
    let app = create_app(state);

    (db, app)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Registers a technician and returns the session cookie value.
async fn register_session(app: &Router, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/register",
            json!({
                "email": email,
                "password": "password123",
                "first_name": "Jo",
                "last_name": "Martin"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("registration sets a session cookie")
        .to_str()
        .unwrap();
    cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn admin_routes_require_a_session() {
    let (_db, app) = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/admin/portals")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");

    let cookie = register_session(&app, "jo@example.com").await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/admin/portals")
                .header(header::COOKIE, cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_rejects_bad_credentials_and_accepts_good_ones() {
    let (_db, app) = test_app().await;
    register_session(&app, "jo@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            json!({ "email": "jo@example.com", "password": "wrong-password" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            json!({ "email": "jo@example.com", "password": "password123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_some());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (_db, app) = test_app().await;
    register_session(&app, "jo@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/register",
            json!({
                "email": "jo@example.com",
                "password": "password123",
                "first_name": "Jo",
                "last_name": "Martin"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

async fn create_portal(app: &Router, cookie: &str, internal_id: &str) -> Value {
    let mut request = json_request(
        "POST",
        "/admin/portals",
        json!({
            "internal_id": internal_id,
            "name": format!("Portal {internal_id}"),
            "address_street": "12 rue des Lilas",
            "address_zipcode": "69003",
            "address_city": "Lyon",
            "contractor_company": "Garde-Portail SARL",
            "contact_phone": "+33 4 00 00 00 00",
            "installation_date": "2019-06-01"
        }),
    );
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await
}

#[tokio::test]
async fn portal_crud_and_public_view() {
    let (_db, app) = test_app().await;
    let cookie = register_session(&app, "jo@example.com").await;

    let portal = create_portal(&app, &cookie, "P-0300").await;
    let portal_id = portal["id"].as_str().unwrap().to_string();

    // Public view works without a session.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/portals/{portal_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["internal_id"], "P-0300");

    // Bad installation date on create is a 400.
    let mut bad = json_request(
        "POST",
        "/admin/portals",
        json!({
            "internal_id": "P-0301",
            "name": "x",
            "address_street": "x",
            "address_zipcode": "x",
            "address_city": "x",
            "contractor_company": "x",
            "contact_phone": "x",
            "installation_date": "01/06/2019"
        }),
    );
    bad.headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = app.clone().oneshot(bad).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn qr_association_and_scan_redirect() {
    let (db, app) = test_app().await;
    let cookie = register_session(&app, "jo@example.com").await;

    let portal = create_portal(&app, &cookie, "P-0302").await;
    let portal_id = portal["id"].as_str().unwrap().to_string();

    let codes = QrCodeRepository::new(db.clone())
        .generate_batch(2)
        .await
        .unwrap();

    // Associate through the API.
    let mut request = json_request(
        "POST",
        &format!("/admin/portals/{portal_id}/qr-code"),
        json!({ "qr_code_uuid": codes[0] }),
    );
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "associated");

    // A scanned sticker redirects to the portal page.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/qr/{}", codes[0]))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        &format!("/portals/{portal_id}")
    );

    // A second association for the same portal conflicts.
    let mut conflict = json_request(
        "POST",
        &format!("/admin/portals/{portal_id}/qr-code"),
        json!({ "qr_code_uuid": codes[1] }),
    );
    conflict
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = app.clone().oneshot(conflict).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // An available-but-unassociated sticker does not resolve.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/qr/{}", codes[1]))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn intervention_recording_validates_the_date() {
    let (_db, app) = test_app().await;
    let cookie = register_session(&app, "jo@example.com").await;

    let portal = create_portal(&app, &cookie, "P-0303").await;
    let portal_id = portal["id"].as_str().unwrap().to_string();

    let mut bad = json_request(
        "POST",
        &format!("/admin/portals/{portal_id}/interventions"),
        json!({ "date": "14/03/2025", "controls": { "warning_lights": true } }),
    );
    bad.headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = app.clone().oneshot(bad).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut good = json_request(
        "POST",
        &format!("/admin/portals/{portal_id}/interventions"),
        json!({
            "date": "2025-03-14",
            "summary": "RAS",
            "controls": { "warning_lights": true, "apron_condition": false }
        }),
    );
    good.headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = app.clone().oneshot(good).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let intervention_id = body["id"].as_str().unwrap().to_string();

    // Reading it back shows exactly the two recorded controls.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/admin/interventions/{intervention_id}"))
                .header(header::COOKIE, cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["controls"].as_array().unwrap().len(), 2);
    assert_eq!(body["user_name"], "Jo Martin");
}

#[tokio::test]
async fn unknown_control_type_is_a_validation_error() {
    let (_db, app) = test_app().await;
    let cookie = register_session(&app, "jo@example.com").await;

    let portal = create_portal(&app, &cookie, "P-0304").await;
    let portal_id = portal["id"].as_str().unwrap().to_string();

    let mut request = json_request(
        "POST",
        &format!("/admin/portals/{portal_id}/interventions"),
        json!({ "date": "2025-03-14", "controls": { "coffee_machine": true } }),
    );
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], "VALIDATION_FAILED");
}
