//! Integration tests for the admin dashboard endpoints.
//!
//! Tests the shared-password gate, guest list management, statistics and
//! confirmation emails.

mod common;

use axum::http::{Method, StatusCode};
use common::{
    admin_json_request, admin_request, create_test_app, get_request, parse_response_body, Seed,
};
use domain::models::RsvpStatus;
use serde_json::json;
use tower::ServiceExt;

// ============================================================================
// Auth Tests
// ============================================================================

#[tokio::test]
async fn test_admin_without_password() {
    let test_app = create_test_app(Seed::new().guests()).await;

    let response = test_app
        .app()
        .oneshot(get_request("/api/v1/admin/guests"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_with_wrong_password() {
    let test_app = create_test_app(Seed::new().guests()).await;

    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri("/api/v1/admin/stats")
        .header("X-Admin-Password", "wrong")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = test_app.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["message"], "Invalid or missing admin password");
}

// ============================================================================
// Guest List Tests
// ============================================================================

#[tokio::test]
async fn test_list_guests() {
    let test_app = create_test_app(Seed::new().guests()).await;

    let response = test_app
        .app()
        .oneshot(admin_request(Method::GET, "/api/v1/admin/guests"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["guests"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_list_guests_with_search() {
    let test_app = create_test_app(Seed::new().guests()).await;

    let response = test_app
        .app()
        .oneshot(admin_request(Method::GET, "/api/v1/admin/guests?search=POT"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["guests"][0]["first_name"], "Pepper");
}

#[tokio::test]
async fn test_create_guest() {
    let test_app = create_test_app(Seed::new().guests()).await;

    let request = admin_json_request(
        Method::POST,
        "/api/v1/admin/guests",
        json!({
            "first_name": "Natasha",
            "last_name": "Romanoff",
            "family_id": "fam-romanoff",
            "email": "",
            "accommodation": ""
        }),
    );
    let response = test_app.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = parse_response_body(response).await;
    assert_eq!(body["first_name"], "Natasha");
    assert_eq!(body["rsvp_status"], "Pending");
    assert!(body["email"].is_null());
    assert!(body["accommodation"].is_null());

    let response = test_app
        .app()
        .oneshot(admin_request(Method::GET, "/api/v1/admin/guests"))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body["total"], 4);
}

#[tokio::test]
async fn test_create_guest_requires_names() {
    let test_app = create_test_app(Seed::new().guests()).await;

    let request = admin_json_request(
        Method::POST,
        "/api/v1/admin/guests",
        json!({ "first_name": "Natasha", "last_name": " " }),
    );
    let response = test_app.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_guest_can_reset_to_pending() {
    let seed = Seed::new();
    let test_app = create_test_app(seed.guests()).await;

    let uri = format!("/api/v1/admin/guests/{}", seed.bruce.id);
    let request = admin_json_request(Method::PATCH, &uri, json!({ "rsvp_status": "Declined" }));
    let response = test_app.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = admin_json_request(
        Method::PATCH,
        &uri,
        json!({ "rsvp_status": "Pending", "note": "Called to confirm" }),
    );
    let response = test_app.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["rsvp_status"], "Pending");
    assert_eq!(body["note"], "Called to confirm");

    let local = test_app.state.guest_list.get(seed.bruce.id).await.unwrap();
    assert_eq!(local.rsvp_status, RsvpStatus::Pending);
}

#[tokio::test]
async fn test_update_guest_empty_body_rejected() {
    let seed = Seed::new();
    let test_app = create_test_app(seed.guests()).await;

    let uri = format!("/api/v1/admin/guests/{}", seed.bruce.id);
    let response = test_app
        .app()
        .oneshot(admin_json_request(Method::PATCH, &uri, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_unknown_guest() {
    let test_app = create_test_app(Seed::new().guests()).await;

    let uri = format!("/api/v1/admin/guests/{}", uuid::Uuid::new_v4());
    let request = admin_json_request(Method::PATCH, &uri, json!({ "meal_choice": "Fish" }));
    let response = test_app.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_guest() {
    let seed = Seed::new();
    let test_app = create_test_app(seed.guests()).await;

    let uri = format!("/api/v1/admin/guests/{}", seed.pepper.id);
    let response = test_app
        .app()
        .oneshot(admin_request(Method::DELETE, &uri))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(test_app.directory.snapshot().await.len(), 2);
    assert!(test_app.state.guest_list.get(seed.pepper.id).await.is_none());

    let response = test_app
        .app()
        .oneshot(admin_request(Method::DELETE, &uri))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Stats, Confirmation and Refresh Tests
// ============================================================================

#[tokio::test]
async fn test_stats() {
    let seed = Seed::new();
    let test_app = create_test_app(seed.guests()).await;

    let uri = format!("/api/v1/admin/guests/{}", seed.tony.id);
    let request = admin_json_request(
        Method::PATCH,
        &uri,
        json!({ "rsvp_status": "Attending", "accommodation": "andaz", "plus_one": true }),
    );
    let response = test_app.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = test_app
        .app()
        .oneshot(admin_request(Method::GET, "/api/v1/admin/stats"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["attending"], 1);
    assert_eq!(body["pending"], 2);
    assert_eq!(body["andaz"], 1);
    assert_eq!(body["accommodation_unset"], 2);
    assert_eq!(body["plus_ones"], 1);
}

#[tokio::test]
async fn test_confirmation_email() {
    let seed = Seed::new();
    let test_app = create_test_app(seed.guests()).await;

    let uri = format!("/api/v1/admin/guests/{}/confirmation", seed.tony.id);
    let response = test_app
        .app()
        .oneshot(admin_request(Method::GET, &uri))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["subject"], "Wedding RSVP Confirmation - Zhang & Yang");
    let text = body["body"].as_str().unwrap();
    assert!(text.starts_with("Dear Tony,"));
    assert!(text.contains("Email: tony@stark.com"));
    assert!(text.contains("Status: Pending"));
}

#[tokio::test]
async fn test_confirmation_email_unknown_guest() {
    let test_app = create_test_app(Seed::new().guests()).await;

    let uri = format!("/api/v1/admin/guests/{}/confirmation", uuid::Uuid::new_v4());
    let response = test_app
        .app()
        .oneshot(admin_request(Method::GET, &uri))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_refresh() {
    let test_app = create_test_app(Seed::new().guests()).await;

    let response = test_app
        .app()
        .oneshot(admin_request(Method::POST, "/api/v1/admin/guests/refresh"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["guest_count"], 3);
    assert_eq!(body["live"], false);
}

#[tokio::test]
async fn test_manual_refresh_directory_down() {
    let test_app = create_test_app(Seed::new().guests()).await;
    test_app.directory.set_unavailable(true);

    let response = test_app
        .app()
        .oneshot(admin_request(Method::POST, "/api/v1/admin/guests/refresh"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // The previous snapshot is still served
    let response = test_app
        .app()
        .oneshot(admin_request(Method::GET, "/api/v1/admin/guests"))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body["total"], 3);
}
