//! Common test utilities for integration tests.
//!
//! Builds the router against the in-memory guest directory, so no database
//! is needed.

// Not every helper is used by every test binary.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use chrono::Utc;
use uuid::Uuid;

use domain::models::{Guest, GuestFields};
use domain::services::{InMemoryDirectory, RefreshTrigger};
use wedding_rsvp_api::app::{create_app, AppState};
use wedding_rsvp_api::config::{
    AdminConfig, Config, DatabaseConfig, DirectoryBackend, DirectoryConfig, LoggingConfig,
    RsvpConfig, SecurityConfig, ServerConfig,
};

pub const ADMIN_PASSWORD: &str = "test-admin-password";

/// Test configuration using the in-memory directory backend.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            max_body_size: 65_536,
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        directory: DirectoryConfig {
            backend: DirectoryBackend::Memory,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            cors_origins: vec![],
            search_rate_limit_per_minute: 1000,
            trust_forwarded_for: false,
        },
        rsvp: RsvpConfig {
            require_lodging: false,
            default_meal: "Wagyu & Lobster".to_string(),
            couple_names: "Zhang & Yang".to_string(),
            location: "Maui".to_string(),
        },
        admin: AdminConfig {
            password: ADMIN_PASSWORD.to_string(),
        },
    }
}

/// A stored guest as the directory would return it.
pub fn stored_guest(first: &str, last: &str, family_id: Option<&str>, email: Option<&str>) -> Guest {
    let fields = GuestFields {
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        family_id: Some(family_id.map(str::to_string)),
        email: Some(email.map(str::to_string)),
        ..Default::default()
    };
    Guest::from_fields(Uuid::new_v4(), &fields, Utc::now()).unwrap()
}

/// Tony and Pepper share a family; Bruce is invited alone.
pub struct Seed {
    pub tony: Guest,
    pub pepper: Guest,
    pub bruce: Guest,
}

impl Seed {
    pub fn new() -> Self {
        Self {
            tony: stored_guest("Tony", "Stark", Some("fam-stark"), Some("tony@stark.com")),
            pepper: stored_guest("Pepper", "Potts", Some("fam-stark"), None),
            bruce: stored_guest("Bruce", "Banner", None, Some("bruce@example.com")),
        }
    }

    pub fn guests(&self) -> Vec<Guest> {
        vec![self.tony.clone(), self.pepper.clone(), self.bruce.clone()]
    }
}

impl Default for Seed {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TestApp {
    pub router: Router,
    pub directory: InMemoryDirectory,
    pub state: AppState,
}

impl TestApp {
    /// Router over a fresh clone; `oneshot` consumes it.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Create a test application over `guests` with the live list loaded.
pub async fn create_test_app_with(config: Config, guests: Vec<Guest>) -> TestApp {
    let directory = InMemoryDirectory::with_guests(guests);
    let state = AppState::new(config, std::sync::Arc::new(directory.clone()));
    state
        .guest_list
        .refresh(RefreshTrigger::Startup)
        .await
        .expect("Failed to load guest list");

    TestApp {
        router: create_app(state.clone()),
        directory,
        state,
    }
}

pub async fn create_test_app(guests: Vec<Guest>) -> TestApp {
    create_test_app_with(test_config(), guests).await
}

/// Build a JSON request.
pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a JSON request carrying the admin password.
pub fn admin_json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Admin-Password", ADMIN_PASSWORD)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a bodyless admin request.
pub fn admin_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Admin-Password", ADMIN_PASSWORD)
        .body(Body::empty())
        .unwrap()
}

/// Build a GET request.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Parse response body as JSON.
pub async fn parse_response_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}
