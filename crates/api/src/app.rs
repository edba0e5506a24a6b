use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::{DirectoryClient, GuestResolver, LiveGuestList, SubmissionService};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_admin, search_rate_limit,
    security_headers_middleware, trace_id, RateLimiterState,
};
use crate::routes::{admin, health, rsvp};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub directory: Arc<dyn DirectoryClient>,
    pub resolver: GuestResolver,
    pub guest_list: LiveGuestList,
    pub submissions: SubmissionService,
    pub rate_limiter: Arc<RateLimiterState>,
}

impl AppState {
    /// Wires the RSVP services around one directory backend.
    pub fn new(config: Config, directory: Arc<dyn DirectoryClient>) -> Self {
        let guest_list = LiveGuestList::new(directory.clone());
        let submissions = SubmissionService::new(directory.clone(), guest_list.clone());
        let rate_limiter = Arc::new(RateLimiterState::new(
            config.security.search_rate_limit_per_minute,
            config.security.trust_forwarded_for,
        ));

        Self {
            config: Arc::new(config),
            resolver: GuestResolver::new(directory.clone()),
            directory,
            guest_list,
            submissions,
            rate_limiter,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Invitation lookup is the only unauthenticated read of guest data
    let search_routes = Router::new()
        .route("/api/v1/rsvp/search", post(rsvp::search))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            search_rate_limit,
        ));

    let rsvp_routes = Router::new()
        .route("/api/v1/rsvp/submit", post(rsvp::submit))
        .route("/api/v1/rsvp/decline", post(rsvp::decline));

    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/guests",
            get(admin::list_guests).post(admin::create_guest),
        )
        .route("/api/v1/admin/guests/refresh", post(admin::refresh_guests))
        .route(
            "/api/v1/admin/guests/:guest_id",
            patch(admin::update_guest).delete(admin::delete_guest),
        )
        .route(
            "/api/v1/admin/guests/:guest_id/confirmation",
            get(admin::confirmation_email),
        )
        .route("/api/v1/admin/stats", get(admin::get_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(search_routes)
        .merge(rsvp_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
