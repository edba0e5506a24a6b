//! Admin dashboard gate.
//!
//! Compares the `X-Admin-Password` header against the single configured
//! shared secret. There are no user accounts or roles behind it.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::crypto::secrets_match;

use crate::app::AppState;
use crate::error::ApiError;

/// Header carrying the admin shared secret.
pub const ADMIN_PASSWORD_HEADER: &str = "X-Admin-Password";

/// Middleware for admin-only routes.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let provided = req
        .headers()
        .get(ADMIN_PASSWORD_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !secrets_match(provided, &state.config.admin.password) {
        tracing::warn!(path = %req.uri().path(), "Rejected admin request");
        return ApiError::Unauthorized("Invalid or missing admin password".into()).into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_constant() {
        assert_eq!(ADMIN_PASSWORD_HEADER, "X-Admin-Password");
    }
}
