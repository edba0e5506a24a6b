use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::{DirectoryError, RsvpError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Ambiguous match: {0}")]
    AmbiguousMatch(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Rate limited, retry after {retry_after}s")]
    RateLimited {
        limit_per_minute: u32,
        retry_after: u64,
    },

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::AmbiguousMatch(msg) => {
                (StatusCode::CONFLICT, "ambiguous_match", msg.clone())
            }
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable",
                msg.clone(),
            ),
            ApiError::RateLimited {
                limit_per_minute, ..
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                format!(
                    "Rate limit of {} searches/minute exceeded. Please try again later.",
                    limit_per_minute
                ),
            ),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg.clone()),
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg.clone(),
            ),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { retry_after, .. } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
        response
    }
}

impl From<RsvpError> for ApiError {
    fn from(err: RsvpError) -> Self {
        let message = err.to_string();
        if err.is_retryable() {
            tracing::warn!(error = %err, "RSVP request failed, client may retry");
        } else if err.is_validation() {
            tracing::debug!(error = %err, "RSVP form rejected");
        }

        match err {
            RsvpError::NotFound => ApiError::NotFound(message),
            RsvpError::AmbiguousMatch(_) => ApiError::AmbiguousMatch(message),
            RsvpError::SubmissionInProgress => ApiError::Conflict(message),
            RsvpError::DirectoryUnavailable(_) | RsvpError::SubscriptionLost(_) => {
                ApiError::ServiceUnavailable(
                    "The guest list is temporarily unavailable. Please try again.".into(),
                )
            }
            RsvpError::IncompleteGuestData { .. }
            | RsvpError::MissingLodgingSelection
            | RsvpError::UnknownMember(_) => ApiError::Validation(message),
            RsvpError::CapacityExceeded | RsvpError::MinimumGuestsViolation => {
                ApiError::Unprocessable(message)
            }
            RsvpError::PersistenceFailure { .. } => ApiError::BadGateway(message),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(id) => ApiError::NotFound(format!("Guest {} not found", id)),
            DirectoryError::Rejected(msg) => ApiError::Validation(msg),
            DirectoryError::Unavailable(msg) => ApiError::ServiceUnavailable(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {}", field))
                })
            })
            .collect();

        let message = if messages.len() == 1 {
            messages[0].clone()
        } else {
            format!("{} validation errors", messages.len())
        };

        ApiError::Validation(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::MemberId;
    use uuid::Uuid;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_api_error_statuses() {
        assert_eq!(
            ApiError::Unauthorized("x".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::BadGateway("x".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            limit_per_minute: 30,
            retry_after: 60,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "60");
    }

    #[test]
    fn test_rsvp_error_mapping() {
        assert_eq!(status_of(RsvpError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(RsvpError::AmbiguousMatch("John Smith".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(RsvpError::SubmissionInProgress),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(RsvpError::DirectoryUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(RsvpError::IncompleteGuestData {
                member: MemberId::PlusOne(Uuid::new_v4())
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RsvpError::CapacityExceeded),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_not_found_message() {
        match ApiError::from(RsvpError::NotFound) {
            ApiError::NotFound(msg) => assert_eq!(msg, "We could not find your invitation"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_directory_error_mapping() {
        let id = Uuid::new_v4();
        assert_eq!(status_of(DirectoryError::NotFound(id)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(DirectoryError::Unavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
