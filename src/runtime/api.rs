//! HTTP surface: health, the active-schedule query and the websocket upgrade.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::core::identity::{Role, SessionIdentity};
use crate::core::occupancy::ActiveSchedule;
use crate::core::{BookingError, BookingService};
use crate::runtime::auth::{bearer_token, AuthError, JwtVerifier};
use crate::runtime::socket::ws_handler;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Booking core.
    pub service: BookingService,
    /// Token verifier.
    pub verifier: Arc<JwtVerifier>,
}

impl AppState {
    /// Bundle a service with a verifier.
    pub fn new(service: BookingService, verifier: JwtVerifier) -> Self {
        Self {
            service,
            verifier: Arc::new(verifier),
        }
    }

    /// Authenticate a token or fail with 401.
    pub fn authenticate(&self, token: Option<&str>) -> Result<SessionIdentity, ApiError> {
        let token = token.ok_or(AuthError::MissingToken)?;
        Ok(self.verifier.verify(token)?)
    }
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Always `false`.
    pub ok: bool,
    /// Stable machine-readable code.
    pub code: String,
    /// Client-safe message.
    pub message: String,
}

/// HTTP error with a status and stable code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// 400 for a malformed request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 403 for an authenticated caller lacking the required role.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// HTTP status.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code.
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiErrorBody {
                ok: false,
                code: self.code.to_string(),
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", value.to_string())
    }
}

impl From<BookingError> for ApiError {
    fn from(value: BookingError) -> Self {
        let status = match &value {
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::UnclassifiedGender => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::Backend(detail) => {
                tracing::error!(error = %detail, "backend failure while serving request");
                return Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    value.code(),
                    "internal error",
                );
            }
        };
        Self::new(status, value.code(), value.to_string())
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Connected websocket sessions.
    pub sessions: usize,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        ok: true,
        sessions: state.service.hub().session_count(),
    })
}

async fn active_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ActiveSchedule>, ApiError> {
    let identity = state.authenticate(bearer_token(&headers))?;
    if !identity.has_role(Role::Client) {
        return Err(ApiError::forbidden("only clients can view the booking schedule"));
    }
    let schedule = state.service.active_schedule(&identity).await?;
    Ok(Json(schedule))
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/schedule/active", get(active_schedule))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConflictKind;

    #[test]
    fn booking_errors_map_to_statuses() {
        let cases = [
            (BookingError::validation("x"), StatusCode::BAD_REQUEST),
            (BookingError::not_found("x"), StatusCode::NOT_FOUND),
            (ConflictKind::AlreadyReserved.into(), StatusCode::CONFLICT),
            (BookingError::UnclassifiedGender, StatusCode::UNPROCESSABLE_ENTITY),
            (BookingError::backend("db down"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn auth_errors_are_unauthorized() {
        let err = ApiError::from(AuthError::MissingToken);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "UNAUTHORIZED");
    }
}
