use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::scheduling::SchedulingError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str, String),
    Forbidden(&'static str, String),
    BadRequest(&'static str, String),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    Internal(String),
}

impl ApiError {
    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized("INVALID_CREDENTIALS", "Email or password is incorrect".into())
    }

    pub fn session_expired() -> Self {
        ApiError::Unauthorized("SESSION_EXPIRED", "Session expired".into())
    }

    pub fn appointment_not_found() -> Self {
        ApiError::NotFound("NOT_FOUND", "appointment not found".into())
    }

    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
            },
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(code, msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Forbidden(code, msg) => {
                (StatusCode::FORBIDDEN, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::NotFound(code, msg) => {
                (StatusCode::NOT_FOUND, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Conflict(code, msg) => {
                (StatusCode::CONFLICT, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::to_error_response("INTERNAL", &msg),
            )
                .into_response(),
        }
    }
}

/// Domain errors carry their own codes. An illegal lifecycle transition is a
/// conflict with the record's current state (409); the rest are bad requests.
impl From<SchedulingError> for ApiError {
    fn from(err: SchedulingError) -> Self {
        let message = err.to_string();
        match err {
            SchedulingError::InvalidDate(_) => ApiError::BadRequest("INVALID_DATE", message),
            SchedulingError::InvalidTime(_) => ApiError::BadRequest("INVALID_TIME", message),
            SchedulingError::InvalidStatus(_) => ApiError::BadRequest("INVALID_STATUS", message),
            SchedulingError::IllegalTransition { .. } => {
                ApiError::Conflict("ILLEGAL_TRANSITION", message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::status::AppointmentStatus;

    #[test]
    fn test_scheduling_error_codes() {
        let api: ApiError = SchedulingError::InvalidDate("junk".into()).into();
        assert!(matches!(api, ApiError::BadRequest("INVALID_DATE", _)));

        let api: ApiError = SchedulingError::InvalidTime("10:15".into()).into();
        assert!(matches!(api, ApiError::BadRequest("INVALID_TIME", _)));

        let api: ApiError = SchedulingError::InvalidStatus("archived".into()).into();
        assert!(matches!(api, ApiError::BadRequest("INVALID_STATUS", _)));

        let api: ApiError = SchedulingError::IllegalTransition {
            from: AppointmentStatus::Cancelled,
            to: AppointmentStatus::Completed,
        }
        .into();
        assert!(matches!(api, ApiError::Conflict("ILLEGAL_TRANSITION", _)));
    }
}
