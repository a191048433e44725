use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub is_operational: bool,
}

impl AppError {
    pub fn bad_request(code: &str, message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: code.to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND".to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn session_not_found(session_id: i64) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "SESSION_NOT_FOUND".to_string(),
            message: format!("Session {session_id} not found"),
            is_operational: true,
        }
    }

    pub fn no_current_question() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "NO_CURRENT_QUESTION".to_string(),
            message: "No question is currently being served".to_string(),
            is_operational: true,
        }
    }

    pub fn conflict(code: &str, message: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            code: code.to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn too_many_requests(message: &str) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            code: "RATE_LIMITED".to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn backend_unavailable(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            code: "BACKEND_UNAVAILABLE".to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.to_string(),
            is_operational: false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let exposed_message = if self.is_operational {
            self.message.clone()
        } else {
            "Internal server error".to_string()
        };

        if self.is_operational {
            tracing::warn!(status = %self.status, code = %self.code, error = %self.message, "API error");
        } else {
            tracing::error!(status = %self.status, code = %self.code, error = %self.message, "Internal API error");
        }

        (
            self.status,
            Json(ErrorBody {
                code: self.code,
                message: exposed_message,
            }),
        )
            .into_response()
    }
}

// StorageFailure is never recovered by handlers; surface as 500 with the
// message redacted. BackendUnavailable passes through as 502.
impl From<crate::store::StoreError> for AppError {
    fn from(value: crate::store::StoreError) -> Self {
        match &value {
            crate::store::StoreError::NotFound { .. } => AppError::not_found(&value.to_string()),
            _ => AppError::internal(&value.to_string()),
        }
    }
}

impl From<crate::providers::BackendError> for AppError {
    fn from(value: crate::providers::BackendError) -> Self {
        AppError::backend_unavailable(&value.to_string())
    }
}

impl From<crate::session::SessionError> for AppError {
    fn from(value: crate::session::SessionError) -> Self {
        use crate::session::SessionError;
        match value {
            SessionError::NotFound(id) => AppError::session_not_found(id),
            SessionError::NoCurrentQuestion => AppError::no_current_question(),
            SessionError::InvalidChoice(_) => {
                AppError::bad_request("INVALID_CHOICE", &value.to_string())
            }
            SessionError::NoMaterial => AppError::conflict("NO_QUESTIONS", &value.to_string()),
            SessionError::Storage(e) => e.into(),
        }
    }
}
