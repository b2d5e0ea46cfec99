use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        match &self {
            AppError::NotFound | AppError::InvalidInput(_) | AppError::RateLimited => {
                tracing::debug!(error = %self, "Request rejected")
            }
            _ => tracing::error!(error = %self, "Request failed"),
        }

        let code = self.code();
        match self {
            AppError::Database(_) | AppError::Internal(_) => {
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, code, None)
            }
            AppError::Cache(_) => error_resp(StatusCode::SERVICE_UNAVAILABLE, code, None),
            AppError::Sync(_) => error_resp(StatusCode::BAD_GATEWAY, code, None),
            AppError::RateLimited => error_resp(StatusCode::TOO_MANY_REQUESTS, code, None),
            AppError::InvalidInput(msg) => error_resp(StatusCode::BAD_REQUEST, code, Some(msg)),
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, code, None),
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
