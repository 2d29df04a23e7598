use thiserror::Error;

use crate::pool::PoolError;

/// Errors surfaced by the HTTP layer
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("Invalid request body: {0}")]
    BadRequest(String),
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convert AppError to HTTP status codes for web responses
impl AppError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Pool(PoolError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Pool(PoolError::Unconfigured(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Pool(PoolError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Pool(PoolError::Crypto(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "vanity pool request failed");
        }
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": status.as_u16()
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::from(PoolError::validation("bad")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(PoolError::Unconfigured("no key")).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::BadRequest("not json".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
