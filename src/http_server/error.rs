use axum::{
    Json,
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
};
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response<Body> {
        let status = self.status();
        let message = self.to_string();
        let body = match self {
            AppError::Internal(report) => {
                log::error!("{report:?}");
                ErrorBody {
                    error: "Something went wrong".to_string(),
                    field: None,
                }
            }
            AppError::Validation { field, .. } => ErrorBody {
                error: message,
                field: Some(field),
            },
            _ => ErrorBody {
                error: message,
                field: None,
            },
        };

        (status, Json(body)).into_response()
    }
}
