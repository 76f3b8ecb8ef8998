//! API error taxonomy.
//!
//! Every failure crossing the request boundary is one of these variants and
//! renders as `{"success": false, "message": ...}` with the matching status
//! code. Domain messages ("Insufficient stock for ...", "Cannot delete
//! category. ...") are part of the client contract and pass through verbatim.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::{
    CancelOrderError, InsertUserError, PlaceOrderError, StatusUpdateError, StoreError,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PlaceOrderError> for ApiError {
    fn from(err: PlaceOrderError) -> Self {
        match err {
            PlaceOrderError::ProductNotFound(_) => Self::NotFound(err.to_string()),
            PlaceOrderError::InsufficientStock(_) => Self::Validation(err.to_string()),
            PlaceOrderError::Store(e) => Self::Store(e),
        }
    }
}

impl From<StatusUpdateError> for ApiError {
    fn from(err: StatusUpdateError) -> Self {
        match err {
            StatusUpdateError::OrderNotFound => Self::NotFound(err.to_string()),
            StatusUpdateError::InvalidTransition { .. } => Self::Validation(err.to_string()),
            StatusUpdateError::Store(e) => Self::Store(e),
        }
    }
}

impl From<CancelOrderError> for ApiError {
    fn from(err: CancelOrderError) -> Self {
        match err {
            CancelOrderError::OrderNotFound => Self::NotFound(err.to_string()),
            CancelOrderError::AlreadyDelivered | CancelOrderError::AlreadyCancelled => {
                Self::Validation(err.to_string())
            }
            CancelOrderError::Store(e) => Self::Store(e),
        }
    }
}

impl From<InsertUserError> for ApiError {
    fn from(err: InsertUserError) -> Self {
        match err {
            InsertUserError::DuplicateEmail => Self::Validation(err.to_string()),
            InsertUserError::Store(e) => Self::Store(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            json!({
                "success": false,
                "message": "Server Error",
                "error": self.to_string(),
            })
        } else {
            tracing::debug!(error = %self, status = %status, "request rejected");
            json!({
                "success": false,
                "message": self.to_string(),
            })
        };
        (status, Json(body)).into_response()
    }
}
