//! Error handling module

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::wg;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Address pool exhausted")]
    PoolExhausted,

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<wg::Error> for AppError {
    fn from(e: wg::Error) -> Self {
        match e {
            wg::Error::AddressSpaceExhausted => AppError::PoolExhausted,
            e @ (wg::Error::InvalidKeyEncoding(_) | wg::Error::InvalidAddress(_)) => {
                AppError::BadRequest(e.to_string())
            }
            e => AppError::InternalError(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PoolExhausted => (StatusCode::CONFLICT, self.to_string()),
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
