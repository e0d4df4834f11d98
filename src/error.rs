// error.rs
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::models::LightId;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("bridge transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed bridge response: {0}")]
    MalformedResponse(String),
    #[error("light {0} not found on bridge")]
    NotFound(LightId),
    #[error("bridge rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("upstream unavailable: {0}")]
    Upstream(#[from] BridgeError),
    #[error("light {0} not found")]
    NotFound(LightId),
    #[error("light {0} is not reachable")]
    NotReachable(LightId),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::Upstream(BridgeError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            AppError::NotReachable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[derive(Error, Debug)]
pub enum ShowError {
    #[error("unknown animation variant: {0}")]
    UnknownVariant(String),
    #[error("show plan has no lights")]
    EmptyPlan,
}
