use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing input file: {0}")]
    MissingInput(String),
    #[error("no plan has been computed yet")]
    NoPlan,
    #[error("no schedule for day '{0}'")]
    UnknownDay(String),
    #[error("shared state was poisoned by a panicked request")]
    StatePoisoned,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Json(_) | AppError::Csv(_) | AppError::MissingInput(_) => StatusCode::BAD_REQUEST,
            AppError::NoPlan | AppError::UnknownDay(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Telemetry(_) | AppError::Io(_) | AppError::StatePoisoned => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "success": false, "error": self.to_string() }))
    }
}
