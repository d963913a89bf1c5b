use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::models::ErrorResponse;
use crate::predictor::PredictError;
use crate::registry::RegistryError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("prediction failed: {0}")]
    Prediction(#[from] PredictError),

    #[error("unable to load model version - {0}")]
    Registry(#[from] RegistryError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Prediction(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Registry(e) => match e {
                RegistryError::InvalidModelName(_) | RegistryError::InvalidVersion(_) => {
                    StatusCode::BAD_REQUEST
                }
                RegistryError::VersionNotFound { .. } => StatusCode::NOT_FOUND,
                RegistryError::IncompatibleArtifact { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                RegistryError::Unreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.to_string()))
    }
}
