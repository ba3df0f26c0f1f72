use actix_web::HttpResponse;

use crate::fixtures::FixtureError;
use crate::models::common::ApiResponse;

pub mod match_handler;
pub mod selection_handler;

/// Turn a service failure into the API error envelope
pub fn error_response(e: &FixtureError) -> HttpResponse {
    match e {
        FixtureError::Conflict(_)
        | FixtureError::InvalidReference(_)
        | FixtureError::InvalidInput(_) => {
            tracing::warn!("Rejected request: {}", e);
            HttpResponse::UnprocessableEntity().json(ApiResponse::<()>::error(e.to_string()))
        }
        FixtureError::MatchNotFound(_) | FixtureError::PlayerNotFound(_) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error(e.to_string()))
        }
        FixtureError::NotSelected { .. } => {
            HttpResponse::Conflict().json(ApiResponse::<()>::error(e.to_string()))
        }
        FixtureError::Storage(storage_error) => {
            tracing::error!("Storage failure: {}", storage_error);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Internal server error"))
        }
    }
}
