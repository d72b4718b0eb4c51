use rocket::http::Status;
use rocket::serde::json::Json;

use crate::models::ApiResponse;
use crate::services::scanner::ScanError;

pub mod info;
pub mod scan;
pub mod wallet;

// Re-export all route functions for easy access
pub use info::*;
pub use scan::*;
pub use wallet::*;

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, (Status, Json<ApiResponse<T>>)>;

pub(crate) fn error_response<T>(status: Status, message: impl Into<String>) -> (Status, Json<ApiResponse<T>>) {
    (status, Json(ApiResponse::error(message)))
}

/// HTTP status for a scanning error
pub fn scan_error_status(error: &ScanError) -> Status {
    match error {
        ScanError::AlreadyRunning => Status::Conflict,
        ScanError::InvalidWorkerCount { .. } => Status::BadRequest,
        ScanError::Oracle(_) => Status::ServiceUnavailable,
        ScanError::Generation(_) | ScanError::ControllerClosed => Status::InternalServerError,
    }
}
