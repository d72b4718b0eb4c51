use rocket::serde::json::Json;
use rocket::{State, get, post};
use tracing;

use super::{ApiResult, error_response, scan_error_status};
use crate::guards::ApiToken;
use crate::models::{ApiResponse, AppState, ScanResult, ScanStats, StartScanRequest};

/// Starts the scan worker pool.
///
/// Returns the id of the new scan run. 409 if a scan is already running,
/// 400 if the worker count is out of range.
#[post("/scan/start", format = "json", data = "<request>")]
pub async fn start_scan(
    state: &State<AppState>,
    request: Json<StartScanRequest>,
    _token: ApiToken,
) -> ApiResult<String> {
    tracing::info!(
        "Received request: POST /scan/start ({} workers)",
        request.worker_count
    );

    match state.controller.start_scanning(request.worker_count).await {
        Ok(run_id) => Ok(Json(ApiResponse::ok(
            run_id.to_string(),
            format!("Started scanning with {} worker(s)", request.worker_count),
        ))),
        Err(e) => {
            tracing::warn!("Failed to start scanning: {}", e);
            Err(error_response(scan_error_status(&e), e.to_string()))
        }
    }
}

/// Stops the scan worker pool. Idempotent.
#[post("/scan/stop")]
pub async fn stop_scan(state: &State<AppState>, _token: ApiToken) -> Json<ApiResponse<ScanStats>> {
    tracing::info!("Received request: POST /scan/stop");

    state.controller.stop_scanning().await;
    let stats = state.controller.get_stats().await;
    let message = format!("Scanning stopped after {} attempts", stats.total_attempts);
    Json(ApiResponse::ok(stats, message))
}

#[get("/scan/stats")]
pub async fn scan_stats(state: &State<AppState>) -> Json<ApiResponse<ScanStats>> {
    tracing::debug!("Received request: GET /scan/stats");

    let stats = state.controller.get_stats().await;
    Json(ApiResponse::ok(stats, "Scan statistics"))
}

/// Generates and checks a single wallet outside the worker pool.
#[post("/scan/once")]
pub async fn scan_once(state: &State<AppState>, _token: ApiToken) -> ApiResult<ScanResult> {
    tracing::info!("Received request: POST /scan/once");

    match state.controller.scan_once().await {
        Ok(result) => {
            let message = if result.has_balance {
                format!("Found balance of {} sat at {}", result.balance, result.address)
            } else {
                format!("No balance at {}", result.address)
            };
            Ok(Json(ApiResponse::ok(result, message)))
        }
        Err(e) => {
            tracing::error!("Error in scan_once: {}", e);
            Err(error_response(
                scan_error_status(&e),
                format!("Failed to scan wallet: {e}"),
            ))
        }
    }
}
