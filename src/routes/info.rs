use chrono::Utc;
use rocket::serde::json::Json;
use rocket::{State, get};
use tracing;

use crate::models::{ApiResponse, AppState, StatusResponse};

#[get("/")]
pub async fn index(state: &State<AppState>) -> Json<ApiResponse<StatusResponse>> {
    tracing::info!("Received request: GET /");

    let found_wallets = state.controller.get_found_wallets().await.count;
    let is_scanning = state.controller.is_running().await;
    let message = format!(
        "Wallet scanner online, {found_wallets} found wallet(s), scanning: {is_scanning}"
    );

    Json(ApiResponse::ok(
        StatusResponse {
            status: "online".to_string(),
            timestamp: Utc::now(),
            found_wallets,
            is_scanning,
        },
        message,
    ))
}
