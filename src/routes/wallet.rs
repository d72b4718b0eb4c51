use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use tracing;

use super::{ApiResult, error_response, scan_error_status};
use crate::models::{
    AnalyzeKeyRequest, ApiResponse, AppState, FoundWallet, FoundWalletsSnapshot,
    ValidateAddressResponse, WalletRecord,
};
use crate::services::keygen::{self, Keypair};

/// Generates a random wallet without checking or persisting it. The balance is always zero.
#[post("/wallet/generate")]
pub fn generate_wallet(state: &State<AppState>) -> ApiResult<FoundWallet> {
    tracing::info!("Received request: POST /wallet/generate");

    match state.controller.generate_one() {
        Ok(record) => Ok(Json(ApiResponse::ok(record, "Wallet generated"))),
        Err(e) => {
            tracing::error!("Error generating wallet: {}", e);
            Err(error_response(scan_error_status(&e), e.to_string()))
        }
    }
}

#[get("/wallet/validate/<address>")]
pub fn validate_address(
    state: &State<AppState>,
    address: &str,
) -> Json<ApiResponse<ValidateAddressResponse>> {
    tracing::info!("Received request: GET /wallet/validate/{}", address);

    let is_valid = state.controller.validate_address(address);
    let format = keygen::describe_address(address).to_string();
    Json(ApiResponse::ok(
        ValidateAddressResponse {
            address: address.to_string(),
            is_valid,
            format: format.clone(),
        },
        format,
    ))
}

#[get("/wallet/found")]
pub async fn found_wallets(state: &State<AppState>) -> Json<ApiResponse<FoundWalletsSnapshot>> {
    tracing::info!("Received request: GET /wallet/found");

    let snapshot = state.controller.get_found_wallets().await;
    let message = format!(
        "{} found wallet(s) holding {} sat",
        snapshot.count, snapshot.total_balance
    );
    Json(ApiResponse::ok(snapshot, message))
}

/// Derives public key, WIF and all address variants for a supplied private key.
#[post("/wallet/analyze", format = "json", data = "<request>")]
pub fn analyze_key(request: Json<AnalyzeKeyRequest>) -> ApiResult<WalletRecord> {
    tracing::info!("Received request: POST /wallet/analyze");

    let keypair = Keypair::from_hex(&request.private_key).map_err(|e| {
        tracing::warn!("Rejected private key for analysis: {}", e);
        error_response(
            Status::BadRequest,
            format!("{e}. Must be 64 hexadecimal characters."),
        )
    })?;

    let addresses = keygen::derive_addresses(keypair.public_key());
    Ok(Json(ApiResponse::ok(
        keypair.to_record(addresses),
        "Private key analyzed",
    )))
}
