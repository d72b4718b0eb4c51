use rocket::{Build, Rocket};
use std::sync::Arc;

pub mod fairings;
pub mod guards;
pub mod models;
pub mod routes;
pub mod services;

use crate::models::{AppState, ScannerConfig};
use crate::services::keygen::RandomKeyGenerator;
use crate::services::oracle::{BalanceOracle, BlockCypherSource, EsploraSource, build_http_client};
use crate::services::scanner::ScanController;
use crate::services::store::FoundWalletStore;

/// Build the scanner services described by `config`
pub async fn build_app_state(config: &ScannerConfig) -> Result<AppState, String> {
    let client = build_http_client(config.oracle_timeout)?;
    let oracle = BalanceOracle::new(
        Arc::new(EsploraSource::new(client.clone(), &config.primary_oracle_url)),
        Arc::new(BlockCypherSource::new(client, &config.fallback_oracle_url)),
        config.oracle_timeout,
    );

    let store = FoundWalletStore::open(&config.found_wallets_path).await;

    let controller = ScanController::new(
        Arc::new(RandomKeyGenerator::new()),
        Arc::new(oracle),
        Arc::new(store),
        config.worker.clone(),
        config.max_workers,
    )
    .await;

    Ok(AppState {
        controller: Arc::new(controller),
        access_token: config.access_token.clone(),
    })
}

/// Mount the API on an already-built state
pub fn rocket_with_state(app_state: AppState) -> Rocket<Build> {
    rocket::build()
        .manage(app_state)
        .attach(fairings::RequestLogger)
        .attach(fairings::ScanShutdown)
        .mount(
            "/",
            rocket::routes![
                routes::index,
                routes::start_scan,
                routes::stop_scan,
                routes::scan_stats,
                routes::scan_once,
                routes::generate_wallet,
                routes::validate_address,
                routes::found_wallets,
                routes::analyze_key,
            ],
        )
}

pub async fn create_rocket() -> Rocket<Build> {
    // Load and cache environment variables
    dotenvy::dotenv().ok();

    let config = ScannerConfig::from_env().unwrap_or_else(|e| panic!("{e}"));

    tracing::info!("Scanner configured:");
    tracing::info!("  - Primary oracle: {}", config.primary_oracle_url);
    tracing::info!("  - Fallback oracle: {}", config.fallback_oracle_url);
    tracing::info!("  - Oracle timeout: {:?}", config.oracle_timeout);
    tracing::info!("  - Max workers: {}", config.max_workers);
    tracing::info!("  - Found wallets file: {}", config.found_wallets_path.display());

    let app_state = build_app_state(&config)
        .await
        .unwrap_or_else(|e| panic!("Failed to build scanner: {e}"));

    let found = app_state.controller.get_found_wallets().await;
    tracing::info!(
        "Loaded {} found wallet(s) holding {} sat",
        found.count,
        found.total_balance
    );

    rocket_with_state(app_state)
}
