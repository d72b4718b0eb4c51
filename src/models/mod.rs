pub mod app_state;
pub mod config;
pub mod requests;
pub mod responses;
pub mod wallet;

pub use app_state::AppState;
pub use config::{ScannerConfig, WorkerSettings};
pub use requests::{AnalyzeKeyRequest, StartScanRequest};
pub use responses::{ApiResponse, StatusResponse, ValidateAddressResponse};
pub use wallet::{
    AddressSet, AddressVariant, FoundWallet, FoundWalletsSnapshot, ScanResult, ScanStats,
    WalletRecord,
};
