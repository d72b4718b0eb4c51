use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartScanRequest {
    pub worker_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeKeyRequest {
    /// 64 hex characters
    pub private_key: String,
}
