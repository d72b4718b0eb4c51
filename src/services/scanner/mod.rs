//! Concurrent scanning engine
//!
//! - ScanWorker: independent task looping generate → look up → report → pace
//! - ScanController: owns the worker pool, consumes worker events, writes
//!   found wallets through to the store and keeps the aggregate stats
//!
//! Workers never share mutable state; everything they learn travels upward
//! over a single mpsc channel with the controller as its only consumer.

pub mod controller;
pub mod events;
pub mod worker;

pub use controller::ScanController;
pub use events::{Candidate, EventReceiver, EventSender, WorkerEvent, event_channel};
pub use worker::{ScanWorker, WorkerHandle, WorkerState, scan_candidate};

use std::fmt;

use crate::services::keygen::GenerationError;
use crate::services::oracle::OracleError;

/// Error type for scanning operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// start_scanning called while a scan is running
    AlreadyRunning,
    InvalidWorkerCount { requested: usize, max: usize },
    Generation(GenerationError),
    Oracle(OracleError),
    /// The event consumer is gone
    ControllerClosed,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "Scanning is already running"),
            Self::InvalidWorkerCount { requested, max } => {
                write!(f, "Worker count must be between 1 and {max}, got {requested}")
            }
            Self::Generation(e) => write!(f, "{e}"),
            Self::Oracle(e) => write!(f, "{e}"),
            Self::ControllerClosed => write!(f, "Scan controller is shut down"),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Generation(e) => Some(e),
            Self::Oracle(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GenerationError> for ScanError {
    fn from(e: GenerationError) -> Self {
        Self::Generation(e)
    }
}

impl From<OracleError> for ScanError {
    fn from(e: OracleError) -> Self {
        Self::Oracle(e)
    }
}
