use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::ScanError;
use super::events::{Candidate, EventSender, WorkerEvent};
use crate::models::{ScanResult, WorkerSettings};
use crate::services::keygen::{GenerationError, KeyGenerator};
use crate::services::oracle::BalanceOracle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    /// Stop observed, finishing the current iteration
    Stopping,
    Stopped,
}

/// Generate one candidate and look up the balance of its primary address
pub async fn scan_candidate(
    generator: &dyn KeyGenerator,
    oracle: &BalanceOracle,
) -> Result<Candidate, ScanError> {
    let keypair = generator.generate()?;
    let addresses = generator.derive_addresses(keypair.public_key());
    let address = addresses
        .primary()
        .ok_or(GenerationError::MissingPrimaryAddress)?
        .to_string();

    let balance = oracle.check_balance(&address).await?;

    Ok(Candidate {
        keypair,
        addresses,
        result: ScanResult::new(address, balance),
    })
}

/// Handle to a spawned worker
pub struct WorkerHandle {
    pub id: usize,
    state: watch::Receiver<WorkerState>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Receiver that keeps observing the state after the handle is joined
    pub fn state_receiver(&self) -> watch::Receiver<WorkerState> {
        self.state.clone()
    }

    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        self.task.await
    }
}

/// Independent scan loop; reports only through its event sender
pub struct ScanWorker {
    id: usize,
    generator: Arc<dyn KeyGenerator>,
    oracle: Arc<BalanceOracle>,
    settings: WorkerSettings,
    events: EventSender,
    state: watch::Sender<WorkerState>,
}

impl ScanWorker {
    pub fn new(
        id: usize,
        generator: Arc<dyn KeyGenerator>,
        oracle: Arc<BalanceOracle>,
        settings: WorkerSettings,
        events: EventSender,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Idle);
        Self {
            id,
            generator,
            oracle,
            settings,
            events,
            state,
        }
    }

    /// Spawn the loop; it runs until `stop` becomes true or its sender is dropped
    pub fn spawn(self, stop: watch::Receiver<bool>) -> WorkerHandle {
        let id = self.id;
        let state = self.state.subscribe();
        let task = tokio::spawn(self.run(stop));
        WorkerHandle { id, state, task }
    }

    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        self.state.send_replace(WorkerState::Running);
        tracing::info!("Scan worker {} started", self.id);

        let worker_id = Some(self.id);
        let mut attempts: u64 = 0;
        let mut unreported: u64 = 0;

        while !*stop.borrow() {
            let delay = match scan_candidate(self.generator.as_ref(), &self.oracle).await {
                Ok(candidate) => {
                    attempts += 1;
                    unreported += 1;

                    if candidate.result.has_balance {
                        tracing::info!(
                            "Worker {} found {} with {} sat",
                            self.id,
                            candidate.result.address,
                            candidate.result.balance
                        );
                        if !self.events.emit(WorkerEvent::Found { worker_id, candidate }).await {
                            break;
                        }
                    } else {
                        tracing::debug!("Worker {} checked {}", self.id, candidate.result.address);
                    }

                    if unreported >= self.settings.attempt_batch {
                        let count = std::mem::take(&mut unreported);
                        if !self.events.emit(WorkerEvent::Attempt { worker_id, count }).await {
                            break;
                        }
                    }
                    self.settings.pace_delay
                }
                Err(e) => {
                    tracing::warn!("Worker {} scan failed: {}", self.id, e);
                    let message = e.to_string();
                    if !self.events.emit(WorkerEvent::Error { worker_id, message }).await {
                        break;
                    }
                    self.settings.error_backoff
                }
            };

            if !pause(delay, &mut stop).await {
                break;
            }
        }

        self.state.send_replace(WorkerState::Stopping);
        if unreported > 0 {
            let _ = self
                .events
                .emit(WorkerEvent::Attempt {
                    worker_id,
                    count: unreported,
                })
                .await;
        }

        self.state.send_replace(WorkerState::Stopped);
        tracing::info!("Scan worker {} stopped after {} attempts", self.id, attempts);
    }
}

/// Sleep for `delay` unless stop is signaled first. Returns whether to keep running.
async fn pause(delay: Duration, stop: &mut watch::Receiver<bool>) -> bool {
    if *stop.borrow() {
        return false;
    }
    let changed = tokio::select! {
        _ = tokio::time::sleep(delay) => None,
        changed = stop.changed() => Some(changed.is_ok()),
    };
    match changed {
        None => !*stop.borrow(),
        Some(true) => !*stop.borrow_and_update(),
        // Sender dropped
        Some(false) => false,
    }
}
