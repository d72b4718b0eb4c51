use tokio::sync::{mpsc, oneshot};

use crate::models::{AddressSet, ScanResult};
use crate::services::keygen::Keypair;

/// A scanned keypair with its addresses and lookup result
#[derive(Debug, Clone)]
pub struct Candidate {
    pub keypair: Keypair,
    pub addresses: AddressSet,
    pub result: ScanResult,
}

/// Events reported upward by scan workers.
/// `worker_id` is `None` for on-demand scans outside the worker pool.
#[derive(Debug)]
pub enum WorkerEvent {
    /// `count` attempts completed since the previous report
    Attempt {
        worker_id: Option<usize>,
        count: u64,
    },
    Found {
        worker_id: Option<usize>,
        candidate: Candidate,
    },
    Error {
        worker_id: Option<usize>,
        message: String,
    },
}

pub(crate) enum ControlMessage {
    Event(WorkerEvent),
    /// Acknowledged once every message queued before it has been handled
    Flush(oneshot::Sender<()>),
}

/// Sending half of the worker event channel
#[derive(Clone)]
pub struct EventSender(mpsc::Sender<ControlMessage>);

impl EventSender {
    /// Returns false if the consumer is gone
    pub async fn emit(&self, event: WorkerEvent) -> bool {
        self.0.send(ControlMessage::Event(event)).await.is_ok()
    }

    /// Whether the consumer is gone
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    /// Wait until the consumer has handled everything queued so far
    pub async fn flush(&self) -> bool {
        let (ack, done) = oneshot::channel();
        if self.0.send(ControlMessage::Flush(ack)).await.is_err() {
            return false;
        }
        done.await.is_ok()
    }
}

/// Receiving half of the worker event channel
pub struct EventReceiver(mpsc::Receiver<ControlMessage>);

impl EventReceiver {
    pub(crate) async fn recv_message(&mut self) -> Option<ControlMessage> {
        self.0.recv().await
    }

    /// Next worker event; flush requests are acknowledged in place
    pub async fn recv(&mut self) -> Option<WorkerEvent> {
        loop {
            match self.0.recv().await? {
                ControlMessage::Event(event) => return Some(event),
                ControlMessage::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
    }

    /// Drain whatever is queued without waiting
    pub fn try_recv(&mut self) -> Option<WorkerEvent> {
        loop {
            match self.0.try_recv().ok()? {
                ControlMessage::Event(event) => return Some(event),
                ControlMessage::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
    }
}

pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (sender, receiver) = mpsc::channel(capacity);
    (EventSender(sender), EventReceiver(receiver))
}
