//! Caller-side bridge to the background enhancement worker.
//!
//! The bridge owns every piece of shared pipeline state: the worker
//! channels, the pending-request table, and the availability latch. It is an
//! ordinary constructible value, so the orchestrator holds one per process
//! and tests build a fresh one per scenario.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use crate::config::WorkerConfig;
use crate::error::BridgeError;
use crate::pipeline::worker::{self, WorkerReply, WorkerRequest};
use crate::types::{EnhancementOptions, PixelBuffer};

/// One-shot slot a dispatched request waits on.
type ReplySlot = oneshot::Sender<Result<PixelBuffer, BridgeError>>;

/// Bridge to the background execution context.
///
/// Cloning hands out another handle to the same worker and shared state.
#[derive(Clone)]
pub struct EnhanceBridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: WorkerConfig,
    state: Mutex<BridgeState>,
    pending: Mutex<HashMap<String, ReplySlot>>,
    next_seq: AtomicU64,
}

/// Lifecycle of the background context. Transitions are one-way past
/// `Failed`: a faulted bridge is never retried for the life of the process.
enum BridgeState {
    /// Initialization not yet attempted
    Idle,

    /// Worker and reply router are up
    Running {
        request_tx: mpsc::Sender<WorkerRequest>,
    },

    /// Initialization failed or the context faulted
    Failed,
}

impl EnhanceBridge {
    /// Create a bridge. The worker is not spawned until the first
    /// availability check.
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                config,
                state: Mutex::new(BridgeState::Idle),
                pending: Mutex::new(HashMap::new()),
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Whether background execution can be used right now.
    ///
    /// The first call in the `Idle` state spawns the worker and router
    /// threads and caches the outcome for the life of the process. A failed
    /// bridge stays unavailable forever.
    pub fn is_available(&self) -> bool {
        if !self.inner.config.enabled {
            return false;
        }
        let mut state = self.inner.state.lock().unwrap();
        match &*state {
            BridgeState::Running { .. } => true,
            BridgeState::Failed => false,
            BridgeState::Idle => match self.spawn_endpoint() {
                Ok(request_tx) => {
                    tracing::debug!("background enhancement worker initialized");
                    *state = BridgeState::Running { request_tx };
                    true
                }
                Err(e) => {
                    tracing::warn!("failed to initialize background worker: {e}");
                    *state = BridgeState::Failed;
                    false
                }
            },
        }
    }

    /// Dispatch one enhancement request and await its reply.
    ///
    /// The buffer is moved to the worker; on success the transformed copy
    /// comes back. A timeout abandons only the pending entry: the worker
    /// keeps running, and its eventual reply finds no entry and is dropped.
    pub async fn process(
        &self,
        buffer: PixelBuffer,
        options: EnhancementOptions,
    ) -> Result<PixelBuffer, BridgeError> {
        let request_tx = {
            let state = self.inner.state.lock().unwrap();
            match &*state {
                BridgeState::Running { request_tx } => request_tx.clone(),
                _ => return Err(BridgeError::Unavailable),
            }
        };

        let id = self.inner.next_request_id();
        let (slot_tx, slot_rx) = oneshot::channel();
        self.inner.pending.lock().unwrap().insert(id.clone(), slot_tx);

        let request = WorkerRequest::Enhance {
            id: id.clone(),
            buffer,
            options,
        };
        if request_tx.send(request).await.is_err() {
            // The worker died mid-dispatch; the router latches the failure,
            // this entry just must not linger.
            self.inner.pending.lock().unwrap().remove(&id);
            return Err(BridgeError::Faulted("request channel closed".to_string()));
        }

        let timeout_ms = self.inner.config.timeout_ms;
        match timeout(self.inner.config.timeout(), slot_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(BridgeError::Faulted(
                "background context torn down".to_string(),
            )),
            Err(_) => {
                self.inner.pending.lock().unwrap().remove(&id);
                tracing::warn!("enhance request {id} timed out after {timeout_ms}ms");
                Err(BridgeError::Timeout { timeout_ms })
            }
        }
    }

    /// Spawn the worker thread and the reply router for it.
    fn spawn_endpoint(&self) -> std::io::Result<mpsc::Sender<WorkerRequest>> {
        let (request_tx, request_rx) = mpsc::channel(self.inner.config.queue_depth);
        let (reply_tx, reply_rx) = std_mpsc::channel();

        thread::Builder::new()
            .name("lumen-worker".to_string())
            .spawn(move || worker::run(request_rx, reply_tx))?;
        self.spawn_router(reply_rx)?;
        Ok(request_tx)
    }

    /// The router resolves pending entries as replies arrive. It holds only
    /// a weak reference so a dropped bridge shuts the whole chain down.
    fn spawn_router(&self, reply_rx: std_mpsc::Receiver<WorkerReply>) -> std::io::Result<()> {
        let inner = Arc::downgrade(&self.inner);
        thread::Builder::new()
            .name("lumen-reply-router".to_string())
            .spawn(move || route_replies(reply_rx, inner))?;
        Ok(())
    }

    /// Test seam: wire the bridge to an externally controlled endpoint
    /// instead of spawning the real worker thread.
    #[cfg(test)]
    pub(crate) fn with_endpoint(
        config: WorkerConfig,
        request_tx: mpsc::Sender<WorkerRequest>,
        reply_rx: std_mpsc::Receiver<WorkerReply>,
    ) -> Self {
        let bridge = Self::new(config);
        bridge
            .spawn_router(reply_rx)
            .expect("failed to spawn router thread");
        *bridge.inner.state.lock().unwrap() = BridgeState::Running { request_tx };
        bridge
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.inner.pending.lock().unwrap().len()
    }
}

impl BridgeInner {
    /// Correlation IDs must never collide for the life of the process: a
    /// monotonic sequence number paired with a wall-clock stamp.
    fn next_request_id(&self) -> String {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        format!("req-{seq}-{millis}")
    }

    /// Resolve or reject the pending entry a reply belongs to.
    ///
    /// Replies whose entry is gone (timed out, or never existed) are dropped
    /// without side effects; a late reply is still worth a log line as a
    /// signal that the worker is running slow.
    fn route(&self, reply: WorkerReply) {
        let slot = self.pending.lock().unwrap().remove(reply.id());
        let Some(slot) = slot else {
            tracing::debug!(
                "dropping reply for unknown or expired request {}",
                reply.id()
            );
            return;
        };
        let outcome = match reply {
            WorkerReply::EnhanceResult { buffer, .. } => Ok(buffer),
            WorkerReply::EnhanceError { error, .. } => Err(BridgeError::Stage(error)),
        };
        // The receiver may have been dropped right before removal; that
        // request has already been answered with a timeout.
        let _ = slot.send(outcome);
    }

    /// Context-level failure: reject everything in flight, tear the worker
    /// channels down, and stay unavailable for the rest of the process.
    fn fail(&self, reason: &str) {
        tracing::error!("background enhancement context failed: {reason}");
        {
            // Replacing `Running` drops the request sender, which ends the
            // worker loop if it is somehow still alive.
            let mut state = self.state.lock().unwrap();
            *state = BridgeState::Failed;
        }
        let rejected: Vec<ReplySlot> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain().map(|(_, slot)| slot).collect()
        };
        for slot in rejected {
            let _ = slot.send(Err(BridgeError::Faulted(reason.to_string())));
        }
    }
}

/// Router loop, on its own thread: forward replies to their pending slots
/// until the worker's reply stream ends. The worker only stops replying by
/// exiting, so a disconnect while the bridge is alive is a context fault.
fn route_replies(reply_rx: std_mpsc::Receiver<WorkerReply>, inner: Weak<BridgeInner>) {
    while let Ok(reply) = reply_rx.recv() {
        let Some(inner) = inner.upgrade() else { return };
        inner.route(reply);
    }
    if let Some(inner) = inner.upgrade() {
        inner.fail("worker reply stream disconnected");
    }
}
