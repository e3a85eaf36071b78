//! Background execution endpoint and its message protocol.
//!
//! The endpoint runs on a dedicated OS thread and is reachable only through
//! channels; pixel buffers are moved across the boundary, never shared.
//! Every request produces exactly one reply, success or error.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc as std_mpsc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::pipeline::kernel;
use crate::types::{EnhancementOptions, PixelBuffer};

/// Request sent from the bridge to the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WorkerRequest {
    /// Run the enhancement stage sequence on `buffer`.
    Enhance {
        id: String,
        buffer: PixelBuffer,
        options: EnhancementOptions,
    },
}

/// Reply sent from the worker back to the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WorkerReply {
    /// The stage sequence completed; `buffer` holds the transformed image.
    EnhanceResult { id: String, buffer: PixelBuffer },

    /// The stage sequence failed for this request only.
    EnhanceError { id: String, error: String },
}

impl WorkerReply {
    /// Correlation ID this reply answers.
    pub fn id(&self) -> &str {
        match self {
            WorkerReply::EnhanceResult { id, .. } => id,
            WorkerReply::EnhanceError { id, .. } => id,
        }
    }
}

/// Endpoint loop: drain requests until the channel closes, replying exactly
/// once per request, in arrival order.
///
/// A panic inside a stage is caught here and reported as a per-request error
/// reply; nothing crosses the thread boundary unhandled.
pub(crate) fn run(
    mut requests: mpsc::Receiver<WorkerRequest>,
    replies: std_mpsc::Sender<WorkerReply>,
) {
    while let Some(request) = requests.blocking_recv() {
        let WorkerRequest::Enhance {
            id,
            mut buffer,
            options,
        } = request;
        tracing::trace!("worker: processing request {id}");

        let reply = match run_stages_guarded(&mut buffer, &options) {
            Ok(()) => WorkerReply::EnhanceResult { id, buffer },
            Err(error) => WorkerReply::EnhanceError { id, error },
        };
        if replies.send(reply).is_err() {
            // The bridge side is gone; nobody is listening anymore.
            break;
        }
    }
}

fn run_stages_guarded(
    buffer: &mut PixelBuffer,
    options: &EnhancementOptions,
) -> Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(|| kernel::run_stages(buffer, options))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(describe_panic(payload)),
    }
}

fn describe_panic(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "stage panicked".to_string()
    }
}
