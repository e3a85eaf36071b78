//! Enhancement pipeline components.
//!
//! - **kernel**: pure pixel transforms (denoise, unsharp mask, contrast)
//! - **codec**: decode/encode boundary around the `image` crate
//! - **worker**: background execution endpoint and its message protocol
//! - **bridge**: caller-side dispatch, timeouts, and failure latching
//! - **enhance**: the orchestrator guaranteeing a result for every photo

pub mod bridge;
pub mod codec;
pub mod enhance;
pub mod kernel;
pub mod worker;

// Re-exports for convenient access
pub use bridge::EnhanceBridge;
pub use enhance::Enhancer;
pub use worker::{WorkerReply, WorkerRequest};
