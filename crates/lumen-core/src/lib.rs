//! Lumen Core - photo enhancement pipeline.
//!
//! Lumen takes a captured photo plus a set of enhancement intensities
//! (denoise, sharpen, contrast) and produces an enhanced photo. The pixel
//! work is offloaded to a background worker thread when one is available, so
//! the calling context stays responsive, and it always falls back to
//! in-process execution: a capture flow must never lose a photo to a failed
//! enhancement.
//!
//! # Architecture
//!
//! ```text
//! bytes → decode → bridge → worker thread → kernel stages ─┐
//!                    │                                     ├→ re-encode → bytes
//!                    └────── kernel stages in-process ─────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumen_core::{Config, EnhancementOptions, Enhancer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load().unwrap_or_default();
//!     let enhancer = Enhancer::new(&config);
//!
//!     let photo = std::fs::read("photo.jpg").unwrap();
//!     let options = EnhancementOptions { sharpness: 40, denoise: 25, contrast: 10 };
//!     let enhanced = enhancer.enhance(&photo, &options).await;
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use config::{Config, EncodingConfig, LoggingConfig, WorkerConfig};
pub use error::{BridgeError, CodecError, ConfigError, KernelError, LumenError, Result};
pub use pipeline::{EnhanceBridge, Enhancer};
pub use types::{EnhancementOptions, PixelBuffer};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
