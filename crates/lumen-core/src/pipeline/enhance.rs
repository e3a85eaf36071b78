//! Enhancement orchestrator: the public entry point of the pipeline.

use crate::config::Config;
use crate::pipeline::bridge::EnhanceBridge;
use crate::pipeline::{codec, kernel};
use crate::types::{EnhancementOptions, PixelBuffer};

/// Runs captured photos through the enhancement stages, preferring the
/// background worker and always falling back to in-process execution.
///
/// Enhancement is best-effort by contract: no failure inside the pipeline is
/// ever surfaced to the caller. The worst observable outcome is the original
/// photo, unenhanced.
pub struct Enhancer {
    bridge: EnhanceBridge,
    jpeg_quality: u8,
}

impl Enhancer {
    /// Build an orchestrator with its own bridge from configuration.
    pub fn new(config: &Config) -> Self {
        Self::with_bridge(config, EnhanceBridge::new(config.worker.clone()))
    }

    /// Build an orchestrator around an existing bridge.
    pub fn with_bridge(config: &Config, bridge: EnhanceBridge) -> Self {
        Self {
            bridge,
            jpeg_quality: config.encoding.jpeg_quality,
        }
    }

    /// Enhance an encoded photo, returning the result in the same container
    /// format. On any failure the input bytes come back unchanged; this call
    /// never blocks a capture flow on an error.
    pub async fn enhance(&self, encoded: &[u8], options: &EnhancementOptions) -> Vec<u8> {
        let (buffer, format) = match codec::decode(encoded) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!("decode failed, keeping photo unenhanced: {e}");
                return encoded.to_vec();
            }
        };

        let processed = self.process(buffer, options).await;

        match codec::encode(&processed, format, self.jpeg_quality) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("re-encode failed, keeping photo unenhanced: {e}");
                encoded.to_vec()
            }
        }
    }

    /// Run the stages on a decoded buffer: on the background worker when the
    /// bridge reports it available, otherwise (or after any background
    /// failure) synchronously in-process.
    async fn process(&self, buffer: PixelBuffer, options: &EnhancementOptions) -> PixelBuffer {
        if self.bridge.is_available() {
            // The worker gets its own copy; the original stays here in case
            // the background path fails.
            match self.bridge.process(buffer.clone(), *options).await {
                Ok(processed) => {
                    tracing::debug!("photo enhanced on background worker");
                    return processed;
                }
                Err(e) => {
                    tracing::warn!("background enhancement failed, running locally: {e}");
                }
            }
        }

        let mut local = buffer;
        match kernel::run_stages(&mut local, options) {
            Ok(()) => tracing::debug!("photo enhanced in process"),
            // Geometry is validated before any stage writes, so on error the
            // buffer still holds the decoded pixels.
            Err(e) => tracing::warn!("local enhancement failed, keeping decoded pixels: {e}"),
        }
        local
    }
}
