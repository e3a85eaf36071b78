//! Error types for the Lumen enhancement pipeline.
//!
//! Errors are organized by pipeline boundary. None of them ever cross the
//! public `enhance` entry point, which resolves every failure to "return the
//! original photo"; they exist for diagnostics and for the internal seams.

use thiserror::Error;

/// Top-level error type for Lumen operations.
#[derive(Error, Debug)]
pub enum LumenError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Image decode/encode errors
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Background execution errors
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Pixel kernel errors
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Decode/encode boundary errors.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Input bytes could not be decoded into a pixel buffer
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// Pixel buffer could not be re-encoded
    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Failures reported by the execution bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Disabled by policy, never initialized, or permanently failed
    #[error("background execution is unavailable")]
    Unavailable,

    /// No reply arrived before the per-request deadline
    #[error("no reply from background worker within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The background context itself failed and has been torn down
    #[error("background execution context failed: {0}")]
    Faulted(String),

    /// The worker replied with a per-request processing error
    #[error("background stage processing failed: {0}")]
    Stage(String),
}

/// Pixel kernel errors.
#[derive(Error, Debug)]
pub enum KernelError {
    /// Buffer length does not match the stated dimensions
    #[error(
        "pixel buffer geometry mismatch: {width}x{height} needs {expected} bytes, got {actual}"
    )]
    Geometry {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Convenience type alias for Lumen results.
pub type Result<T> = std::result::Result<T, LumenError>;
