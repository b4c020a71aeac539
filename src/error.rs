//! Error types for the capture and render pipeline.

use crate::camera::SensorMode;

/// Failures reported by the sensor collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    #[error("Timed out waiting for a frame")]
    Timeout,

    #[error("Camera sensor not available")]
    Unavailable,

    #[error("Frame buffer pool exhausted ({capacity} buffer(s) in use)")]
    PoolExhausted {
        /// Number of frame buffers the sensor was configured with
        capacity: usize,
    },

    #[error("Sensor does not support mode {0}")]
    UnsupportedMode(SensorMode),

    #[error("Sensor configuration failed: {0}")]
    ConfigureFailed(String),
}

/// Errors that abort a single render cycle.
///
/// None of these are fatal to the process; the scheduler reports them and
/// moves on according to its mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("No frame available: {0}")]
    NoFrame(#[from] SensorError),

    #[error("Invalid frame: {width}x{height}, {len} bytes")]
    InvalidFrame { width: u32, height: u32, len: usize },

    #[error("Out of memory allocating {requested} byte canvas")]
    OutOfMemory { requested: usize },

    #[error("Failed to switch sensor to {mode}: {source}")]
    SensorReconfigureFailed {
        mode: SensorMode,
        #[source]
        source: SensorError,
    },
}
