//! Sensor collaborator trait and the handle that owns sensor state.

use std::time::Duration;

use super::types::{Frame, SensorMode, SensorSettings};
use crate::error::{RenderError, SensorError};

/// Hardware camera sensor.
///
/// Implementations own the frame-buffer pool. A frame returned by
/// `acquire_frame` occupies one pool slot until it comes back through
/// `release_frame`.
pub trait Sensor {
    /// Switch output resolution and compression quality.
    fn configure(&mut self, mode: SensorMode) -> Result<(), SensorError>;

    /// Block until a compressed frame is ready or `timeout` elapses.
    fn acquire_frame(&mut self, timeout: Duration) -> Result<Frame, SensorError>;

    /// Return a frame buffer to the pool.
    fn release_frame(&mut self, frame: Frame);
}

/// Explicit owner of the sensor and its operating mode.
///
/// All mode changes go through here so callers can always ask which mode is
/// active and put the previous one back when they are done.
#[derive(Debug)]
pub struct SensorHandle<S: Sensor> {
    sensor: S,
    mode: SensorMode,
    timeout: Duration,
    outstanding: usize,
}

impl<S: Sensor> SensorHandle<S> {
    /// Apply the startup settings and take ownership of the sensor.
    ///
    /// # Errors
    /// * `RenderError::SensorReconfigureFailed` - If the initial mode is rejected
    pub fn open(mut sensor: S, settings: &SensorSettings) -> Result<Self, RenderError> {
        sensor
            .configure(settings.mode)
            .map_err(|source| RenderError::SensorReconfigureFailed {
                mode: settings.mode,
                source,
            })?;
        log::info!("Sensor ready at {}", settings.mode);

        Ok(Self {
            sensor,
            mode: settings.mode,
            timeout: settings.timeout,
            outstanding: 0,
        })
    }

    /// The mode the sensor is currently running in.
    pub fn mode(&self) -> SensorMode {
        self.mode
    }

    /// Frames acquired and not yet released.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Switch to `mode`, returning the mode that was active before.
    ///
    /// On failure the recorded mode is left unchanged.
    pub fn switch_mode(&mut self, mode: SensorMode) -> Result<SensorMode, RenderError> {
        let previous = self.mode;
        if mode == previous {
            return Ok(previous);
        }

        self.sensor
            .configure(mode)
            .map_err(|source| RenderError::SensorReconfigureFailed { mode, source })?;
        log::debug!("Sensor mode {} -> {}", previous, mode);
        self.mode = mode;
        Ok(previous)
    }

    /// Acquire the next frame.
    ///
    /// # Errors
    /// * `RenderError::NoFrame` - On timeout, missing sensor or an exhausted pool
    pub fn acquire(&mut self) -> Result<Frame, RenderError> {
        let frame = self.sensor.acquire_frame(self.timeout)?;
        self.outstanding += 1;
        Ok(frame)
    }

    /// Hand a frame back to the sensor's pool.
    pub fn release(&mut self, frame: Frame) {
        self.sensor.release_frame(frame);
        self.outstanding = self.outstanding.saturating_sub(1);
    }
}
