//! Deterministic stand-in for a hardware sensor.
//!
//! Produces JPEG-shaped byte streams (SOI marker, scene-dependent payload,
//! EOI marker) whose length shrinks as the quality number grows. The payload
//! is not decodable; it only has to look like compressed data to the
//! estimator.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::sensor::Sensor;
use super::types::{Frame, PixelFormat, Resolution, SensorMode, SensorSettings};
use crate::error::SensorError;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];
const MIN_PAYLOAD: usize = 64;

/// Synthetic scene rendered into the payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scene {
    /// Every payload byte has the same value
    Flat(u8),
    /// Dark on the left, bright on the right
    Gradient,
    /// 16-pixel black/white squares
    Checkerboard,
    /// Bright disc on a dark background
    #[default]
    Spotlight,
    /// Seeded xorshift noise, different on every frame
    Noise(u64),
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scene::Flat(v) => write!(f, "flat:{}", v),
            Scene::Gradient => write!(f, "gradient"),
            Scene::Checkerboard => write!(f, "checkerboard"),
            Scene::Spotlight => write!(f, "spotlight"),
            Scene::Noise(seed) => write!(f, "noise:{}", seed),
        }
    }
}

impl FromStr for Scene {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };
        match (name.to_ascii_lowercase().as_str(), arg) {
            ("flat", Some(v)) => v
                .parse()
                .map(Scene::Flat)
                .map_err(|_| format!("Invalid flat level '{}' (0-255)", v)),
            ("flat", None) => Ok(Scene::Flat(128)),
            ("gradient", None) => Ok(Scene::Gradient),
            ("checkerboard", None) => Ok(Scene::Checkerboard),
            ("spotlight", None) => Ok(Scene::Spotlight),
            ("noise", Some(seed)) => seed
                .parse()
                .map(Scene::Noise)
                .map_err(|_| format!("Invalid noise seed '{}'", seed)),
            ("noise", None) => Ok(Scene::Noise(1)),
            _ => Err(format!(
                "Unknown scene '{}'. Available scenes: flat[:N], gradient, checkerboard, spotlight, noise[:SEED]",
                s
            )),
        }
    }
}

impl Scene {
    fn level(&self, x: u32, y: u32, width: u32, height: u32, noise: &mut u64) -> u8 {
        match *self {
            Scene::Flat(v) => v,
            Scene::Gradient => ((x as u64 * 255) / width.max(1) as u64) as u8,
            Scene::Checkerboard => {
                if ((x / 16) + (y / 16)) % 2 == 0 {
                    230
                } else {
                    20
                }
            }
            Scene::Spotlight => {
                let cx = width as i64 / 2;
                let cy = height as i64 / 2;
                let r = (width.min(height) as i64) / 3;
                let dx = x as i64 - cx;
                let dy = y as i64 - cy;
                if dx * dx + dy * dy <= r * r {
                    220
                } else {
                    30
                }
            }
            Scene::Noise(_) => {
                *noise ^= *noise << 13;
                *noise ^= *noise >> 7;
                *noise ^= *noise << 17;
                (*noise >> 24) as u8
            }
        }
    }
}

/// In-memory sensor with a bounded frame pool and failure injection.
#[derive(Debug)]
pub struct SimulatedSensor {
    scene: Scene,
    mode: Option<SensorMode>,
    capacity: usize,
    in_use: usize,
    frames_produced: u64,
    present: bool,
    pending_timeouts: usize,
    reject_configure: bool,
    configure_calls: Vec<SensorMode>,
    released: usize,
}

impl SimulatedSensor {
    /// Create a sensor whose pool holds `settings.buffer_count` frames.
    pub fn new(scene: Scene, settings: &SensorSettings) -> Self {
        Self {
            scene,
            mode: None,
            capacity: settings.buffer_count.max(1),
            in_use: 0,
            frames_produced: 0,
            present: true,
            pending_timeouts: 0,
            reject_configure: false,
            configure_calls: Vec::new(),
            released: 0,
        }
    }

    /// Simulate the sensor being unplugged (or coming back).
    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    /// Make the next `count` acquisitions time out.
    pub fn fail_next_acquires(&mut self, count: usize) {
        self.pending_timeouts = count;
    }

    /// Make every subsequent `configure` call fail.
    pub fn set_reject_configure(&mut self, reject: bool) {
        self.reject_configure = reject;
    }

    /// Every mode successfully applied, in order.
    pub fn configure_calls(&self) -> &[SensorMode] {
        &self.configure_calls
    }

    pub fn in_use(&self) -> usize {
        self.in_use
    }

    pub fn released(&self) -> usize {
        self.released
    }

    pub fn frames_produced(&self) -> u64 {
        self.frames_produced
    }

    /// Payload length for a mode: higher quality numbers compress harder.
    pub fn payload_len(mode: &SensorMode) -> usize {
        let ratio = 8 + mode.quality as u64 / 2;
        ((mode.resolution.pixel_count() / ratio) as usize).max(MIN_PAYLOAD)
    }

    fn synthesize(&self, mode: &SensorMode) -> Vec<u8> {
        let Resolution { width, height } = mode.resolution;
        let pixels = mode.resolution.pixel_count();
        let payload_len = Self::payload_len(mode);

        let mut noise = match self.scene {
            Scene::Noise(seed) => (seed ^ self.frames_produced.wrapping_mul(0x9E37_79B9)) | 1,
            _ => 1,
        };

        let mut data = Vec::with_capacity(payload_len + SOI.len() + EOI.len());
        data.extend_from_slice(&SOI);
        for i in 0..payload_len as u64 {
            let p = i * pixels / payload_len as u64;
            let x = (p % width as u64) as u32;
            let y = (p / width as u64) as u32;
            data.push(self.scene.level(x, y, width, height, &mut noise));
        }
        data.extend_from_slice(&EOI);
        data
    }
}

impl Sensor for SimulatedSensor {
    fn configure(&mut self, mode: SensorMode) -> Result<(), SensorError> {
        if !self.present {
            return Err(SensorError::Unavailable);
        }
        if self.reject_configure {
            return Err(SensorError::ConfigureFailed(format!(
                "sensor rejected {}",
                mode
            )));
        }
        if mode.resolution.width > Resolution::UXGA.width
            || mode.resolution.height > Resolution::UXGA.height
        {
            return Err(SensorError::UnsupportedMode(mode));
        }
        self.mode = Some(mode);
        self.configure_calls.push(mode);
        Ok(())
    }

    fn acquire_frame(&mut self, _timeout: Duration) -> Result<Frame, SensorError> {
        if !self.present {
            return Err(SensorError::Unavailable);
        }
        let mode = self.mode.ok_or(SensorError::Unavailable)?;
        if self.pending_timeouts > 0 {
            self.pending_timeouts -= 1;
            return Err(SensorError::Timeout);
        }
        if self.in_use >= self.capacity {
            return Err(SensorError::PoolExhausted {
                capacity: self.capacity,
            });
        }

        let data = self.synthesize(&mode);
        let frame = Frame::new(
            data,
            mode.resolution.width,
            mode.resolution.height,
            PixelFormat::Jpeg,
        )
        .map_err(|e| SensorError::ConfigureFailed(e.to_string()))?;

        self.in_use += 1;
        self.frames_produced += 1;
        Ok(frame)
    }

    fn release_frame(&mut self, frame: Frame) {
        drop(frame);
        self.in_use = self.in_use.saturating_sub(1);
        self.released += 1;
    }
}
