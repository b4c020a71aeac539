//! Frame source: sensor configuration and compressed frame acquisition.
//!
//! - [`Sensor`] is the hardware collaborator
//! - [`SensorHandle`] owns the sensor and its current [`SensorMode`]
//! - [`SimulatedSensor`] produces deterministic synthetic frames

mod sensor;
mod simulated;
mod types;

pub use sensor::{Sensor, SensorHandle};
pub use simulated::{Scene, SimulatedSensor};
pub use types::{Frame, PixelFormat, Resolution, SensorMode, SensorSettings, MAX_JPEG_QUALITY};
