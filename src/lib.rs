//! framesketch library crate.
//!
//! Captures compressed camera frames and renders an approximate one-bit
//! image onto a small fixed-size display without decoding the frame.

pub mod camera;
pub mod config;
pub mod display;
pub mod error;
pub mod render;
pub mod scheduler;
pub mod status;

pub use error::{RenderError, SensorError};
