//! Camera types and data structures.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::RenderError;

/// Sensor output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// 160x120 - coarse, used for continuous capture
    pub const QQVGA: Resolution = Resolution {
        width: 160,
        height: 120,
    };

    /// 320x240 - for sensors without external frame memory
    pub const QVGA: Resolution = Resolution {
        width: 320,
        height: 240,
    };

    /// 640x480 - default single-shot resolution
    pub const VGA: Resolution = Resolution {
        width: 640,
        height: 480,
    };

    /// 1600x1200 - largest mode the sensor supports
    pub const UXGA: Resolution = Resolution {
        width: 1600,
        height: 1200,
    };

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::VGA
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    /// Parse a named frame size (`qqvga`, `qvga`, `vga`, `uxga`) or `WIDTHxHEIGHT`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qqvga" => return Ok(Self::QQVGA),
            "qvga" => return Ok(Self::QVGA),
            "vga" => return Ok(Self::VGA),
            "uxga" => return Ok(Self::UXGA),
            _ => {}
        }

        let (w, h) = s.trim().split_once('x').ok_or_else(|| {
            format!(
                "Invalid resolution '{}'. Use a name (qqvga, qvga, vga, uxga) or WIDTHxHEIGHT",
                s
            )
        })?;
        let width: u32 = w
            .parse()
            .map_err(|_| format!("Invalid width '{}' in resolution", w))?;
        let height: u32 = h
            .parse()
            .map_err(|_| format!("Invalid height '{}' in resolution", h))?;
        if width == 0 || height == 0 {
            return Err("Resolution width and height must be greater than 0".to_string());
        }
        Ok(Resolution { width, height })
    }
}

impl TryFrom<String> for Resolution {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Highest JPEG quality value the sensor accepts (lower is better quality).
pub const MAX_JPEG_QUALITY: u8 = 63;

/// A sensor operating mode: output resolution plus compression quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorMode {
    pub resolution: Resolution,
    /// JPEG quality, 0-63, lower numbers mean larger, better frames
    pub quality: u8,
}

impl SensorMode {
    /// Create a mode, rejecting quality values outside the sensor's range.
    pub fn new(resolution: Resolution, quality: u8) -> Result<Self, String> {
        if quality > MAX_JPEG_QUALITY {
            return Err(format!(
                "JPEG quality must be between 0 and {}, got {}",
                MAX_JPEG_QUALITY, quality
            ));
        }
        Ok(Self {
            resolution,
            quality,
        })
    }
}

impl fmt::Display for SensorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} q{}", self.resolution, self.quality)
    }
}

/// Sensor startup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorSettings {
    pub mode: SensorMode,
    /// Number of frame buffers in the pool (1 or 2)
    pub buffer_count: usize,
    /// How long `acquire` may block before reporting no frame
    pub timeout: Duration,
}

impl SensorSettings {
    /// Settings matched to the available frame memory.
    ///
    /// With external PSRAM the sensor can hold two VGA frames at a higher
    /// quality; without it a single QVGA buffer at reduced quality fits.
    pub fn for_memory(psram: bool) -> Self {
        if psram {
            Self {
                mode: SensorMode {
                    resolution: Resolution::VGA,
                    quality: 12,
                },
                buffer_count: 2,
                timeout: Duration::from_millis(1000),
            }
        } else {
            Self {
                mode: SensorMode {
                    resolution: Resolution::QVGA,
                    quality: 20,
                },
                buffer_count: 1,
                timeout: Duration::from_millis(1000),
            }
        }
    }
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self::for_memory(true)
    }
}

/// Pixel format of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Baseline JPEG stream
    Jpeg,
}

/// A compressed frame acquired from the sensor.
///
/// Owned by whoever acquired it until handed back through
/// [`SensorHandle::release`](super::SensorHandle::release).
#[derive(Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl Frame {
    /// Wrap a compressed buffer, checking that it is non-empty and has a
    /// non-zero size.
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, RenderError> {
        if data.is_empty() || width == 0 || height == 0 {
            return Err(RenderError::InvalidFrame {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Give the buffer back, e.g. so a sensor can recycle it.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_constants() {
        assert_eq!(Resolution::QQVGA.width, 160);
        assert_eq!(Resolution::QQVGA.height, 120);
        assert_eq!(Resolution::QVGA.width, 320);
        assert_eq!(Resolution::VGA.height, 480);
        assert_eq!(Resolution::UXGA.pixel_count(), 1600 * 1200);
    }

    #[test]
    fn test_resolution_parse_names() {
        assert_eq!("vga".parse::<Resolution>().unwrap(), Resolution::VGA);
        assert_eq!("QQVGA".parse::<Resolution>().unwrap(), Resolution::QQVGA);
    }

    #[test]
    fn test_resolution_parse_dimensions() {
        let res: Resolution = "800x600".parse().unwrap();
        assert_eq!(res.width, 800);
        assert_eq!(res.height, 600);
    }

    #[test]
    fn test_resolution_parse_rejects_garbage() {
        assert!("800".parse::<Resolution>().is_err());
        assert!("0x600".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_sensor_mode_quality_range() {
        assert!(SensorMode::new(Resolution::VGA, 63).is_ok());
        assert!(SensorMode::new(Resolution::VGA, 64).is_err());
    }

    #[test]
    fn test_settings_for_memory() {
        let with = SensorSettings::for_memory(true);
        assert_eq!(with.mode.resolution, Resolution::VGA);
        assert_eq!(with.mode.quality, 12);
        assert_eq!(with.buffer_count, 2);

        let without = SensorSettings::for_memory(false);
        assert_eq!(without.mode.resolution, Resolution::QVGA);
        assert_eq!(without.mode.quality, 20);
        assert_eq!(without.buffer_count, 1);
    }

    #[test]
    fn test_frame_rejects_empty_data() {
        let err = Frame::new(Vec::new(), 640, 480, PixelFormat::Jpeg).unwrap_err();
        assert_eq!(
            err,
            RenderError::InvalidFrame {
                width: 640,
                height: 480,
                len: 0
            }
        );
    }

    #[test]
    fn test_frame_rejects_zero_dimensions() {
        assert!(Frame::new(vec![1, 2, 3], 0, 480, PixelFormat::Jpeg).is_err());
        assert!(Frame::new(vec![1, 2, 3], 640, 0, PixelFormat::Jpeg).is_err());
    }

    #[test]
    fn test_frame_accessors() {
        let frame = Frame::new(vec![0xFF, 0xD8, 0x00], 4, 2, PixelFormat::Jpeg).unwrap();
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.format(), PixelFormat::Jpeg);
        assert_eq!(frame.into_data(), vec![0xFF, 0xD8, 0x00]);
    }
}
