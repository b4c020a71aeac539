//! Configuration file handling for framesketch.
//!
//! Loads configuration from `~/.config/framesketch/config.toml` or a custom path.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::{Resolution, SensorMode, SensorSettings};
use crate::display::{OLED_HEIGHT, OLED_WIDTH};
use crate::render::{
    Ditherer, EstimateOptions, DEFAULT_AVERAGE_STRIDE, DEFAULT_JITTER_PERIOD,
    DEFAULT_JITTER_WINDOW,
};
use crate::scheduler::{ContinuousSettings, RenderSettings};

/// Largest accepted display edge, in pixels.
pub const MAX_DISPLAY_DIMENSION: u32 = 1024;

/// Configuration file structure for framesketch.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub continuous: ContinuousConfig,
}

/// Startup sensor settings. Unset fields come from the memory profile.
#[derive(Debug, Deserialize)]
pub struct SensorConfig {
    #[serde(default = "default_true")]
    pub psram: bool,
    #[serde(default)]
    pub resolution: Option<Resolution>,
    #[serde(default)]
    pub quality: Option<u8>,
    #[serde(default)]
    pub buffer_count: Option<usize>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_display_width")]
    pub width: u32,
    #[serde(default = "default_display_height")]
    pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_average_stride")]
    pub average_stride: usize,
    #[serde(default = "default_jitter_window")]
    pub jitter_window: u8,
    #[serde(default = "default_jitter_period")]
    pub jitter_period: u32,
    #[serde(default = "default_one")]
    pub pixel_stride: u32,
    #[serde(default)]
    pub canvas_budget_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ContinuousConfig {
    #[serde(default = "default_cycles")]
    pub cycles: usize,
    #[serde(default = "default_continuous_resolution")]
    pub resolution: Resolution,
    #[serde(default = "default_continuous_quality")]
    pub quality: u8,
    #[serde(default = "default_continuous_stride")]
    pub pixel_stride: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_display_width() -> u32 {
    OLED_WIDTH
}

fn default_display_height() -> u32 {
    OLED_HEIGHT
}

fn default_average_stride() -> usize {
    DEFAULT_AVERAGE_STRIDE
}

fn default_jitter_window() -> u8 {
    DEFAULT_JITTER_WINDOW
}

fn default_jitter_period() -> u32 {
    DEFAULT_JITTER_PERIOD
}

fn default_cycles() -> usize {
    5
}

fn default_continuous_resolution() -> Resolution {
    Resolution::QQVGA
}

fn default_continuous_quality() -> u8 {
    20
}

fn default_continuous_stride() -> u32 {
    2
}

fn default_delay_ms() -> u64 {
    500
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            psram: true,
            resolution: None,
            quality: None,
            buffer_count: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: OLED_WIDTH,
            height: OLED_HEIGHT,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            average_stride: DEFAULT_AVERAGE_STRIDE,
            jitter_window: DEFAULT_JITTER_WINDOW,
            jitter_period: DEFAULT_JITTER_PERIOD,
            pixel_stride: 1,
            canvas_budget_bytes: None,
        }
    }
}

impl Default for ContinuousConfig {
    fn default() -> Self {
        Self {
            cycles: default_cycles(),
            resolution: Resolution::QQVGA,
            quality: default_continuous_quality(),
            pixel_stride: default_continuous_stride(),
            delay_ms: default_delay_ms(),
        }
    }
}

/// Commented starting point written by `framesketch config init`.
pub const CONFIG_TEMPLATE: &str = r#"# framesketch configuration

[sensor]
# true: VGA, quality 12, two frame buffers; false: QVGA, quality 20, one buffer
psram = true
# resolution = "vga"      # qqvga, qvga, vga, uxga or WIDTHxHEIGHT
# quality = 12            # JPEG quality 0-63, lower is better
# buffer_count = 2        # 1 or 2
timeout_ms = 1000

[display]
width = 128
height = 32

[render]
average_stride = 100      # sample every Nth byte for the brightness baseline
jitter_window = 20
jitter_period = 30
pixel_stride = 1
# canvas_budget_bytes = 4096  # cap on per-cycle render memory

[continuous]
cycles = 5
resolution = "qqvga"
quality = 20
pixel_stride = 2
delay_ms = 500
"#;

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?;
            log::debug!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Sensor startup settings: memory profile plus explicit overrides.
    pub fn sensor_settings(&self) -> Result<SensorSettings, ConfigError> {
        let mut settings = SensorSettings::for_memory(self.sensor.psram);
        let resolution = self.sensor.resolution.unwrap_or(settings.mode.resolution);
        let quality = self.sensor.quality.unwrap_or(settings.mode.quality);
        settings.mode = SensorMode::new(resolution, quality).map_err(ConfigError::Invalid)?;

        if let Some(count) = self.sensor.buffer_count {
            if !(1..=2).contains(&count) {
                return Err(ConfigError::Invalid(format!(
                    "sensor.buffer_count must be 1 or 2, got {}",
                    count
                )));
            }
            settings.buffer_count = count;
        }
        settings.timeout = Duration::from_millis(self.sensor.timeout_ms);
        Ok(settings)
    }

    /// Display geometry as (width, height).
    ///
    /// # Errors
    /// * `ConfigError::Invalid` - If either edge is 0 or above
    ///   [`MAX_DISPLAY_DIMENSION`]
    pub fn display_geometry(&self) -> Result<(u32, u32), ConfigError> {
        let DisplayConfig { width, height } = self.display;
        for (name, value) in [("width", width), ("height", height)] {
            if !(1..=MAX_DISPLAY_DIMENSION).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "display.{} must be between 1 and {}, got {}",
                    name, MAX_DISPLAY_DIMENSION, value
                )));
            }
        }
        Ok((width, height))
    }

    pub fn render_settings(&self) -> Result<RenderSettings, ConfigError> {
        if self.render.pixel_stride == 0 {
            return Err(ConfigError::Invalid(
                "render.pixel_stride must be at least 1".to_string(),
            ));
        }
        Ok(RenderSettings {
            estimate: EstimateOptions {
                average_stride: self.render.average_stride,
                pixel_stride: self.render.pixel_stride,
            },
            ditherer: Ditherer {
                jitter_window: self.render.jitter_window,
                jitter_period: self.render.jitter_period,
            },
            canvas_budget: self.render.canvas_budget_bytes,
        })
    }

    pub fn continuous_settings(&self) -> Result<ContinuousSettings, ConfigError> {
        let c = &self.continuous;
        if c.pixel_stride == 0 {
            return Err(ConfigError::Invalid(
                "continuous.pixel_stride must be at least 1".to_string(),
            ));
        }
        Ok(ContinuousSettings {
            cycles: c.cycles,
            mode: SensorMode::new(c.resolution, c.quality).map_err(ConfigError::Invalid)?,
            pixel_stride: c.pixel_stride,
            delay: Duration::from_millis(c.delay_ms),
        })
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("framesketch").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/framesketch/config.toml")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_panel() {
        let config = Config::default();
        assert_eq!(config.display.width, 128);
        assert_eq!(config.display.height, 32);
        assert_eq!(config.render.average_stride, 100);
        assert_eq!(config.continuous.cycles, 5);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        let render = config.render_settings().unwrap();
        assert_eq!(render, RenderSettings::default());
        assert_eq!(
            config.continuous_settings().unwrap(),
            ContinuousSettings::default()
        );
    }

    #[test]
    fn test_template_parses() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert!(config.sensor.psram);
        assert_eq!(config.continuous.resolution, Resolution::QQVGA);
        assert!(config.sensor_settings().is_ok());
    }

    #[test]
    fn test_sensor_profile_without_psram() {
        let config: Config = toml::from_str("[sensor]\npsram = false\n").unwrap();
        let settings = config.sensor_settings().unwrap();
        assert_eq!(settings.mode.resolution, Resolution::QVGA);
        assert_eq!(settings.buffer_count, 1);
    }

    #[test]
    fn test_sensor_overrides() {
        let config: Config =
            toml::from_str("[sensor]\nresolution = \"320x240\"\nquality = 30\nbuffer_count = 1\n")
                .unwrap();
        let settings = config.sensor_settings().unwrap();
        assert_eq!(settings.mode.resolution, Resolution::QVGA);
        assert_eq!(settings.mode.quality, 30);
        assert_eq!(settings.buffer_count, 1);
    }

    #[test]
    fn test_invalid_buffer_count() {
        let config: Config = toml::from_str("[sensor]\nbuffer_count = 3\n").unwrap();
        assert!(matches!(
            config.sensor_settings(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_invalid_quality() {
        let config: Config = toml::from_str("[continuous]\nquality = 99\n").unwrap();
        assert!(config.continuous_settings().is_err());
    }

    #[test]
    fn test_bad_resolution_string_fails_parse() {
        let result: Result<Config, _> = toml::from_str("[sensor]\nresolution = \"huge\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_pixel_stride_rejected() {
        let config: Config = toml::from_str("[render]\npixel_stride = 0\n").unwrap();
        assert!(config.render_settings().is_err());
    }

    #[test]
    fn test_display_geometry_default() {
        assert_eq!(Config::default().display_geometry().unwrap(), (128, 32));
    }

    #[test]
    fn test_display_geometry_rejects_zero_and_oversized() {
        let zero: Config = toml::from_str("[display]\nwidth = 0\n").unwrap();
        assert!(matches!(
            zero.display_geometry(),
            Err(ConfigError::Invalid(_))
        ));

        let huge: Config = toml::from_str("[display]\nheight = 4294967295\n").unwrap();
        let err = huge.display_geometry().unwrap_err();
        assert!(err.to_string().contains("display.height"));

        let edge: Config = toml::from_str("[display]\nwidth = 1024\nheight = 1\n").unwrap();
        assert_eq!(edge.display_geometry().unwrap(), (1024, 1));
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = default_path();
        assert!(path.ends_with("framesketch/config.toml"));
    }
}
