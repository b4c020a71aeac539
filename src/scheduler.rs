//! Capture scheduling: single-shot and continuous capture-to-display cycles.
//!
//! Every cycle walks Idle -> Acquiring -> Estimating -> Packing -> Displaying
//! -> Idle and runs to completion before the next one starts. A failing
//! stage aborts only its own cycle; the acquired frame is released and the
//! canvas dropped on every path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::camera::{Frame, Resolution, Sensor, SensorHandle, SensorMode};
use crate::display::DisplaySink;
use crate::error::RenderError;
use crate::render::{
    dither, estimate, pack, reserve_working_set, Ditherer, EstimateOptions, ScalePlan,
};
use crate::status::{Status, StatusSink};

/// Where the scheduler is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Idle,
    Acquiring,
    Estimating,
    Packing,
    Displaying,
}

/// Render tuning shared by both capture modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderSettings {
    /// Average stride and single-shot pixel stride
    pub estimate: EstimateOptions,
    pub ditherer: Ditherer,
    /// Ceiling on one cycle's render memory (both grids plus the canvas),
    /// in bytes
    pub canvas_budget: Option<usize>,
}

/// Continuous capture parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuousSettings {
    pub cycles: usize,
    /// Coarse sensor mode used for the whole run
    pub mode: SensorMode,
    /// Destination stride; each sample fills a stride x stride block
    pub pixel_stride: u32,
    /// Pause between cycles (not after the last one)
    pub delay: Duration,
}

impl Default for ContinuousSettings {
    fn default() -> Self {
        Self {
            cycles: 5,
            mode: SensorMode {
                resolution: Resolution::QQVGA,
                quality: 20,
            },
            pixel_stride: 2,
            delay: Duration::from_millis(500),
        }
    }
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub frame_bytes: usize,
    pub source: Resolution,
    pub plan: ScalePlan,
    pub global_average: u8,
    pub lit_pixels: usize,
}

/// Outcome of a continuous run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuousReport {
    /// One entry per cycle that was started
    pub cycles: Vec<Result<CycleReport, RenderError>>,
    /// Whether the sensor ended up back in its original mode
    pub restored: bool,
    /// Whether the stop flag ended the run before all cycles ran
    pub stopped: bool,
}

impl ContinuousReport {
    pub fn completed(&self) -> usize {
        self.cycles.iter().filter(|c| c.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.cycles.len() - self.completed()
    }
}

/// Drives capture cycles from a sensor to a display.
pub struct CaptureScheduler<S: Sensor, D: DisplaySink, R: StatusSink> {
    sensor: SensorHandle<S>,
    display: D,
    status: R,
    settings: RenderSettings,
    stage: CycleStage,
}

impl<S: Sensor, D: DisplaySink, R: StatusSink> CaptureScheduler<S, D, R> {
    pub fn new(sensor: SensorHandle<S>, display: D, status: R, settings: RenderSettings) -> Self {
        Self {
            sensor,
            display,
            status,
            settings,
            stage: CycleStage::Idle,
        }
    }

    pub fn stage(&self) -> CycleStage {
        self.stage
    }

    pub fn sensor(&self) -> &SensorHandle<S> {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut SensorHandle<S> {
        &mut self.sensor
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn status(&self) -> &R {
        &self.status
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Run one cycle at the configured pixel stride.
    ///
    /// With `mode` set, the sensor is switched to it for this capture and
    /// put back afterwards. A failed restore is reported but does not turn
    /// a successful cycle into an error.
    ///
    /// # Errors
    /// Any error that aborted the cycle, including `SensorReconfigureFailed`
    /// when the requested mode could not be applied.
    pub fn run_single_shot(
        &mut self,
        mode: Option<SensorMode>,
    ) -> Result<CycleReport, RenderError> {
        let previous = match mode {
            Some(mode) => match self.sensor.switch_mode(mode) {
                Ok(previous) => Some(previous),
                Err(e) => {
                    self.status.report(&Status::Failed(e.clone()));
                    return Err(e);
                }
            },
            None => None,
        };

        let pixel_stride = self.settings.estimate.pixel_stride;
        let result = self.run_cycle(pixel_stride);

        if let Some(previous) = previous {
            self.restore_mode(previous);
        }
        result
    }

    /// Run `settings.cycles` coarse cycles, then restore the original mode.
    ///
    /// Failed cycles are recorded and the run moves on to the next one. If
    /// the coarse mode cannot be applied the run proceeds in the current
    /// mode. `stop` is only checked between cycles.
    pub fn run_continuous(
        &mut self,
        settings: &ContinuousSettings,
        stop: Option<&AtomicBool>,
    ) -> ContinuousReport {
        let original = self.sensor.mode();
        if let Err(e) = self.sensor.switch_mode(settings.mode) {
            log::warn!("Continuing at {}: {}", original, e);
            self.status.report(&Status::Failed(e));
        }

        let mut cycles = Vec::with_capacity(settings.cycles);
        let mut stopped = false;

        for index in 0..settings.cycles {
            if stop.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                log::info!("Stop requested after {} cycle(s)", index);
                stopped = true;
                break;
            }

            self.status.report(&Status::Cycle {
                index: index + 1,
                total: settings.cycles,
            });
            cycles.push(self.run_cycle(settings.pixel_stride));

            if index + 1 < settings.cycles && !settings.delay.is_zero() {
                std::thread::sleep(settings.delay);
            }
        }

        let restored = self.restore_mode(original);
        ContinuousReport {
            cycles,
            restored,
            stopped,
        }
    }

    /// Put the sensor back into `mode`. Failures are reported, not returned.
    fn restore_mode(&mut self, mode: SensorMode) -> bool {
        match self.sensor.switch_mode(mode) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Sensor stays at {}: {}", self.sensor.mode(), e);
                self.status.report(&Status::RestoreFailed(e));
                false
            }
        }
    }

    fn run_cycle(&mut self, pixel_stride: u32) -> Result<CycleReport, RenderError> {
        self.set_stage(CycleStage::Acquiring);
        self.status.report(&Status::Capturing);

        let result = match self.sensor.acquire() {
            Ok(frame) => {
                log::debug!(
                    "Frame acquired: {}x{}, {} bytes",
                    frame.width(),
                    frame.height(),
                    frame.len()
                );
                let rendered = self.render(&frame, pixel_stride);
                self.sensor.release(frame);
                rendered
            }
            Err(e) => Err(e),
        };

        self.set_stage(CycleStage::Idle);
        if let Err(e) = &result {
            self.status.report(&Status::Failed(e.clone()));
        }
        result
    }

    fn render(&mut self, frame: &Frame, pixel_stride: u32) -> Result<CycleReport, RenderError> {
        self.set_stage(CycleStage::Estimating);
        self.status.report(&Status::Processing);

        let (canvas_width, canvas_height) = self.display.geometry();
        let plan = ScalePlan::new(frame.width(), frame.height(), canvas_width, canvas_height)?;
        let canvas_budget = reserve_working_set(&plan, self.settings.canvas_budget)?;
        let options = EstimateOptions {
            pixel_stride,
            ..self.settings.estimate
        };
        let grid = estimate(frame, &plan, &options)?;
        let decisions = dither(&grid, &self.settings.ditherer)?;

        self.set_stage(CycleStage::Packing);
        let canvas = pack(&decisions, &plan, canvas_budget)?;

        self.set_stage(CycleStage::Displaying);
        self.status.report(&Status::Displaying);
        self.display.blit(&canvas);

        Ok(CycleReport {
            frame_bytes: frame.len(),
            source: Resolution {
                width: frame.width(),
                height: frame.height(),
            },
            plan,
            global_average: grid.global_average(),
            lit_pixels: canvas.lit_pixels(),
        })
    }

    fn set_stage(&mut self, stage: CycleStage) {
        log::trace!("{:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Scene, SensorSettings, SimulatedSensor};
    use crate::display::MemoryDisplay;
    use crate::status::RecordingStatus;

    fn scheduler(
        scene: Scene,
        settings: RenderSettings,
    ) -> CaptureScheduler<SimulatedSensor, MemoryDisplay, RecordingStatus> {
        let sensor_settings = SensorSettings::default();
        let sensor = SimulatedSensor::new(scene, &sensor_settings);
        let handle = SensorHandle::open(sensor, &sensor_settings).unwrap();
        CaptureScheduler::new(
            handle,
            MemoryDisplay::default(),
            RecordingStatus::default(),
            settings,
        )
    }

    #[test]
    fn test_single_shot_blits_and_returns_to_idle() {
        let mut s = scheduler(Scene::Spotlight, RenderSettings::default());
        let report = s.run_single_shot(None).unwrap();
        assert_eq!(report.plan.scaled_width, 42);
        assert_eq!(s.display().blit_count(), 1);
        assert_eq!(s.stage(), CycleStage::Idle);
        assert_eq!(s.sensor().outstanding(), 0);
        assert_eq!(
            s.status().lines(),
            vec!["capturing", "processing", "displaying"]
        );
    }

    #[test]
    fn test_single_shot_restores_mode() {
        let mut s = scheduler(Scene::Gradient, RenderSettings::default());
        let original = s.sensor().mode();
        let coarse = ContinuousSettings::default().mode;
        let report = s.run_single_shot(Some(coarse)).unwrap();
        assert_eq!(report.source, Resolution::QQVGA);
        assert_eq!(s.sensor().mode(), original);
        assert_eq!(
            s.sensor().sensor().configure_calls(),
            &[original, coarse, original]
        );
    }

    #[test]
    fn test_out_of_memory_releases_frame_without_blit() {
        let settings = RenderSettings {
            canvas_budget: Some(16),
            ..RenderSettings::default()
        };
        let mut s = scheduler(Scene::Spotlight, settings);
        let err = s.run_single_shot(None).unwrap_err();
        assert_eq!(err, RenderError::OutOfMemory { requested: 3200 });
        assert_eq!(s.display().blit_count(), 0);
        assert_eq!(s.sensor().outstanding(), 0);
        assert_eq!(s.sensor().sensor().released(), 1);
    }

    #[test]
    fn test_budget_covers_grids_before_estimating() {
        let exact = RenderSettings {
            canvas_budget: Some(3200),
            ..RenderSettings::default()
        };
        assert!(scheduler(Scene::Spotlight, exact).run_single_shot(None).is_ok());

        let short = RenderSettings {
            canvas_budget: Some(3199),
            ..RenderSettings::default()
        };
        let mut s = scheduler(Scene::Spotlight, short);
        assert_eq!(
            s.run_single_shot(None).unwrap_err(),
            RenderError::OutOfMemory { requested: 3200 }
        );
        assert_eq!(s.stage(), CycleStage::Idle);
        assert_eq!(s.display().blit_count(), 0);
    }

    #[test]
    fn test_huge_display_reports_out_of_memory() {
        let sensor_settings = SensorSettings::default();
        let sensor = SimulatedSensor::new(Scene::Spotlight, &sensor_settings);
        let handle = SensorHandle::open(sensor, &sensor_settings).unwrap();
        let mut s = CaptureScheduler::new(
            handle,
            MemoryDisplay::new(u32::MAX, u32::MAX),
            RecordingStatus::default(),
            RenderSettings {
                canvas_budget: Some(512),
                ..RenderSettings::default()
            },
        );
        assert!(matches!(
            s.run_single_shot(None),
            Err(RenderError::OutOfMemory { .. })
        ));
        assert_eq!(s.sensor().outstanding(), 0);
        assert_eq!(s.display().blit_count(), 0);
        assert!(s.status().lines().last().unwrap().starts_with("error:"));
    }

    #[test]
    fn test_huge_display_without_budget_fails_allocation() {
        let sensor_settings = SensorSettings::default();
        let sensor = SimulatedSensor::new(Scene::Gradient, &sensor_settings);
        let handle = SensorHandle::open(sensor, &sensor_settings).unwrap();
        let mut s = CaptureScheduler::new(
            handle,
            MemoryDisplay::new(u32::MAX, u32::MAX),
            RecordingStatus::default(),
            RenderSettings::default(),
        );
        assert!(matches!(
            s.run_single_shot(None),
            Err(RenderError::OutOfMemory { .. })
        ));
        assert_eq!(s.sensor().outstanding(), 0);
    }

    #[test]
    fn test_continuous_counts_cycles() {
        let mut s = scheduler(Scene::Checkerboard, RenderSettings::default());
        let settings = ContinuousSettings {
            delay: Duration::ZERO,
            ..ContinuousSettings::default()
        };
        let report = s.run_continuous(&settings, None);
        assert_eq!(report.completed(), 5);
        assert!(report.restored);
        assert!(!report.stopped);
        assert_eq!(s.display().blit_count(), 5);
    }

    #[test]
    fn test_stop_flag_checked_between_cycles() {
        let mut s = scheduler(Scene::Checkerboard, RenderSettings::default());
        let stop = AtomicBool::new(true);
        let settings = ContinuousSettings {
            delay: Duration::ZERO,
            ..ContinuousSettings::default()
        };
        let report = s.run_continuous(&settings, Some(&stop));
        assert!(report.stopped);
        assert!(report.cycles.is_empty());
        assert!(report.restored);
    }
}
