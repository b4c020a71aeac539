//! Subcommand handlers for snapshot, stream and config actions.

use std::error::Error;
use std::io::Stdout;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use framesketch::camera::{Resolution, Scene, SensorHandle, SensorMode, SimulatedSensor};
use framesketch::config::{default_path, Config, CONFIG_TEMPLATE};
use framesketch::display::TerminalDisplay;
use framesketch::scheduler::CaptureScheduler;
use framesketch::status::LogStatus;

use super::args::ConfigAction;

/// Set by the Ctrl+C handler; checked between stream cycles.
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

type Scheduler = CaptureScheduler<SimulatedSensor, TerminalDisplay<Stdout>, LogStatus>;

fn build_scheduler(
    config: &Config,
    scene: Scene,
    redraw: bool,
) -> Result<Scheduler, Box<dyn Error>> {
    let sensor_settings = config.sensor_settings()?;
    let sensor = SimulatedSensor::new(scene, &sensor_settings);
    let handle = SensorHandle::open(sensor, &sensor_settings)?;
    let (width, height) = config.display_geometry()?;
    let display = TerminalDisplay::new(std::io::stdout(), width, height).with_redraw(redraw);

    Ok(CaptureScheduler::new(
        handle,
        display,
        LogStatus,
        config.render_settings()?,
    ))
}

/// Capture one frame and print it.
pub fn run_snapshot(
    config: &Config,
    scene: Scene,
    redraw: bool,
    resolution: Option<Resolution>,
) -> Result<(), Box<dyn Error>> {
    let mut scheduler = build_scheduler(config, scene, redraw)?;
    let mode = match resolution {
        Some(resolution) => Some(SensorMode::new(resolution, scheduler.sensor().mode().quality)?),
        None => None,
    };

    let report = scheduler.run_single_shot(mode)?;
    eprintln!(
        "{} source, {} bytes -> {}x{} at ({}, {}), average {}, {} lit",
        report.source,
        report.frame_bytes,
        report.plan.scaled_width,
        report.plan.scaled_height,
        report.plan.offset_x,
        report.plan.offset_y,
        report.global_average,
        report.lit_pixels
    );
    Ok(())
}

/// Run the continuous capture loop until done or Ctrl+C.
pub fn run_stream(
    config: &Config,
    scene: Scene,
    redraw: bool,
    cycles: Option<usize>,
    delay_ms: Option<u64>,
) -> Result<(), Box<dyn Error>> {
    let mut settings = config.continuous_settings()?;
    if let Some(cycles) = cycles {
        settings.cycles = cycles;
    }
    if let Some(delay_ms) = delay_ms {
        settings.delay = Duration::from_millis(delay_ms);
    }

    ctrlc::set_handler(|| {
        STOP_REQUESTED.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, stopping after this cycle...");
    })?;

    let mut scheduler = build_scheduler(config, scene, redraw)?;
    let report = scheduler.run_continuous(&settings, Some(&STOP_REQUESTED));

    eprintln!(
        "{} of {} cycle(s) displayed, {} failed{}",
        report.completed(),
        settings.cycles,
        report.failed(),
        if report.stopped { " (stopped)" } else { "" }
    );
    if !report.restored {
        eprintln!("Warning: sensor left at {}", scheduler.sensor().mode());
    }
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(
    action: ConfigAction,
    config_path: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let path = config_path.map(Path::to_path_buf).unwrap_or_else(default_path);

    match action {
        ConfigAction::Show => {
            let config = Config::load(Some(&path))?;
            let sensor = config.sensor_settings()?;
            let render = config.render_settings()?;
            let continuous = config.continuous_settings()?;
            let (width, height) = config.display_geometry()?;

            println!("Current configuration:");
            println!(
                "  Sensor: {}, {} buffer(s), timeout {:?}",
                sensor.mode, sensor.buffer_count, sensor.timeout
            );
            println!("  Display: {}x{}", width, height);
            println!(
                "  Render: average stride {}, jitter window {}, jitter period {}, pixel stride {}",
                render.estimate.average_stride,
                render.ditherer.jitter_window,
                render.ditherer.jitter_period,
                render.estimate.pixel_stride
            );
            match render.canvas_budget {
                Some(bytes) => println!("  Render budget: {} bytes", bytes),
                None => println!("  Render budget: unlimited"),
            }
            println!(
                "  Continuous: {} cycle(s) at {}, pixel stride {}, delay {:?}",
                continuous.cycles, continuous.mode, continuous.pixel_stride, continuous.delay
            );
            println!();

            if path.exists() {
                println!("Config file: {} (exists)", path.display());
            } else {
                println!("Config file: {} (not found)", path.display());
            }
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                return Err(format!(
                    "Config file already exists: {}. Use --force to overwrite.",
                    path.display()
                )
                .into());
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, CONFIG_TEMPLATE)?;
            println!("Created config file: {}", path.display());
        }
    }
    Ok(())
}
