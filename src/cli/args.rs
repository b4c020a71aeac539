//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use framesketch::camera::{Resolution, Scene};

/// Render camera frames as one-bit sketches on a small monochrome display
#[derive(Parser, Debug)]
#[command(name = "framesketch")]
#[command(version, about = "Camera-to-OLED one-bit renderer", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Scene for the simulated sensor: flat[:N], gradient, checkerboard, spotlight, noise[:SEED]
    #[arg(long, global = true, default_value = "spotlight")]
    pub scene: Scene,

    /// Redraw the preview in place instead of appending
    #[arg(long, global = true)]
    pub redraw: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture and display a single frame
    Snapshot {
        /// Capture at this resolution, then restore the configured one
        #[arg(long)]
        resolution: Option<Resolution>,
    },
    /// Capture a fixed number of coarse frames
    Stream {
        /// Number of cycles (overrides config)
        #[arg(long)]
        cycles: Option<usize>,

        /// Pause between cycles in milliseconds (overrides config)
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show the resolved configuration
    Show,
    /// Create default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
