//! Display sinks that receive packed canvases.

mod terminal;

pub use terminal::{canvas_to_braille, grid_to_braille, TerminalDisplay, BRAILLE_BASE};

use crate::render::Canvas;

/// Width of the SSD1306 panel the pipeline was built around.
pub const OLED_WIDTH: u32 = 128;
/// Height of the SSD1306 panel the pipeline was built around.
pub const OLED_HEIGHT: u32 = 32;

/// A fixed-geometry one-bit display.
///
/// `blit` replaces the visible content and has no failure mode: transport
/// problems are the implementation's to log or retry.
pub trait DisplaySink {
    /// Panel size in pixels as (width, height).
    fn geometry(&self) -> (u32, u32);

    fn blit(&mut self, canvas: &Canvas);
}

/// Display that keeps the last blitted canvas in memory.
#[derive(Debug, Clone)]
pub struct MemoryDisplay {
    width: u32,
    height: u32,
    last: Option<Canvas>,
    blits: usize,
}

impl MemoryDisplay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            last: None,
            blits: 0,
        }
    }

    /// The most recent canvas, if anything has been shown.
    pub fn last(&self) -> Option<&Canvas> {
        self.last.as_ref()
    }

    pub fn blit_count(&self) -> usize {
        self.blits
    }
}

impl Default for MemoryDisplay {
    fn default() -> Self {
        Self::new(OLED_WIDTH, OLED_HEIGHT)
    }
}

impl DisplaySink for MemoryDisplay {
    fn geometry(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn blit(&mut self, canvas: &Canvas) {
        self.last = Some(canvas.clone());
        self.blits += 1;
    }
}
