//! Braille preview of the canvas on a text terminal.
//!
//! Each braille character represents a 2x4 dot matrix, so a 128x32 canvas
//! fits in 64x8 character cells.

use std::io::Write;

use super::DisplaySink;
use crate::render::Canvas;

/// Braille base character (U+2800, empty braille pattern).
pub const BRAILLE_BASE: char = '\u{2800}';

/// Convert a 2x4 boolean grid to a braille character.
///
/// The bit positions are:
/// ```text
/// [0,0]=1   [1,0]=8
/// [0,1]=2   [1,1]=16
/// [0,2]=4   [1,2]=32
/// [0,3]=64  [1,3]=128
/// ```
pub fn grid_to_braille(grid: [[bool; 4]; 2]) -> char {
    const BITS: [[u8; 4]; 2] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];

    let mut code = 0u32;
    for (column, bits) in grid.iter().zip(BITS.iter()) {
        for (&dot, &bit) in column.iter().zip(bits.iter()) {
            if dot {
                code |= bit as u32;
            }
        }
    }
    char::from_u32(BRAILLE_BASE as u32 + code).unwrap_or(BRAILLE_BASE)
}

/// Render the canvas as rows of braille characters.
pub fn canvas_to_braille(canvas: &Canvas) -> Vec<String> {
    let cols = canvas.width().div_ceil(2);
    let rows = canvas.height().div_ceil(4);

    (0..rows)
        .map(|cy| {
            (0..cols)
                .map(|cx| {
                    let mut grid = [[false; 4]; 2];
                    for (dx, column) in grid.iter_mut().enumerate() {
                        for (dy, dot) in column.iter_mut().enumerate() {
                            *dot = canvas.pixel(cx * 2 + dx as u32, cy * 4 + dy as u32);
                        }
                    }
                    grid_to_braille(grid)
                })
                .collect()
        })
        .collect()
}

/// Display that draws each canvas as braille text into a writer.
///
/// Consecutive blits are separated by a blank line unless `redraw` is set,
/// in which case the cursor is moved back up so the preview updates in place.
pub struct TerminalDisplay<W: Write> {
    out: W,
    width: u32,
    height: u32,
    redraw: bool,
    drawn_rows: usize,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W, width: u32, height: u32) -> Self {
        Self {
            out,
            width,
            height,
            redraw: false,
            drawn_rows: 0,
        }
    }

    /// Overwrite the previous preview instead of appending below it.
    pub fn with_redraw(mut self, redraw: bool) -> Self {
        self.redraw = redraw;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_canvas(&mut self, canvas: &Canvas) -> std::io::Result<()> {
        let rows = canvas_to_braille(canvas);
        let mut output = String::new();

        if self.drawn_rows > 0 {
            if self.redraw {
                output.push_str(&format!("\x1b[{}A", self.drawn_rows));
            } else {
                output.push('\n');
            }
        }
        for row in &rows {
            output.push_str(row);
            output.push('\n');
        }

        self.out.write_all(output.as_bytes())?;
        self.out.flush()?;
        self.drawn_rows = rows.len();
        Ok(())
    }
}

impl<W: Write> DisplaySink for TerminalDisplay<W> {
    fn geometry(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn blit(&mut self, canvas: &Canvas) {
        if let Err(e) = self.write_canvas(canvas) {
            log::warn!("Terminal display write failed: {}", e);
        }
    }
}
