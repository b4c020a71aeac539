//! Byte-packed monochrome bitmap matching the display.
//!
//! Rows are `ceil(width / 8)` bytes, most significant bit first, the layout
//! SSD1306-class panels take in horizontal addressing mode.

use crate::error::RenderError;

use super::dither::DecisionGrid;
use super::scale::ScalePlan;

/// Packed one-bit canvas. A set bit is a lit pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    row_bytes: usize,
    bytes: Vec<u8>,
}

impl Canvas {
    /// Bytes needed for a `width` x `height` canvas.
    pub fn required_bytes(width: u32, height: u32) -> usize {
        (width as usize).div_ceil(8).saturating_mul(height as usize)
    }

    /// Allocate a zeroed (all dark) canvas.
    ///
    /// `budget` caps the allocation in bytes, modelling the heap left on the
    /// device. Both an exceeded budget and a failed reservation report
    /// `OutOfMemory`.
    ///
    /// # Errors
    /// * `RenderError::OutOfMemory` - If the buffer cannot be allocated
    pub fn allocate(width: u32, height: u32, budget: Option<usize>) -> Result<Self, RenderError> {
        let requested = Self::required_bytes(width, height);
        if budget.is_some_and(|limit| requested > limit) {
            return Err(RenderError::OutOfMemory { requested });
        }

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(requested)
            .map_err(|_| RenderError::OutOfMemory { requested })?;
        bytes.resize(requested, 0);

        Ok(Self {
            width,
            height,
            row_bytes: (width as usize).div_ceil(8),
            bytes,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed buffer, ready to send to the panel.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Set or clear the pixel at (x, y). Out-of-range writes are ignored.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, on: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y as usize * self.row_bytes + x as usize / 8;
        let mask = 0x80u8 >> (x % 8);
        if on {
            self.bytes[index] |= mask;
        } else {
            self.bytes[index] &= !mask;
        }
    }

    /// Whether the pixel at (x, y) is lit; `false` outside the canvas.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y as usize * self.row_bytes + x as usize / 8;
        self.bytes[index] & (0x80u8 >> (x % 8)) != 0
    }

    pub fn lit_pixels(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }
}

/// Allocate `len` copies of `value`, reporting failure instead of aborting.
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>, RenderError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| RenderError::OutOfMemory { requested: len })?;
    buf.resize(len, value);
    Ok(buf)
}

/// Byte length of a one-byte-per-pixel grid covering the scaled rectangle.
pub(crate) fn grid_len(width: u32, height: u32) -> Result<usize, RenderError> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or(RenderError::OutOfMemory {
            requested: usize::MAX,
        })
}

/// Bytes one render cycle holds at its peak: the brightness grid and the
/// decision grid (one byte per scaled pixel each) plus the packed canvas.
pub fn working_set_bytes(plan: &ScalePlan) -> usize {
    let grid = (plan.scaled_width as usize).saturating_mul(plan.scaled_height as usize);
    grid.saturating_mul(2)
        .saturating_add(Canvas::required_bytes(plan.canvas_width, plan.canvas_height))
}

/// Check a cycle's working set against `budget` before anything is allocated.
///
/// Returns the share of the budget left for the canvas once both grids are
/// accounted for.
///
/// # Errors
/// * `RenderError::OutOfMemory` - If the working set exceeds the budget
pub fn reserve_working_set(
    plan: &ScalePlan,
    budget: Option<usize>,
) -> Result<Option<usize>, RenderError> {
    let Some(budget) = budget else {
        return Ok(None);
    };
    let requested = working_set_bytes(plan);
    if requested > budget {
        return Err(RenderError::OutOfMemory { requested });
    }
    let canvas = Canvas::required_bytes(plan.canvas_width, plan.canvas_height);
    Ok(Some(budget - (requested - canvas)))
}

/// Write `decisions` into a fresh canvas at the plan's offset.
///
/// Margins outside the scaled rectangle stay dark. Allocation happens before
/// any pixel is written, so a failure leaves nothing half-drawn.
///
/// # Errors
/// * `RenderError::OutOfMemory` - If the canvas cannot be allocated
pub fn pack(
    decisions: &DecisionGrid,
    plan: &ScalePlan,
    budget: Option<usize>,
) -> Result<Canvas, RenderError> {
    let mut canvas = Canvas::allocate(plan.canvas_width, plan.canvas_height, budget)?;

    let width = decisions.width().min(plan.scaled_width);
    let height = decisions.height().min(plan.scaled_height);
    for y in 0..height {
        for x in 0..width {
            if decisions.get(x, y) {
                canvas.set_pixel(plan.offset_x + x, plan.offset_y + y, true);
            }
        }
    }

    Ok(canvas)
}
