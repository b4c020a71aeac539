//! Adaptive one-bit thresholding with position-derived jitter.
//!
//! The jitter is a pure function of pixel position, so the same frame
//! always produces the same bitmap. No random source is involved.

use crate::error::RenderError;

use super::canvas::try_filled;
use super::luminance::BrightnessGrid;

/// Default distance from the global average below which jitter applies.
pub const DEFAULT_JITTER_WINDOW: u8 = 20;

/// Default period of the `(x + y) mod period` jitter ramp.
pub const DEFAULT_JITTER_PERIOD: u32 = 30;

/// Per-pixel black/white decision maker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ditherer {
    /// Samples closer than this to the global average get jittered
    pub jitter_window: u8,
    /// Period of the diagonal jitter ramp; 0 disables jitter
    pub jitter_period: u32,
}

impl Default for Ditherer {
    fn default() -> Self {
        Self {
            jitter_window: DEFAULT_JITTER_WINDOW,
            jitter_period: DEFAULT_JITTER_PERIOD,
        }
    }
}

impl Ditherer {
    /// Decide whether the pixel at (x, y) is lit.
    ///
    /// The local threshold is the midpoint of `sample` and `global_average`.
    /// In near-uniform regions (`|sample - global_average| < jitter_window`)
    /// the sample is raised by `(x + y) mod jitter_period` before comparing,
    /// which breaks flat areas into a diagonal texture.
    #[inline]
    pub fn threshold(&self, sample: u8, global_average: u8, x: u32, y: u32) -> bool {
        let sample_w = sample as u32;
        let local = (global_average as u32 + sample_w) / 2;

        if sample.abs_diff(global_average) < self.jitter_window && self.jitter_period > 0 {
            let jitter = ((x as u64 + y as u64) % self.jitter_period as u64) as u32;
            sample_w + jitter > local
        } else {
            sample_w > local
        }
    }
}

/// One-bit decisions for the scaled rectangle, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionGrid {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl DecisionGrid {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether (x, y) is lit; `false` outside the grid.
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits
            .get(y as usize * self.width as usize + x as usize)
            .copied()
            .unwrap_or(false)
    }

    pub fn lit_count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }
}

/// Threshold every sample of `grid`.
///
/// When the grid was sampled in blocks, the jitter position is the block's
/// top-left corner so each block stays uniform.
///
/// # Errors
/// * `RenderError::OutOfMemory` - If the decision grid cannot be allocated
pub fn dither(
    grid: &BrightnessGrid,
    ditherer: &Ditherer,
) -> Result<DecisionGrid, RenderError> {
    let width = grid.width();
    let block = grid.block().max(1);
    let average = grid.global_average();

    let mut bits = try_filled(grid.samples().len(), false)?;
    for (i, (&sample, bit)) in grid.samples().iter().zip(bits.iter_mut()).enumerate() {
        let x = (i % width as usize) as u32;
        let y = (i / width as usize) as u32;
        let ax = x - x % block;
        let ay = y - y % block;
        *bit = ditherer.threshold(sample, average, ax, ay);
    }

    Ok(DecisionGrid {
        width,
        height: grid.height(),
        bits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bright_sample_is_lit() {
        let d = Ditherer::default();
        assert!(d.threshold(200, 100, 0, 0));
    }

    #[test]
    fn test_dark_sample_is_dark() {
        let d = Ditherer::default();
        assert!(!d.threshold(20, 100, 7, 3));
    }

    #[test]
    fn test_far_from_average_ignores_position() {
        let d = Ditherer::default();
        for x in 0..60 {
            assert!(!d.threshold(50, 100, x, 0));
            assert!(d.threshold(150, 100, x, 0));
        }
    }

    #[test]
    fn test_flat_region_jitter_pattern() {
        // sample == average: local threshold equals the sample, so only a
        // positive jitter lights the pixel
        let d = Ditherer::default();
        assert!(!d.threshold(100, 100, 0, 0));
        assert!(d.threshold(100, 100, 1, 0));
        assert!(d.threshold(100, 100, 0, 29));
        assert!(!d.threshold(100, 100, 15, 15));
    }

    #[test]
    fn test_near_average_dark_side_can_flip() {
        // 95 vs 100: local = 97; jitter of 3 or more lifts 95 above it
        let d = Ditherer::default();
        assert!(!d.threshold(95, 100, 2, 0));
        assert!(d.threshold(95, 100, 3, 0));
    }

    #[test]
    fn test_zero_period_disables_jitter() {
        let d = Ditherer {
            jitter_window: 20,
            jitter_period: 0,
        };
        assert!(!d.threshold(100, 100, 5, 5));
    }

    #[test]
    fn test_zero_window_disables_jitter() {
        let d = Ditherer {
            jitter_window: 0,
            jitter_period: 30,
        };
        assert!(!d.threshold(100, 100, 5, 5));
    }

    #[test]
    fn test_no_overflow_at_extremes() {
        let d = Ditherer::default();
        assert!(!d.threshold(255, 255, 0, 0));
        assert!(d.threshold(255, 250, u32::MAX, u32::MAX));
    }
}
