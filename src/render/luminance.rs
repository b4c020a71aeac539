//! Decode-free brightness estimation from compressed frame bytes.
//!
//! Full JPEG decoding is too expensive for the target, so brightness is
//! approximated by reading the compressed stream itself. Each destination
//! pixel is mapped nearest-neighbour into source space, the source position
//! is turned into a byte offset, and three consecutive bytes are averaged.
//! The result is a plausible silhouette, not a colorimetric transform.

use crate::camera::Frame;
use crate::error::RenderError;

use super::canvas::{grid_len, try_filled};
use super::scale::ScalePlan;

/// Default byte stride for the whole-frame brightness baseline.
pub const DEFAULT_AVERAGE_STRIDE: usize = 100;

/// Tuning for [`estimate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateOptions {
    /// Sample every Nth byte of the frame for the global average
    pub average_stride: usize,
    /// Estimate one pixel per `pixel_stride` x `pixel_stride` block and
    /// replicate it across the block
    pub pixel_stride: u32,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            average_stride: DEFAULT_AVERAGE_STRIDE,
            pixel_stride: 1,
        }
    }
}

/// Estimated brightness for every pixel of the scaled rectangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrightnessGrid {
    width: u32,
    height: u32,
    block: u32,
    samples: Vec<u8>,
    global_average: u8,
}

impl BrightnessGrid {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Block edge length the grid was sampled with (1 = every pixel).
    pub fn block(&self) -> u32 {
        self.block
    }

    /// Whole-frame baseline used for adaptive thresholding.
    pub fn global_average(&self) -> u8 {
        self.global_average
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Brightness at (x, y), or `None` outside the grid.
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.samples
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

/// Mean of every `stride`th byte, starting at offset 0.
///
/// A stride of 0 is treated as 1. Returns 0 for empty input.
pub fn global_average(data: &[u8], stride: usize) -> u8 {
    let stride = stride.max(1);
    let (sum, count) = data
        .iter()
        .step_by(stride)
        .fold((0u64, 0u64), |(sum, count), &b| (sum + b as u64, count + 1));
    if count == 0 {
        0
    } else {
        (sum / count) as u8
    }
}

/// Byte offset for a source-space position: row-major pixel index wrapped
/// to the stream length.
///
/// The scaled width only enters through the nearest-neighbour mapping that
/// produced `src_x`; it is deliberately not a parameter here, so two
/// destination pixels that land on the same source position always read the
/// same bytes whatever the canvas size.
#[inline]
pub fn source_offset(src_x: u32, src_y: u32, source_width: u32, len: usize) -> usize {
    let index = src_y as u64 * source_width as u64 + src_x as u64;
    (index % len.max(1) as u64) as usize
}

/// Average of the byte at `offset` and its two successors, wrapping at the
/// end of the stream.
#[inline]
pub fn smoothed_byte(data: &[u8], offset: usize) -> u8 {
    let len = data.len();
    if len == 0 {
        return 0;
    }
    let a = data[offset % len] as u16;
    let b = data[(offset + 1) % len] as u16;
    let c = data[(offset + 2) % len] as u16;
    ((a + b + c) / 3) as u8
}

/// Estimate brightness for each pixel of `plan`'s scaled rectangle.
///
/// # Arguments
/// * `frame` - Compressed frame from the sensor
/// * `plan` - Placement computed for this frame
/// * `options` - Average stride and destination pixel stride
///
/// # Returns
/// A grid of `plan.scaled_width` x `plan.scaled_height` samples.
///
/// # Errors
/// * `RenderError::InvalidFrame` - If the frame has no bytes or zero size
/// * `RenderError::OutOfMemory` - If the grid cannot be allocated
pub fn estimate(
    frame: &Frame,
    plan: &ScalePlan,
    options: &EstimateOptions,
) -> Result<BrightnessGrid, RenderError> {
    let data = frame.data();
    if data.is_empty() || frame.width() == 0 || frame.height() == 0 {
        return Err(RenderError::InvalidFrame {
            width: frame.width(),
            height: frame.height(),
            len: data.len(),
        });
    }

    let width = plan.scaled_width;
    let height = plan.scaled_height;
    let block = options.pixel_stride.max(1);
    let source_width = frame.width();
    let source_height = frame.height();

    let mut samples = try_filled(grid_len(width, height)?, 0u8)?;

    for by in (0..height).step_by(block as usize) {
        let src_y = (by as u64 * source_height as u64 / height as u64) as u32;
        for bx in (0..width).step_by(block as usize) {
            let src_x = (bx as u64 * source_width as u64 / width as u64) as u32;
            let offset = source_offset(src_x, src_y, source_width, data.len());
            let sample = smoothed_byte(data, offset);

            for y in by..(by + block).min(height) {
                let row = y as usize * width as usize;
                for x in bx..(bx + block).min(width) {
                    samples[row + x as usize] = sample;
                }
            }
        }
    }

    Ok(BrightnessGrid {
        width,
        height,
        block,
        samples,
        global_average: global_average(data, options.average_stride),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PixelFormat;

    fn frame(data: Vec<u8>, width: u32, height: u32) -> Frame {
        Frame::new(data, width, height, PixelFormat::Jpeg).unwrap()
    }

    #[test]
    fn test_global_average_every_byte() {
        assert_eq!(global_average(&[10, 20, 30], 1), 20);
    }

    #[test]
    fn test_global_average_strided() {
        // picks indices 0, 2, 4
        assert_eq!(global_average(&[100, 0, 200, 0, 0], 2), 100);
    }

    #[test]
    fn test_global_average_zero_stride_and_empty() {
        assert_eq!(global_average(&[50, 150], 0), 100);
        assert_eq!(global_average(&[], 10), 0);
    }

    #[test]
    fn test_smoothed_byte_wraps() {
        let data = [30, 60, 90];
        assert_eq!(smoothed_byte(&data, 0), 60);
        // offset 2 reads 90, 30, 60
        assert_eq!(smoothed_byte(&data, 2), 60);
        assert_eq!(smoothed_byte(&[255], 0), 255);
    }

    #[test]
    fn test_source_offset_wraps_to_length() {
        assert_eq!(source_offset(3, 2, 10, 1000), 23);
        assert_eq!(source_offset(3, 2, 10, 20), 3);
    }

    #[test]
    fn test_estimate_grid_matches_plan() {
        let f = frame(vec![128; 500], 640, 480);
        let plan = ScalePlan::new(640, 480, 128, 32).unwrap();
        let grid = estimate(&f, &plan, &EstimateOptions::default()).unwrap();
        assert_eq!(grid.width(), 42);
        assert_eq!(grid.height(), 32);
        assert_eq!(grid.samples().len(), 42 * 32);
        assert!(grid.samples().iter().all(|&s| s == 128));
        assert_eq!(grid.global_average(), 128);
    }

    #[test]
    fn test_estimate_nearest_neighbour_mapping() {
        // 4x1 source, 4x1 canvas: each destination pixel reads its own byte
        // plus two successors
        let f = frame(vec![0, 30, 60, 90], 4, 1);
        let plan = ScalePlan::new(4, 1, 4, 1).unwrap();
        let grid = estimate(&f, &plan, &EstimateOptions::default()).unwrap();
        assert_eq!(grid.samples(), &[30, 60, 50, 40]);
    }

    #[test]
    fn test_estimate_block_replication() {
        let data: Vec<u8> = (0..=255).collect();
        let f = frame(data, 16, 16);
        let plan = ScalePlan::new(16, 16, 8, 8).unwrap();
        let options = EstimateOptions {
            pixel_stride: 2,
            ..EstimateOptions::default()
        };
        let grid = estimate(&f, &plan, &options).unwrap();
        assert_eq!(grid.block(), 2);
        for by in (0..8).step_by(2) {
            for bx in (0..8).step_by(2) {
                let anchor = grid.get(bx, by).unwrap();
                assert_eq!(grid.get(bx + 1, by), Some(anchor));
                assert_eq!(grid.get(bx, by + 1), Some(anchor));
                assert_eq!(grid.get(bx + 1, by + 1), Some(anchor));
            }
        }
    }

    #[test]
    fn test_estimate_block_clipped_at_edge() {
        let f = frame(vec![7; 64], 5, 5);
        let plan = ScalePlan::new(5, 5, 5, 5).unwrap();
        let options = EstimateOptions {
            pixel_stride: 2,
            ..EstimateOptions::default()
        };
        let grid = estimate(&f, &plan, &options).unwrap();
        assert_eq!(grid.samples().len(), 25);
        assert_eq!(grid.get(4, 4), Some(7));
        assert_eq!(grid.get(5, 0), None);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let data: Vec<u8> = (0..2000u32).map(|i| (i * 37 % 251) as u8).collect();
        let f = frame(data, 320, 240);
        let plan = ScalePlan::new(320, 240, 128, 32).unwrap();
        let a = estimate(&f, &plan, &EstimateOptions::default()).unwrap();
        let b = estimate(&f, &plan, &EstimateOptions::default()).unwrap();
        assert_eq!(a, b);
    }
}
