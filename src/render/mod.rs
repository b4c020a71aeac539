//! Frame-to-bitmap rendering stages.
//!
//! A compressed frame goes through four stages before it reaches the
//! display:
//!
//! 1. **Scale planning** - fit the source aspect ratio into the canvas
//! 2. **Luminance estimation** - approximate brightness from compressed bytes
//! 3. **Dithering** - adaptive threshold with deterministic jitter
//! 4. **Packing** - write bits into an MSB-first byte canvas

mod canvas;
mod dither;
mod luminance;
mod scale;

pub use canvas::{pack, reserve_working_set, working_set_bytes, Canvas};
pub use dither::{dither, DecisionGrid, Ditherer, DEFAULT_JITTER_PERIOD, DEFAULT_JITTER_WINDOW};
pub use luminance::{
    estimate, global_average, smoothed_byte, source_offset, BrightnessGrid, EstimateOptions,
    DEFAULT_AVERAGE_STRIDE,
};
pub use scale::ScalePlan;
