//! Aspect-preserving placement of a source frame on the canvas.

use crate::error::RenderError;

/// Where the scaled frame lands on the canvas.
///
/// The rectangle `offset..offset + scaled` always lies inside the canvas;
/// everything around it is letterbox/pillarbox margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalePlan {
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl ScalePlan {
    /// Fit a `source_width` x `source_height` frame into the canvas.
    ///
    /// Integer cross-multiplication decides which axis limits the fit, so a
    /// 640x480 frame on a 128x32 canvas is height-limited (42x32 at x=43)
    /// rather than overflowing vertically. Canvas dimensions below 1 are
    /// treated as 1; the scaled size is at least 1x1.
    ///
    /// # Errors
    /// * `RenderError::InvalidFrame` - If either source dimension is zero
    pub fn new(
        source_width: u32,
        source_height: u32,
        canvas_width: u32,
        canvas_height: u32,
    ) -> Result<Self, RenderError> {
        if source_width == 0 || source_height == 0 {
            return Err(RenderError::InvalidFrame {
                width: source_width,
                height: source_height,
                len: 0,
            });
        }

        let canvas_width = canvas_width.max(1);
        let canvas_height = canvas_height.max(1);

        let sw = source_width as u64;
        let sh = source_height as u64;
        let cw = canvas_width as u64;
        let ch = canvas_height as u64;

        // source aspect > canvas aspect, i.e. sw/sh > cw/ch
        let source_is_wider = sw * ch > sh * cw;

        let (scaled_width, scaled_height) = if source_is_wider {
            let h = (cw * sh / sw).clamp(1, ch);
            (canvas_width, h as u32)
        } else {
            let w = (ch * sw / sh).clamp(1, cw);
            (w as u32, canvas_height)
        };

        Ok(Self {
            scaled_width,
            scaled_height,
            offset_x: (canvas_width - scaled_width) / 2,
            offset_y: (canvas_height - scaled_height) / 2,
            canvas_width,
            canvas_height,
        })
    }

    /// Number of destination pixels inside the scaled rectangle.
    pub fn area(&self) -> usize {
        self.scaled_width as usize * self.scaled_height as usize
    }
}
