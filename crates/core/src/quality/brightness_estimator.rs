use ndarray::s;

use crate::shared::constants::DEFAULT_SAMPLE_STRIDE;
use crate::shared::frame::{FrameSample, PlaneAccess, ResourceError};

/// Mean frame luma normalized to `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct BrightnessSample(f64);

impl BrightnessSample {
    /// Clamps into `[0, 1]`; NaN becomes 0.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Estimates brightness by averaging the luma plane on a sparse grid.
///
/// Only whole stride cells are sampled: with `stride = 10` a 25 px wide row
/// contributes columns 0 and 10. A frame smaller than one cell on either
/// axis has no samples and reports a brightness of 0.
#[derive(Clone, Debug)]
pub struct BrightnessEstimator {
    stride: usize,
}

impl BrightnessEstimator {
    pub fn new(stride: usize) -> Result<Self, &'static str> {
        if stride < 1 {
            return Err("sample stride must be >= 1");
        }
        Ok(Self { stride })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Mean of the grid samples over `255`. Trailing pixels that do not
    /// fill a whole stride cell are excluded.
    pub fn estimate(&self, frame: &FrameSample) -> Result<BrightnessSample, ResourceError> {
        let width = frame.width();
        let height = frame.height();
        let cols = width as usize / self.stride;
        let rows = height as usize / self.stride;
        let sample_count = cols * rows;
        if sample_count == 0 {
            return Ok(BrightnessSample::new(0.0));
        }

        let access = PlaneAccess::acquire(frame.buffer())?;
        let plane = access.plane().view(width, height)?;

        let step = self.stride as isize;
        let row_end = rows * self.stride;
        let col_end = cols * self.stride;
        let total: u64 = plane
            .slice(s![..row_end;step, ..col_end;step])
            .iter()
            .map(|&v| v as u64)
            .sum();

        Ok(BrightnessSample::new(
            total as f64 / sample_count as f64 / 255.0,
        ))
    }
}

impl Default for BrightnessEstimator {
    fn default() -> Self {
        Self {
            stride: DEFAULT_SAMPLE_STRIDE,
        }
    }
}
