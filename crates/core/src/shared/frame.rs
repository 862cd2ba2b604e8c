use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ndarray::{ArrayView2, ShapeBuilder};
use thiserror::Error;

use crate::camera::domain::orientation::ImageOrientation;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResourceError {
    #[error("frame has no pixels ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("failed to lock pixel buffer: {0}")]
    LockFailed(String),
    #[error("luma plane is malformed: {0}")]
    MalformedPlane(String),
}

/// A camera pixel buffer whose luma (Y) plane must be pinned before reading.
///
/// Every successful `lock_luma` must be balanced by exactly one
/// `unlock_luma`; use [`PlaneAccess`] rather than calling these directly.
pub trait PixelBuffer: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn lock_luma(&self) -> Result<LumaPlane<'_>, ResourceError>;
    fn unlock_luma(&self);
}

/// Borrowed luma bytes, rows `bytes_per_row` apart.
#[derive(Clone, Copy, Debug)]
pub struct LumaPlane<'a> {
    data: &'a [u8],
    bytes_per_row: usize,
}

impl<'a> LumaPlane<'a> {
    pub fn new(data: &'a [u8], bytes_per_row: usize) -> Self {
        Self {
            data,
            bytes_per_row,
        }
    }

    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    /// `(height, width)` view honouring the row padding.
    pub fn view(&self, width: u32, height: u32) -> Result<ArrayView2<'a, u8>, ResourceError> {
        let (w, h) = (width as usize, height as usize);
        if self.bytes_per_row < w {
            return Err(ResourceError::MalformedPlane(format!(
                "row stride {} is narrower than width {w}",
                self.bytes_per_row
            )));
        }
        ArrayView2::from_shape((h, w).strides((self.bytes_per_row, 1)), self.data)
            .map_err(|e| ResourceError::MalformedPlane(e.to_string()))
    }
}

/// Scoped read access to a buffer's luma plane; unlocks on drop.
pub struct PlaneAccess<'a> {
    buffer: &'a dyn PixelBuffer,
    plane: LumaPlane<'a>,
}

impl<'a> PlaneAccess<'a> {
    pub fn acquire(buffer: &'a dyn PixelBuffer) -> Result<Self, ResourceError> {
        let plane = buffer.lock_luma()?;
        Ok(Self { buffer, plane })
    }

    pub fn plane(&self) -> LumaPlane<'a> {
        self.plane
    }
}

impl Drop for PlaneAccess<'_> {
    fn drop(&mut self) {
        self.buffer.unlock_luma();
    }
}

/// Owned single-plane 8-bit luma buffer.
#[derive(Debug)]
pub struct LumaBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    bytes_per_row: usize,
    outstanding_locks: AtomicUsize,
}

impl LumaBuffer {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self::with_row_stride(data, width, height, width as usize)
    }

    /// Buffer whose rows are `bytes_per_row` apart, as camera planes often
    /// pad rows for alignment.
    pub fn with_row_stride(data: Vec<u8>, width: u32, height: u32, bytes_per_row: usize) -> Self {
        debug_assert!(
            data.len() >= bytes_per_row * height as usize,
            "data length must cover height * bytes_per_row"
        );
        Self {
            data,
            width,
            height,
            bytes_per_row,
            outstanding_locks: AtomicUsize::new(0),
        }
    }

    pub fn uniform(width: u32, height: u32, luma: u8) -> Self {
        Self::new(vec![luma; width as usize * height as usize], width, height)
    }

    /// Number of locks not yet released.
    pub fn outstanding_locks(&self) -> usize {
        self.outstanding_locks.load(Ordering::SeqCst)
    }
}

impl PixelBuffer for LumaBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn lock_luma(&self) -> Result<LumaPlane<'_>, ResourceError> {
        self.outstanding_locks.fetch_add(1, Ordering::SeqCst);
        Ok(LumaPlane::new(&self.data, self.bytes_per_row))
    }

    fn unlock_luma(&self) {
        self.outstanding_locks.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One camera callback's worth of pixels, discarded after one evaluation.
#[derive(Clone)]
pub struct FrameSample {
    buffer: Arc<dyn PixelBuffer>,
    timestamp: Duration,
    index: usize,
    orientation: ImageOrientation,
}

impl FrameSample {
    pub fn new(
        buffer: Arc<dyn PixelBuffer>,
        timestamp: Duration,
        index: usize,
    ) -> Result<Self, ResourceError> {
        let (width, height) = (buffer.width(), buffer.height());
        if width == 0 || height == 0 {
            return Err(ResourceError::EmptyFrame { width, height });
        }
        Ok(Self {
            buffer,
            timestamp,
            index,
            orientation: ImageOrientation::Up,
        })
    }

    pub fn with_orientation(mut self, orientation: ImageOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn buffer(&self) -> &dyn PixelBuffer {
        &*self.buffer
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn orientation(&self) -> ImageOrientation {
        self.orientation
    }
}

impl std::fmt::Debug for FrameSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSample")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("timestamp", &self.timestamp)
            .field("index", &self.index)
            .field("orientation", &self.orientation)
            .finish()
    }
}
