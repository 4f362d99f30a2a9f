/// Errors from building a frame out of a raw buffer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid RGBA buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },

    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct RgbaFrameView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major RGBA8, len = w*h*4
}

impl RgbaFrameView<'_> {
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        self.data.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Owned RGBA8 frame. Reused across ticks: [`RgbaFrame::resize`] keeps the
/// allocation when dimensions shrink or stay the same.
#[derive(Clone, Debug, Default)]
pub struct RgbaFrame {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

fn rgba_len(width: usize, height: usize) -> Result<usize, FrameError> {
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(4))
        .ok_or(FrameError::InvalidDimensions { width, height })
}

impl RgbaFrame {
    pub fn new(width: usize, height: usize) -> Result<Self, FrameError> {
        let len = rgba_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Wrap an existing RGBA8 buffer.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, FrameError> {
        let expected = rgba_len(width, height)?;
        if data.len() != expected {
            return Err(FrameError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Set new dimensions, zeroing the contents.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), FrameError> {
        let len = rgba_len(width, height)?;
        self.data.clear();
        self.data.resize(len, 0);
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Copy `src` (RGBA8, same layout) into this frame, resizing first.
    pub fn copy_from(&mut self, width: usize, height: usize, src: &[u8]) -> Result<(), FrameError> {
        let expected = rgba_len(width, height)?;
        if src.len() != expected {
            return Err(FrameError::InvalidBuffer {
                expected,
                got: src.len(),
            });
        }
        self.data.clear();
        self.data.extend_from_slice(src);
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn view(&self) -> RgbaFrameView<'_> {
        RgbaFrameView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    pub fn put_pixel(&mut self, x: usize, y: usize, px: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y * self.width + x) * 4;
        self.data[i..i + 4].copy_from_slice(&px);
    }

    /// Fill every pixel with one color.
    pub fn fill(&mut self, px: [u8; 4]) {
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }
}
