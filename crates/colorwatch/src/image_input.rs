//! Helpers for running detection on image files and `image` buffers.

use std::path::Path;

use colorwatch_core::{FrameError, Rgb, RgbaFrame};

#[derive(thiserror::Error, Debug)]
pub enum ImageInputError {
    #[error(transparent)]
    Image(#[from] ::image::ImageError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("pixel ({x}, {y}) is outside the {width}x{height} image")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

/// Copy an `image::RgbaImage` into a core frame.
pub fn frame_from_rgba(img: &::image::RgbaImage) -> Result<RgbaFrame, FrameError> {
    RgbaFrame::from_raw(img.width() as usize, img.height() as usize, img.as_raw().clone())
}

/// Decode any supported image file into an RGBA frame.
pub fn load_frame(path: impl AsRef<Path>) -> Result<RgbaFrame, ImageInputError> {
    let img = ::image::open(path)?.to_rgba8();
    Ok(frame_from_rgba(&img)?)
}

/// Color of one pixel of an image file.
pub fn pick_from_image(path: impl AsRef<Path>, x: u32, y: u32) -> Result<Rgb, ImageInputError> {
    let img = ::image::open(path)?.to_rgb8();
    if x >= img.width() || y >= img.height() {
        return Err(ImageInputError::OutOfBounds {
            x,
            y,
            width: img.width(),
            height: img.height(),
        });
    }
    Ok(Rgb::from(img.get_pixel(x, y).0))
}
