//! Core types and algorithms for watching a screen for a target color.
//!
//! This crate is intentionally small and capture-agnostic. It does *not*
//! depend on any screen-capture backend or image decoder: frames come in as
//! plain RGBA8 buffers.
//!
//! ## Pieces
//! - [`Rgb`], [`Tolerance`], [`Threshold`]: validated detection inputs.
//! - [`RawInputs`] -> [`DetectParams`]: text-field style inputs checked once
//!   per tick, failing with [`ValidationError`].
//! - [`ColorMatcher`] / [`matches`]: full-frame scan with per-channel bounds.
//! - [`DetectionDebouncer`]: run-length tracking of consecutive results.

mod color;
mod debounce;
mod frame;
mod logger;
mod matcher;
mod params;

pub use color::Rgb;
pub use debounce::{DetectionDebouncer, Observation};
pub use frame::{FrameError, RgbaFrame, RgbaFrameView};
pub use matcher::{find_match, matches, ColorMatcher};
pub use params::{DetectParams, RawInputs, Threshold, Tolerance, ValidationError};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
