//! Watch the screen for a target color and raise a debounced alert.
//!
//! This crate provides:
//! - re-exports of the capture-agnostic `colorwatch-core` types,
//! - the session pieces: [`AlertController`], [`CaptureSession`],
//!   [`SamplingLoop`] and the owning [`Monitor`],
//! - best-effort preference persistence and a JSON run config,
//! - (feature `image`) helpers to check image files,
//! - (feature `screen`) an `xcap`-backed display source.
//!
//! ## Quickstart
//!
//! ```no_run
//! # #[cfg(feature = "screen")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use colorwatch::prefs::MemoryPreferences;
//! use colorwatch::screen::XcapProvider;
//! use colorwatch::{AlertCapability, CaptureOptions, Monitor, Ticker};
//!
//! let mut monitor = Monitor::new(
//!     XcapProvider::new(),
//!     MemoryPreferences::new(),
//!     AlertCapability::detect(),
//!     CaptureOptions::default(),
//! );
//! monitor.set_target_color("#ff0000");
//! monitor.set_threshold("3");
//! monitor.start()?;
//! monitor.run(&mut Ticker::default(), Some(10), |_, status| {
//!     println!("{status}");
//!     true
//! });
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "screen"))]
//! # fn main() {}
//! ```

pub use colorwatch_core as core;

pub mod alert;
pub mod capture;
pub mod io;
pub mod prefs;
pub mod sampling;
pub mod session;

#[cfg(feature = "image")]
pub mod image_input;

#[cfg(feature = "screen")]
pub mod screen;

pub use alert::{AlertCapability, AlertController, AlertError, AlertSignal, AlertToggle, Permission};
pub use capture::{
    CaptureError, CaptureOptions, CaptureSession, CaptureState, DisplaySourceProvider, FrameSource,
};
pub use colorwatch_core::{DetectParams, RawInputs, Rgb, RgbaFrame, Threshold, Tolerance};
pub use io::{ConfigError, MonitorConfig};
pub use sampling::{DetectionStatus, SamplingLoop, Ticker, DEFAULT_PERIOD};
pub use session::{Monitor, MonitorError, RunSummary};
