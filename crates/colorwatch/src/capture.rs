//! Capture session lifecycle.
//!
//! `Idle -> Acquiring -> Active -> (Stopped | Terminated)`. Acquisition is
//! split into [`CaptureSession::begin_acquire`] and
//! [`CaptureSession::finish_acquire`] so the in-flight state is observable:
//! a start request while `Acquiring` or `Active` is refused, and a result
//! arriving after the request was cancelled is released and ignored.

use colorwatch_core::{FrameError, Rgb, RgbaFrame};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("capture request rejected: {0}")]
    Rejected(String),
    #[error("no display matches {0:?}")]
    NoSuchDisplay(String),
    #[error("capture backend failed: {0}")]
    Backend(String),
    #[error("live source has ended")]
    Ended,
    #[error("pixel ({x}, {y}) is outside the {width}x{height} frame")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// What to ask the display source provider for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    pub video_only: bool,
    /// Requested frames per second.
    pub frame_rate: u32,
    /// Keep the requesting surface itself out of the selection.
    pub exclude_self: bool,
    /// Preferred display by name; `None` picks the primary one.
    #[serde(default)]
    pub display: Option<String>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            video_only: true,
            frame_rate: 1,
            exclude_self: true,
            display: None,
        }
    }
}

/// A live frame source.
pub trait FrameSource {
    /// Current source dimensions; `(0, 0)` while no frame is available.
    fn dimensions(&self) -> (usize, usize);

    /// Copy the current frame into `buf`, resizing it to the source's
    /// current dimensions.
    fn read_frame(&mut self, buf: &mut RgbaFrame) -> Result<(), CaptureError>;

    /// True once the source stopped on its own (display gone, sharing
    /// revoked).
    fn has_ended(&self) -> bool;

    /// Release the source. Must be safe to call more than once.
    fn stop(&mut self);
}

/// Hands out live sources.
pub trait DisplaySourceProvider {
    type Source: FrameSource;

    fn request_capture(&mut self, options: &CaptureOptions) -> Result<Self::Source, CaptureError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Acquiring,
    Active,
    Stopped,
    Terminated,
}

impl CaptureState {
    /// States from which a new acquisition may begin.
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            CaptureState::Idle | CaptureState::Stopped | CaptureState::Terminated
        )
    }
}

pub struct CaptureSession<S: FrameSource> {
    state: CaptureState,
    source: Option<S>,
}

impl<S: FrameSource> Default for CaptureSession<S> {
    fn default() -> Self {
        Self {
            state: CaptureState::Idle,
            source: None,
        }
    }
}

impl<S: FrameSource> CaptureSession<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == CaptureState::Active
    }

    /// Enter `Acquiring`. Returns false (and changes nothing) while a
    /// request is in flight or a session is active.
    pub fn begin_acquire(&mut self) -> bool {
        if !self.state.can_start() {
            log::debug!("start ignored in state {:?}", self.state);
            return false;
        }
        self.state = CaptureState::Acquiring;
        true
    }

    /// Complete the acquisition started by [`begin_acquire`](Self::begin_acquire).
    ///
    /// `Ok(true)`: now `Active`. `Ok(false)`: the request had been cancelled
    /// and the late source was released. `Err`: back to `Idle`.
    pub fn finish_acquire(&mut self, result: Result<S, CaptureError>) -> Result<bool, CaptureError> {
        if self.state != CaptureState::Acquiring {
            if let Ok(mut late) = result {
                log::debug!("discarding source acquired after cancellation");
                late.stop();
            }
            return Ok(false);
        }
        match result {
            Ok(source) => {
                let (w, h) = source.dimensions();
                log::info!("capture started ({w}x{h})");
                self.source = Some(source);
                self.state = CaptureState::Active;
                Ok(true)
            }
            Err(e) => {
                self.state = CaptureState::Idle;
                Err(e)
            }
        }
    }

    /// Explicit stop. From `Active` this releases the source and returns
    /// true; an in-flight acquisition is cancelled (back to `Idle`, returns
    /// false). Any other state is left alone.
    pub fn stop(&mut self) -> bool {
        match self.state {
            CaptureState::Active => {
                self.release();
                self.state = CaptureState::Stopped;
                log::info!("capture stopped");
                true
            }
            CaptureState::Acquiring => {
                self.state = CaptureState::Idle;
                false
            }
            _ => false,
        }
    }

    /// Detect a source that ended by itself. Returns true exactly once, on
    /// the transition `Active -> Terminated`.
    pub fn check_terminated(&mut self) -> bool {
        let ended = self.state == CaptureState::Active
            && self.source.as_ref().is_some_and(|s| s.has_ended());
        if ended {
            self.release();
            self.state = CaptureState::Terminated;
            log::info!("capture source ended");
        }
        ended
    }

    /// The live source, only while `Active`.
    pub fn source_mut(&mut self) -> Option<&mut S> {
        if self.state == CaptureState::Active {
            self.source.as_mut()
        } else {
            None
        }
    }

    fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.stop();
        }
    }
}

impl<S: FrameSource> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Read the color of one pixel of the source's current frame.
pub fn sample_pixel<S: FrameSource>(source: &mut S, x: usize, y: usize) -> Result<Rgb, CaptureError> {
    let mut frame = RgbaFrame::default();
    source.read_frame(&mut frame)?;
    let px = frame.view().pixel(x, y).ok_or(CaptureError::OutOfBounds {
        x,
        y,
        width: frame.width,
        height: frame.height,
    })?;
    Ok(Rgb::new(px[0], px[1], px[2]))
}
