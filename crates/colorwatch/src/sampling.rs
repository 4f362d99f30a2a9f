//! Per-tick detection: validate, copy frame, match, debounce, alert.

use std::fmt;
use std::time::{Duration, Instant};

use colorwatch_core::{
    ColorMatcher, DetectParams, DetectionDebouncer, RawInputs, RgbaFrame, ValidationError,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::alert::AlertController;
use crate::capture::FrameSource;

/// One tick per second.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// The detection readout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionStatus {
    /// No capture running.
    Off,
    /// The last tick could not run (invalid input, unreadable frame).
    Error,
    Observed { found: bool, count: u32 },
}

impl fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionStatus::Off => f.write_str("off"),
            DetectionStatus::Error => f.write_str("error"),
            DetectionStatus::Observed { found, count } => {
                let what = if *found { "found" } else { "not found" };
                write!(f, "{what} ({count} in a row)")
            }
        }
    }
}

/// Detection state owned by a running capture. Dropping it is what stops
/// the loop: the session only keeps one while its capture is `Active`.
pub struct SamplingLoop {
    buffer: RgbaFrame,
    debouncer: DetectionDebouncer,
    status: DetectionStatus,
    ticks: u64,
}

impl Default for SamplingLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplingLoop {
    pub fn new() -> Self {
        Self {
            buffer: RgbaFrame::default(),
            debouncer: DetectionDebouncer::new(),
            // nothing observed yet; the first tick replaces this
            status: DetectionStatus::Off,
            ticks: 0,
        }
    }

    pub fn status(&self) -> DetectionStatus {
        self.status
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn debouncer(&self) -> &DetectionDebouncer {
        &self.debouncer
    }

    /// Run one detection step against the source's current frame.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(tick = self.ticks)))]
    pub fn tick<S: FrameSource>(
        &mut self,
        inputs: &RawInputs,
        source: &mut S,
        alert: &mut AlertController,
    ) -> DetectionStatus {
        self.ticks += 1;

        let params = match validate(inputs, source) {
            Ok(params) => params,
            Err(e) => {
                log::debug!("tick skipped: {e}");
                return self.fail(alert);
            }
        };

        if let Err(e) = source.read_frame(&mut self.buffer) {
            log::warn!("frame read failed: {e}");
            return self.fail(alert);
        }

        let matcher = ColorMatcher::new(params.target, params.tolerance);
        let found = matcher.matches(&self.buffer.view());
        let obs = self.debouncer.observe(found);
        self.status = DetectionStatus::Observed {
            found,
            count: obs.count,
        };
        log::debug!("{}", self.status);

        if obs.reaches(params.threshold) {
            alert.set_alert(obs.result);
        }
        self.status
    }

    fn fail(&mut self, alert: &mut AlertController) -> DetectionStatus {
        self.debouncer.reset();
        self.status = DetectionStatus::Error;
        alert.set_alert(false);
        self.status
    }
}

/// Per-tick input check, including the live source's dimensions.
pub fn validate<S: FrameSource>(
    inputs: &RawInputs,
    source: &S,
) -> Result<DetectParams, ValidationError> {
    let params = inputs.parse()?;
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Err(ValidationError::EmptySource { width, height });
    }
    Ok(params)
}

/// Fixed-period pacing for a single-threaded loop.
///
/// Ticks never overlap: the caller runs a tick, then [`Ticker::settle`]
/// sleeps for the rest of the period. A tick that takes longer than the
/// period is counted as an overrun and the next one starts right away.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    overruns: u64,
    worst: Duration,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            overruns: 0,
            worst: Duration::ZERO,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn worst_tick(&self) -> Duration {
        self.worst
    }

    /// Finish a tick that started at `started`.
    pub fn settle(&mut self, started: Instant) {
        let elapsed = started.elapsed();
        if elapsed > self.worst {
            self.worst = elapsed;
        }
        if elapsed > self.period {
            self.overruns += 1;
            log::warn!(
                "tick took {:?}, longer than the {:?} period",
                elapsed,
                self.period
            );
        } else {
            std::thread::sleep(self.period - elapsed);
        }
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD)
    }
}
