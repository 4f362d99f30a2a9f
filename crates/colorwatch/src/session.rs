//! The watch session: one owned object holding capture, detection, alert
//! and preference state.

use std::time::Instant;

use colorwatch_core::{RawInputs, Rgb};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::alert::{AlertCapability, AlertController, AlertError};
use crate::capture::{
    sample_pixel, CaptureError, CaptureOptions, CaptureSession, CaptureState,
    DisplaySourceProvider, FrameSource,
};
use crate::prefs::{self, keys, PreferenceStore};
use crate::sampling::{DetectionStatus, SamplingLoop, Ticker};

#[derive(thiserror::Error, Debug)]
pub enum MonitorError {
    #[error("failed to start capture: {0}")]
    Acquisition(#[from] CaptureError),
    #[error(transparent)]
    Alert(#[from] AlertError),
}

/// Outcome of [`Monitor::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub overruns: u64,
    /// Capture state when the loop returned.
    pub final_state: CaptureState,
}

pub struct Monitor<P: DisplaySourceProvider, St: PreferenceStore> {
    provider: P,
    options: CaptureOptions,
    capture: CaptureSession<P::Source>,
    sampling: Option<SamplingLoop>,
    alert: AlertController,
    inputs: RawInputs,
    prefs: St,
}

impl<P: DisplaySourceProvider, St: PreferenceStore> Monitor<P, St> {
    /// Build a session, restoring inputs and the notification toggle from
    /// `prefs`.
    pub fn new(provider: P, prefs: St, capability: AlertCapability, options: CaptureOptions) -> Self {
        let inputs = prefs::load_inputs(&prefs, RawInputs::default());
        let mut alert = AlertController::new(capability);
        alert.restore_notifications(prefs::load_notify(&prefs));
        Self {
            provider,
            options,
            capture: CaptureSession::new(),
            sampling: None,
            alert,
            inputs,
            prefs,
        }
    }

    pub fn inputs(&self) -> &RawInputs {
        &self.inputs
    }

    pub fn alert(&self) -> &AlertController {
        &self.alert
    }

    pub fn prefs(&self) -> &St {
        &self.prefs
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    /// Whether the periodic detection loop exists.
    pub fn is_sampling(&self) -> bool {
        self.sampling.is_some()
    }

    pub fn status(&self) -> DetectionStatus {
        self.sampling
            .as_ref()
            .map_or(DetectionStatus::Off, SamplingLoop::status)
    }

    pub fn set_target_color(&mut self, value: &str) {
        self.inputs.target_color = value.to_string();
        prefs::write_pref(&mut self.prefs, keys::TARGET_COLOR, value);
    }

    pub fn set_tolerance(&mut self, value: &str) {
        self.inputs.tolerance = value.to_string();
        prefs::write_pref(&mut self.prefs, keys::TOLERANCE, value);
    }

    pub fn set_threshold(&mut self, value: &str) {
        self.inputs.threshold = value.to_string();
        prefs::write_pref(&mut self.prefs, keys::THRESHOLD, value);
    }

    /// Flip the "notify on detection" toggle. The flag is persisted only
    /// when the change took effect; on error the toggle is off.
    pub fn set_alert_enabled(&mut self, enabled: bool) -> Result<(), MonitorError> {
        if enabled {
            if let Err(e) = self.alert.enable_notifications() {
                log::warn!("notifications stay off: {e}");
                return Err(e.into());
            }
        } else {
            self.alert.disable_notifications();
        }
        let flag = if self.alert.notifications_enabled() { "1" } else { "0" };
        prefs::write_pref(&mut self.prefs, keys::NOTIFY, flag);
        Ok(())
    }

    /// Request a live source and start sampling.
    ///
    /// `Ok(false)` when a capture is already starting or running; nothing
    /// is requested in that case.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn start(&mut self) -> Result<bool, MonitorError> {
        if !self.capture.begin_acquire() {
            return Ok(false);
        }
        let result = self.provider.request_capture(&self.options);
        match self.capture.finish_acquire(result) {
            Ok(true) => {
                self.sampling = Some(SamplingLoop::new());
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => {
                log::error!("capture start failed: {e}");
                Err(e.into())
            }
        }
    }

    /// Explicit stop. Returns whether a running capture was stopped.
    pub fn stop(&mut self) -> bool {
        let stopped = self.capture.stop();
        if stopped {
            self.teardown();
        }
        stopped
    }

    /// Handle a source that ended by itself; same teardown as [`stop`](Self::stop).
    pub fn poll_source(&mut self) -> bool {
        let ended = self.capture.check_terminated();
        if ended {
            self.teardown();
        }
        ended
    }

    /// One detection tick. Does nothing (and reports `Off`) unless a
    /// capture is active.
    pub fn tick(&mut self) -> DetectionStatus {
        if self.poll_source() {
            return DetectionStatus::Off;
        }
        let (Some(sampling), Some(source)) = (self.sampling.as_mut(), self.capture.source_mut())
        else {
            return DetectionStatus::Off;
        };
        let status = sampling.tick(&self.inputs, source, &mut self.alert);
        if self.poll_source() {
            return DetectionStatus::Off;
        }
        status
    }

    /// Tick at the ticker's pace until the capture leaves `Active`,
    /// `max_ticks` ticks ran, or `on_tick` returns false.
    pub fn run<F>(&mut self, ticker: &mut Ticker, max_ticks: Option<u64>, mut on_tick: F) -> RunSummary
    where
        F: FnMut(&Self, DetectionStatus) -> bool,
    {
        let mut ticks = 0u64;
        while self.capture.is_active() && max_ticks.is_none_or(|max| ticks < max) {
            let started = Instant::now();
            let status = self.tick();
            ticks += 1;
            if !on_tick(&*self, status) || !self.capture.is_active() {
                break;
            }
            if max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }
            ticker.settle(started);
        }
        RunSummary {
            ticks,
            overruns: ticker.overruns(),
            final_state: self.capture.state(),
        }
    }

    /// Eye dropper: take the color at `(x, y)` of the live source (or of a
    /// one-off capture when none is running) as the new target color.
    pub fn pick_target_color(&mut self, x: usize, y: usize) -> Result<Rgb, MonitorError> {
        let color = match self.capture.source_mut() {
            Some(source) => sample_pixel(source, x, y)?,
            None => {
                let mut source = self.provider.request_capture(&self.options)?;
                let sampled = sample_pixel(&mut source, x, y);
                source.stop();
                sampled?
            }
        };
        self.set_target_color(&color.to_hex());
        Ok(color)
    }

    fn teardown(&mut self) {
        self.sampling = None;
        self.alert.set_alert(false);
    }
}
