//! Screen capture through `xcap`.
//!
//! Every `read_frame` grabs a fresh screenshot of the selected monitor. A
//! failed grab (monitor unplugged, capture permission revoked) ends the
//! source, which the session then treats as an external termination.

use colorwatch_core::RgbaFrame;
use xcap::Monitor;

use crate::capture::{CaptureError, CaptureOptions, DisplaySourceProvider, FrameSource};

/// A capturable display.
#[derive(Clone, Debug)]
pub struct DisplayInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub is_primary: bool,
}

pub fn list_displays() -> Result<Vec<DisplayInfo>, CaptureError> {
    let monitors = Monitor::all().map_err(|e| CaptureError::Backend(e.to_string()))?;
    Ok(monitors
        .iter()
        .map(|m| DisplayInfo {
            name: m.name().to_string(),
            width: m.width(),
            height: m.height(),
            is_primary: m.is_primary(),
        })
        .collect())
}

#[derive(Debug, Default)]
pub struct XcapProvider;

impl XcapProvider {
    pub fn new() -> Self {
        Self
    }
}

impl DisplaySourceProvider for XcapProvider {
    type Source = XcapSource;

    fn request_capture(&mut self, options: &CaptureOptions) -> Result<XcapSource, CaptureError> {
        // screenshots ignore these
        log::debug!(
            "capture options: video_only={} frame_rate={} exclude_self={}",
            options.video_only,
            options.frame_rate,
            options.exclude_self
        );
        let monitors = Monitor::all().map_err(|e| CaptureError::Rejected(e.to_string()))?;
        let monitor = match options.display.as_deref() {
            Some(name) => monitors
                .into_iter()
                .find(|m| m.name() == name)
                .ok_or_else(|| CaptureError::NoSuchDisplay(name.to_string()))?,
            None => {
                let mut all = monitors.into_iter();
                let first = all
                    .next()
                    .ok_or_else(|| CaptureError::Rejected("no monitors found".to_string()))?;
                if first.is_primary() {
                    first
                } else {
                    all.find(|m| m.is_primary()).unwrap_or(first)
                }
            }
        };

        // Probe once so a denied capture fails here, at start.
        let probe = monitor
            .capture_image()
            .map_err(|e| CaptureError::Rejected(e.to_string()))?;
        let name = monitor.name().to_string();
        log::info!("capturing display {name:?}");
        Ok(XcapSource {
            monitor,
            name,
            width: probe.width() as usize,
            height: probe.height() as usize,
            ended: false,
        })
    }
}

pub struct XcapSource {
    monitor: Monitor,
    name: String,
    width: usize,
    height: usize,
    ended: bool,
}

impl XcapSource {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FrameSource for XcapSource {
    fn dimensions(&self) -> (usize, usize) {
        if self.ended {
            (0, 0)
        } else {
            (self.width, self.height)
        }
    }

    fn read_frame(&mut self, buf: &mut RgbaFrame) -> Result<(), CaptureError> {
        if self.ended {
            return Err(CaptureError::Ended);
        }
        let img = match self.monitor.capture_image() {
            Ok(img) => img,
            Err(e) => {
                self.ended = true;
                return Err(CaptureError::Backend(e.to_string()));
            }
        };
        self.width = img.width() as usize;
        self.height = img.height() as usize;
        buf.copy_from(self.width, self.height, img.as_raw())?;
        Ok(())
    }

    fn has_ended(&self) -> bool {
        self.ended
    }

    fn stop(&mut self) {
        self.ended = true;
    }
}
