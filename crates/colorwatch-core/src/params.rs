//! Detection inputs and their per-tick validation.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// Reasons a tick cannot run detection. All of them are recoverable: the
/// sampling loop resets its debounce state and reports an error status.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid target color {0:?} (expected #rrggbb)")]
    InvalidColor(String),
    #[error("invalid tolerance {0:?} (expected an integer >= 0)")]
    InvalidTolerance(String),
    #[error("invalid threshold {0:?} (expected an integer >= 1)")]
    InvalidThreshold(String),
    #[error("live source has no pixels (width={width}, height={height})")]
    EmptySource { width: usize, height: usize },
}

/// Symmetric per-channel deviation allowed around the target color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Tolerance(pub u32);

impl Tolerance {
    /// Parse a decimal integer >= 0. Values above `u32::MAX` saturate; any
    /// tolerance above 255 already accepts every pixel.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let v: i64 = s
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidTolerance(s.to_string()))?;
        if v < 0 {
            return Err(ValidationError::InvalidTolerance(s.to_string()));
        }
        Ok(Self(u32::try_from(v).unwrap_or(u32::MAX)))
    }
}

/// Number of consecutive identical results needed to confirm a change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Threshold(pub NonZeroU32);

impl Threshold {
    pub const ONE: Threshold = Threshold(NonZeroU32::MIN);

    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    #[inline]
    pub fn get(&self) -> u32 {
        self.0.get()
    }

    /// Parse a decimal integer >= 1. Values above `u32::MAX` saturate.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidThreshold(s.to_string());
        let v: i64 = s.trim().parse().map_err(|_| invalid())?;
        if v < 1 {
            return Err(invalid());
        }
        let n = u32::try_from(v).unwrap_or(u32::MAX);
        Self::new(n).ok_or_else(invalid)
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::ONE
    }
}

/// The three user-editable inputs exactly as typed.
///
/// They are kept as text so that an invalid edit is not lost: it is stored
/// and persisted as-is and only rejected when a tick tries to use it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInputs {
    pub target_color: String,
    pub tolerance: String,
    pub threshold: String,
}

impl Default for RawInputs {
    fn default() -> Self {
        Self {
            target_color: "#ff0000".to_string(),
            tolerance: "0".to_string(),
            threshold: "1".to_string(),
        }
    }
}

impl RawInputs {
    /// Validate the text fields. Checks run in field order; the first
    /// failure is returned.
    pub fn parse(&self) -> Result<DetectParams, ValidationError> {
        Ok(DetectParams {
            target: Rgb::from_hex(&self.target_color)?,
            tolerance: Tolerance::parse(&self.tolerance)?,
            threshold: Threshold::parse(&self.threshold)?,
        })
    }
}

impl From<&DetectParams> for RawInputs {
    fn from(p: &DetectParams) -> Self {
        Self {
            target_color: p.target.to_hex(),
            tolerance: p.tolerance.0.to_string(),
            threshold: p.threshold.get().to_string(),
        }
    }
}

/// Validated detection parameters for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectParams {
    pub target: Rgb,
    pub tolerance: Tolerance,
    pub threshold: Threshold,
}
