//! Session calibration
//!
//! The raw intensity range is computed once over all the frames of a session
//! and every frame is normalized against it.

use crate::{config::Calibration, record::Record};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CalibrationError {
    #[error("empty session: no record to calibrate")]
    EmptySession,
}

/// Raw intensity range shared by all the frames of a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalRange {
    pub min: f64,
    pub max: f64,
}
impl GlobalRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
    /// Width of the range
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
    /// Returns `value` scaled to `[0, 1]`
    ///
    /// A degenerate range maps every value to 0.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.span();
        if span > 0. {
            ((value - self.min) / span).clamp(0., 1.)
        } else {
            0.
        }
    }
    pub fn mapping(&self, calibration: &Calibration) -> CalibrationMapping {
        let (t_min, t_max) = match *calibration {
            Calibration::Temperature { min, max } => (min, max),
            Calibration::Raw => (self.min, self.max),
        };
        CalibrationMapping {
            range: *self,
            t_min,
            t_max,
        }
    }
}

/// Computes the global raw range of the session
pub fn compute_range(records: &[Record]) -> Result<GlobalRange, CalibrationError> {
    if records.is_empty() {
        return Err(CalibrationError::EmptySession);
    }
    let (min, max) = records
        .iter()
        .flat_map(|record| record.frame().values())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), x| {
            (min.min(x), max.max(x))
        });
    log::info!("session raw range: [{min}, {max}]");
    Ok(GlobalRange { min, max })
}

/// Affine mapping from raw intensity to temperature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationMapping {
    range: GlobalRange,
    t_min: f64,
    t_max: f64,
}
impl CalibrationMapping {
    pub fn temperature(&self, raw: f64) -> f64 {
        let span = self.range.span();
        if span > 0. {
            (raw - self.range.min) / span * (self.t_max - self.t_min) + self.t_min
        } else {
            self.t_min
        }
    }
    /// Temperature of the session minimum
    pub fn min_temperature(&self) -> f64 {
        self.temperature(self.range.min)
    }
    /// Temperature of the session maximum
    pub fn max_temperature(&self) -> f64 {
        self.temperature(self.range.max)
    }
}
