use std::{cmp::Ordering, env, path::PathBuf, rc::Rc};

use crate::palette::Palette;

/// Default video frame rate [Hz]
pub const DEFAULT_FPS: u32 = 10;
/// Default output frame size (width, height) [px]
pub const DEFAULT_SIZE: (u32, u32) = (640, 480);
/// Default calibrated temperature range [°C]
pub const DEFAULT_TEMPERATURE_RANGE: (f64, f64) = (25., 173.);
/// Camera identifier printed in front of the frame timestamp
pub const DEFAULT_SESSION_ID: &str = "FP25021801";
/// System font used for the overlays
pub const DEFAULT_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("the frame rate must be strictly positive")]
    Fps,
    #[error("invalid output size {0}x{1}")]
    Size(u32, u32),
    #[error("invalid temperature range: {0} >= {1}")]
    TemperatureRange(f64, f64),
}

/// Mapping of the raw sensor range to the temperature printed on the scale bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Calibration {
    /// The global raw range spans `[min, max]` °C
    Temperature { min: f64, max: f64 },
    /// The labels show the raw sensor values
    Raw,
}
impl Default for Calibration {
    fn default() -> Self {
        let (min, max) = DEFAULT_TEMPERATURE_RANGE;
        Self::Temperature { min, max }
    }
}

/// Sub-second digits of the timestamp label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Subsecond {
    #[default]
    Millis,
    Micros,
}
impl Subsecond {
    pub(crate) fn time_format(&self) -> &'static str {
        match self {
            Subsecond::Millis => "%H:%M:%S%.3f",
            Subsecond::Micros => "%H:%M:%S%.6f",
        }
    }
}

/// Rendering configuration
///
/// The configuration is immutable once built and shared between the
/// [FrameRenderer](crate::FrameRenderer) and the
/// [OverlayCompositor](crate::OverlayCompositor).
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) fps: u32,
    pub(crate) output_size: (u32, u32),
    pub(crate) calibration: Calibration,
    pub(crate) palette: Palette,
    pub(crate) inverted: bool,
    pub(crate) session_id: String,
    pub(crate) subsecond: Subsecond,
    pub(crate) overlay: bool,
    pub(crate) font: PathBuf,
    pub(crate) ffmpeg: String,
    pub(crate) codec: String,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            output_size: DEFAULT_SIZE,
            calibration: Calibration::default(),
            palette: Palette::Jet,
            inverted: true,
            session_id: DEFAULT_SESSION_ID.to_string(),
            subsecond: Subsecond::default(),
            overlay: true,
            font: PathBuf::from(DEFAULT_FONT),
            ffmpeg: env::var("FLIR_FFMPEG").unwrap_or_else(|_| "ffmpeg".into()),
            codec: "mpeg4".into(),
        }
    }
}
impl Config {
    pub fn fps(self, fps: u32) -> Self {
        Self { fps, ..self }
    }
    pub fn output_size(self, width: u32, height: u32) -> Self {
        Self {
            output_size: (width, height),
            ..self
        }
    }
    pub fn calibration(self, calibration: Calibration) -> Self {
        Self {
            calibration,
            ..self
        }
    }
    pub fn palette(self, palette: Palette) -> Self {
        Self { palette, ..self }
    }
    /// Renders the frames with the palette reversed (the default)
    pub fn inverted(self, inverted: bool) -> Self {
        Self { inverted, ..self }
    }
    pub fn session_id(self, value: impl ToString) -> Self {
        Self {
            session_id: value.to_string(),
            ..self
        }
    }
    pub fn subsecond(self, subsecond: Subsecond) -> Self {
        Self { subsecond, ..self }
    }
    /// Draws the scale bar and the timestamp on the frames (the default)
    pub fn overlay(self, overlay: bool) -> Self {
        Self { overlay, ..self }
    }
    pub fn font(self, path: impl Into<PathBuf>) -> Self {
        Self {
            font: path.into(),
            ..self
        }
    }
    /// Path to the `ffmpeg` executable
    pub fn ffmpeg(self, value: impl ToString) -> Self {
        Self {
            ffmpeg: value.to_string(),
            ..self
        }
    }
    /// `ffmpeg` video codec
    pub fn codec(self, value: impl ToString) -> Self {
        Self {
            codec: value.to_string(),
            ..self
        }
    }
    /// Checks the configuration and freezes it
    pub fn build(self) -> Result<Rc<Self>, ConfigError> {
        if self.fps == 0 {
            return Err(ConfigError::Fps);
        }
        let (width, height) = self.output_size;
        if width == 0 || height == 0 {
            return Err(ConfigError::Size(width, height));
        }
        if let Calibration::Temperature { min, max } = self.calibration {
            if min.partial_cmp(&max) != Some(Ordering::Less) {
                return Err(ConfigError::TemperatureRange(min, max));
            }
        }
        Ok(Rc::new(self))
    }
}
