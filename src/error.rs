use crate::{
    calibration::CalibrationError, config::ConfigError, overlay::OverlayError,
    record::RecordError, render::RenderError, sink::SinkError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),
    #[error("failed to load the records")]
    Record(#[from] RecordError),
    #[error("failed to calibrate the session")]
    Calibration(#[from] CalibrationError),
    #[error("failed to render a frame")]
    Render(#[from] RenderError),
    #[error("failed to set up the overlays")]
    Overlay(#[from] OverlayError),
    #[error("output failure")]
    Sink(#[from] SinkError),
}

/// Formats an error and its sources on a single line
pub(crate) fn error_chain(e: &dyn std::error::Error) -> String {
    let mut msg = e.to_string();
    let mut current = e.source();
    while let Some(cause) = current {
        msg.push_str(&format!(": {}", cause));
        current = cause.source();
    }
    msg
}
