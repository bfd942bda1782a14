use std::rc::Rc;

use image::{imageops::FilterType, RgbImage};

use crate::{
    calibration::GlobalRange,
    config::Config,
    palette::Lut,
    record::Frame,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RenderError {
    #[error("cannot render a frame with zero area")]
    ZeroArea,
    #[error("failed to create image buffer")]
    Image,
}
type Result<T> = std::result::Result<T, RenderError>;

/// Quantizes a frame to 8 bits against the session range
pub fn quantize(frame: &Frame, range: &GlobalRange) -> Vec<u8> {
    frame
        .values()
        .map(|x| (range.normalize(x) * 255.).round() as u8)
        .collect()
}

/// False-color frame renderer
#[derive(Debug)]
pub struct FrameRenderer {
    lut: Lut,
    config: Rc<Config>,
}
impl FrameRenderer {
    pub fn new(config: &Rc<Config>) -> Self {
        Self {
            lut: config.palette.lut(config.inverted),
            config: config.clone(),
        }
    }
    /// Renders a frame to the output size
    ///
    /// The frame is normalized with the session `range`, quantized, colored
    /// with the palette and resampled (bilinear) to the output size.
    pub fn render(&self, frame: &Frame, range: &GlobalRange) -> Result<RgbImage> {
        let image = self.colorize(frame, range)?;
        let (width, height) = self.config.output_size;
        Ok(image::imageops::resize(&image, width, height, FilterType::Triangle))
    }
    /// Renders a frame at the sensor resolution
    pub fn colorize(&self, frame: &Frame, range: &GlobalRange) -> Result<RgbImage> {
        if frame.is_empty() {
            return Err(RenderError::ZeroArea);
        }
        let rgb_data: Vec<u8> = quantize(frame, range)
            .into_iter()
            .flat_map(|i| self.lut.get(i).0)
            .collect();
        RgbImage::from_raw(frame.width() as u32, frame.height() as u32, rgb_data)
            .ok_or(RenderError::Image)
    }
}
