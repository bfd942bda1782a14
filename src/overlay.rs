use std::{fs, path::PathBuf, rc::Rc};

use chrono::NaiveDateTime;
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};
use rusttype::{Font, Scale};

use crate::{
    calibration::CalibrationMapping,
    config::{Config, Subsecond},
    palette::Palette,
    record::Record,
};

/// Scale bar distance from the right edge of the image [px]
pub const BAR_INSET: u32 = 30;
/// Scale bar width [px]
pub const BAR_THICKNESS: u32 = 20;
/// Timestamp label distance from the bottom right corner [px]
pub const LABEL_INSET: i32 = 10;
const LABEL_GAP: i32 = 4;
const TEXT_COLOR: Rgb<u8> = Rgb([255u8, 255u8, 255u8]);

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("failed to read font file {1:?}")]
    FontRead(#[source] std::io::Error, PathBuf),
    #[error("failed to parse font file {0:?}")]
    FontParse(PathBuf),
}

/// Position and size of the temperature scale bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleBar {
    pub x: i32,
    pub y: i32,
    pub thickness: u32,
    pub height: u32,
}
impl ScaleBar {
    /// Scale bar of an image of the given size: half the image height,
    /// vertically centered, near the right edge
    pub fn layout(width: u32, height: u32) -> Self {
        let bar_height = height / 2;
        Self {
            x: width as i32 - BAR_INSET as i32,
            y: ((height - bar_height) / 2) as i32,
            thickness: BAR_THICKNESS,
            height: bar_height,
        }
    }
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
    /// Palette value of the bar row `i` counted from the top
    pub fn value(&self, i: u32) -> f64 {
        if self.height > 1 {
            1. - i as f64 / (self.height - 1) as f64
        } else {
            1.
        }
    }
    /// Paints the palette gradient, 0 at the bottom and 1 at the top
    pub fn fill(&self, image: &mut RgbImage, palette: &Palette) {
        if self.height == 0 {
            return;
        }
        for i in 0..self.height {
            draw_filled_rect_mut(
                image,
                Rect::at(self.x, self.y + i as i32).of_size(self.thickness, 1),
                palette.rgb(self.value(i)),
            );
        }
    }
}

/// Timestamp label text
pub fn format_timestamp(
    session_id: &str,
    timestamp: &NaiveDateTime,
    subsecond: Subsecond,
) -> String {
    format!("{} {}", session_id, timestamp.format(subsecond.time_format()))
}

/// Scale bar label text
pub fn format_temperature(temperature: f64) -> String {
    format!("{:.2}°C", temperature)
}

/// Draws the scale bar and the timestamp on the rendered frames
pub struct OverlayCompositor {
    font: Font<'static>,
    label_scale: Scale,
    timestamp_scale: Scale,
    config: Rc<Config>,
}
impl OverlayCompositor {
    pub fn new(config: &Rc<Config>) -> Result<Self, OverlayError> {
        let path = &config.font;
        let font_data = fs::read(path).map_err(|e| OverlayError::FontRead(e, path.clone()))?;
        let font =
            Font::try_from_vec(font_data).ok_or_else(|| OverlayError::FontParse(path.clone()))?;
        Ok(Self {
            font,
            label_scale: Scale::uniform(16.),
            timestamp_scale: Scale::uniform(20.),
            config: config.clone(),
        })
    }
    /// Draws both overlays
    pub fn compose(&self, image: &mut RgbImage, record: &Record, mapping: &CalibrationMapping) {
        self.draw_scale_bar(image, mapping);
        self.draw_timestamp(image, record.timestamp());
    }
    /// Draws the temperature scale bar with the min and max temperature labels
    pub fn draw_scale_bar(&self, image: &mut RgbImage, mapping: &CalibrationMapping) {
        let (width, height) = image.dimensions();
        let bar = ScaleBar::layout(width, height);
        bar.fill(image, &self.config.palette);

        let scale = self.label_scale;
        let min_label = format_temperature(mapping.min_temperature());
        let (w, _) = text_size(scale, &self.font, &min_label);
        let x = (bar.x - LABEL_GAP - w).max(0);
        draw_text_mut(
            image,
            TEXT_COLOR,
            x,
            bar.bottom(),
            scale,
            &self.font,
            &min_label,
        );

        let max_label = format_temperature(mapping.max_temperature());
        let (w, h) = text_size(scale, &self.font, &max_label);
        let x = (bar.x - LABEL_GAP - w).max(0);
        let y = (bar.y - h).max(0);
        draw_text_mut(image, TEXT_COLOR, x, y, scale, &self.font, &max_label);
    }
    /// Draws the timestamp label in the bottom right corner
    pub fn draw_timestamp(&self, image: &mut RgbImage, timestamp: &NaiveDateTime) {
        let (width, height) = image.dimensions();
        let text = format_timestamp(&self.config.session_id, timestamp, self.config.subsecond);
        let (x, y) = self.timestamp_position(width, height, &text);
        draw_text_mut(
            image,
            TEXT_COLOR,
            x,
            y,
            self.timestamp_scale,
            &self.font,
            &text,
        );
    }
    /// Top left corner of the timestamp label
    pub fn timestamp_position(&self, width: u32, height: u32, text: &str) -> (i32, i32) {
        let (w, h) = text_size(self.timestamp_scale, &self.font, text);
        (
            (width as i32 - w - LABEL_INSET).max(0),
            (height as i32 - h - LABEL_INSET).max(0),
        )
    }
    pub fn text_width(&self, text: &str) -> i32 {
        text_size(self.timestamp_scale, &self.font, text).0
    }
}
