use std::io::Cursor;

use anyhow::Context;
use image::imageops::FilterType;

use crate::entry::model::CompositeArtifact;
use crate::foundation::error::{StampError, StampResult};
use crate::render::composite::FrameRgba;

/// Output-size bounds and encode qualities for finished artifacts.
#[derive(Clone, Copy, Debug)]
pub struct DownscaleConfig {
    /// Composites whose long edge exceeds this are uniformly scaled down.
    pub max_long_edge: u32,
    /// Side length of the square thumbnail.
    pub thumbnail_size: u32,
    /// JPEG quality for the full artifact.
    pub jpeg_quality: u8,
    /// JPEG quality for the thumbnail.
    pub thumbnail_quality: u8,
}

impl Default for DownscaleConfig {
    fn default() -> Self {
        Self {
            max_long_edge: 1600,
            thumbnail_size: 200,
            jpeg_quality: 90,
            thumbnail_quality: 60,
        }
    }
}

/// Bounds composite size and derives the square thumbnail.
///
/// Thumbnail and full artifact always derive from the same composite pixels,
/// so the two resolutions stay visually consistent.
#[derive(Clone, Copy, Debug, Default)]
pub struct DownscalePipeline {
    config: DownscaleConfig,
}

impl DownscalePipeline {
    /// Construct a pipeline with the given bounds.
    pub fn new(config: DownscaleConfig) -> Self {
        Self { config }
    }

    /// Encode a rendered composite into its final artifact.
    pub fn finish(&self, frame: FrameRgba, filename: String) -> StampResult<CompositeArtifact> {
        let img = image::RgbaImage::from_raw(frame.width, frame.height, frame.rgba8)
            .ok_or_else(|| StampError::render("composite frame byte len mismatch"))?;

        let thumbnail_jpeg = encode_jpeg(
            &square_thumbnail(&img, self.config.thumbnail_size),
            self.config.thumbnail_quality,
        )?;

        let bounded = bound_long_edge(img, self.config.max_long_edge);
        let (width, height) = bounded.dimensions();
        let jpeg = encode_jpeg(&bounded, self.config.jpeg_quality)?;

        Ok(CompositeArtifact {
            jpeg,
            thumbnail_jpeg,
            filename,
            width,
            height,
        })
    }
}

/// Uniformly scale down so the long edge equals `max` (no-op when within bounds).
pub fn bound_long_edge(img: image::RgbaImage, max: u32) -> image::RgbaImage {
    let (w, h) = img.dimensions();
    let long = w.max(h);
    if long <= max {
        return img;
    }
    let scale = f64::from(max) / f64::from(long);
    let nw = ((f64::from(w) * scale).round() as u32).max(1);
    let nh = ((f64::from(h) * scale).round() as u32).max(1);
    image::imageops::resize(&img, nw, nh, FilterType::Triangle)
}

/// Center-crop to a square over the longer dimension, then resize to `size`.
pub fn square_thumbnail(img: &image::RgbaImage, size: u32) -> image::RgbaImage {
    let (w, h) = img.dimensions();
    let side = w.min(h);
    let x = (w - side) / 2;
    let y = (h - side) / 2;
    let cropped = image::imageops::crop_imm(img, x, y, side, side).to_image();
    image::imageops::resize(&cropped, size, size, FilterType::Triangle)
}

fn encode_jpeg(img: &image::RgbaImage, quality: u8) -> StampResult<Vec<u8>> {
    let rgb = image::DynamicImage::ImageRgba8(img.clone()).to_rgb8();
    let (w, h) = rgb.dimensions();
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut Cursor::new(&mut buf), quality)
        .encode(rgb.as_raw(), w, h, image::ExtendedColorType::Rgb8)
        .context("encode composite jpeg")?;
    Ok(buf)
}

#[cfg(test)]
#[path = "../../tests/unit/render/downscale.rs"]
mod tests;
