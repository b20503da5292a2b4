use std::sync::Arc;

use crate::entry::model::{EntryList, SourceImage};
use crate::foundation::error::{StampError, StampResult};
use crate::foundation::math::{premultiply_rgba8_in_place, unpremultiply_rgba8_in_place};
use crate::render::overlay::{OverlayCache, OverlayRaster, render_overlay};
use crate::render::text::TextLayoutEngine;

/// Fixed-size canvas configuration for composite rendering.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Font bytes for the overlay table text. Without a font the table is
    /// drawn without glyphs (geometry unchanged).
    pub font_bytes: Option<Vec<u8>>,
    /// Capacity of the renderer-owned overlay cache.
    pub overlay_cache_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            font_bytes: None,
            overlay_cache_capacity: 32,
        }
    }
}

/// Straight-alpha RGBA8 frame produced by the renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgba {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major straight-alpha RGBA8 bytes.
    pub rgba8: Vec<u8>,
}

struct PreparedImage {
    width: u32,
    height: u32,
    rgba8_premul: Vec<u8>,
}

/// Renders one fixed-resolution composite per source photo: the photo
/// stretched to fill the canvas (rotated as requested), with the entry table
/// composited bottom-left.
pub struct CompositeRenderer {
    config: RenderConfig,
    engine: TextLayoutEngine,
    overlay_cache: OverlayCache,
    ctx: Option<vello_cpu::RenderContext>,
}

impl CompositeRenderer {
    /// Construct a renderer, registering the overlay font when provided.
    pub fn new(config: RenderConfig) -> StampResult<Self> {
        if config.width < 64 || config.height < 64 {
            return Err(StampError::validation("render canvas must be at least 64x64"));
        }
        let mut engine = TextLayoutEngine::new();
        if let Some(bytes) = &config.font_bytes {
            engine.register_font(bytes)?;
        }
        let overlay_cache = OverlayCache::new(config.overlay_cache_capacity);
        Ok(Self {
            config,
            engine,
            overlay_cache,
            ctx: None,
        })
    }

    /// Canvas configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Number of distinct overlay rasters currently cached.
    pub fn cached_overlays(&self) -> usize {
        self.overlay_cache.len()
    }

    /// Render one composite. An undecodable source raises
    /// [`StampError::Decode`] and leaves the renderer reusable.
    #[tracing::instrument(skip(self, source, entries), fields(name = %source.original_name))]
    pub fn render(&mut self, source: &SourceImage, entries: &EntryList) -> StampResult<FrameRgba> {
        if entries.is_empty() {
            return Err(StampError::validation("cannot render with an empty entry list"));
        }

        let prepared = decode_source(&source.bytes, &source.original_name)?;
        let overlay = self.overlay_for(entries)?;

        let w16: u16 = self
            .config
            .width
            .try_into()
            .map_err(|_| StampError::validation("canvas width exceeds u16"))?;
        let h16: u16 = self
            .config
            .height
            .try_into()
            .map_err(|_| StampError::validation("canvas height exceeds u16"))?;

        let base = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap_from_premul_bytes(
                &prepared.rgba8_premul,
                prepared.width,
                prepared.height,
            )?)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w16 && ctx.height() == h16 => ctx,
            _ => vello_cpu::RenderContext::new(w16, h16),
        };
        ctx.reset();

        // Base photo, stretched edge-to-edge. For quarter turns that swap axes
        // the drawn region is sized h x w before rotating about the canvas
        // center, so the rotated result still fills the whole canvas.
        let (cw, ch) = (f64::from(self.config.width), f64::from(self.config.height));
        let (sw, sh) = (f64::from(prepared.width), f64::from(prepared.height));
        let (tw, th) = if source.rotation.swaps_axes() {
            (ch, cw)
        } else {
            (cw, ch)
        };
        let center = vello_cpu::kurbo::Point::new(cw / 2.0, ch / 2.0);
        let transform = vello_cpu::kurbo::Affine::rotate_about(source.rotation.radians(), center)
            * vello_cpu::kurbo::Affine::translate((cw / 2.0 - tw / 2.0, ch / 2.0 - th / 2.0))
            * vello_cpu::kurbo::Affine::scale_non_uniform(tw / sw, th / sh);

        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_transform(transform);
        ctx.set_paint(base);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, sw, sh));

        // Overlay table on top, pinned bottom-left.
        let (ow, oh) = (
            f64::from(overlay.pixmap.width()),
            f64::from(overlay.pixmap.height()),
        );
        let overlay_paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::clone(&overlay.pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            0.0,
            overlay.layout.origin_y,
        )));
        ctx.set_paint(overlay_paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, ow, oh));

        ctx.flush();
        let mut out = vello_cpu::Pixmap::new(w16, h16);
        ctx.render_to_pixmap(&mut out);
        self.ctx = Some(ctx);

        let mut rgba8 = out.data_as_u8_slice().to_vec();
        unpremultiply_rgba8_in_place(&mut rgba8);
        Ok(FrameRgba {
            width: self.config.width,
            height: self.config.height,
            rgba8,
        })
    }

    fn overlay_for(&mut self, entries: &EntryList) -> StampResult<OverlayRaster> {
        let key = entries.cache_key();
        if let Some(hit) = self.overlay_cache.get(key) {
            return Ok(hit);
        }
        let raster = render_overlay(
            &mut self.engine,
            self.config.width,
            self.config.height,
            entries,
        )?;
        self.overlay_cache.insert(key, raster.clone());
        Ok(raster)
    }
}

fn decode_source(bytes: &[u8], name: &str) -> StampResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| StampError::decode(format!("source image '{name}': {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);
    Ok(PreparedImage {
        width,
        height,
        rgba8_premul,
    })
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> StampResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| StampError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| StampError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(StampError::render("pixmap byte len mismatch"));
    }
    // Pixmap stores PremulRgba8; our bytes are already premultiplied.
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
