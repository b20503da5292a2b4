use crate::foundation::error::{StampError, StampResult};

/// RGBA8 brush color used by Parley text layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrushRgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

/// Stateful helper for measuring and laying out overlay text from raw font bytes.
///
/// A registered font is optional: without one, [`TextLayoutEngine::measure_width`]
/// falls back to a deterministic per-character estimate and callers skip glyph
/// drawing, so headless environments still produce exact table geometry.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: Option<String>,
    font_data: Option<vello_cpu::peniko::FontData>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Construct a new layout engine with fresh Parley contexts and no font.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            family_name: None,
            font_data: None,
        }
    }

    /// Register the overlay font from raw bytes.
    pub fn register_font(&mut self, font_bytes: &[u8]) -> StampResult<()> {
        let families = self.font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(font_bytes.to_vec()),
            None,
        );
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            StampError::validation("no font families registered from font bytes")
        })?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| StampError::validation("registered font family has no name"))?
            .to_string();

        self.family_name = Some(family_name);
        self.font_data = Some(vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font_bytes.to_vec()),
            0,
        ));
        Ok(())
    }

    /// `true` when a font has been registered.
    pub fn has_font(&self) -> bool {
        self.font_data.is_some()
    }

    /// Font data for glyph rasterization, when a font is registered.
    pub fn font_data(&self) -> Option<&vello_cpu::peniko::FontData> {
        self.font_data.as_ref()
    }

    /// Advance width in pixels of `text` at `size_px`.
    ///
    /// Uses shaped layout when a font is registered; otherwise a per-character
    /// estimate (CJK-aware: fullwidth characters count as a full em).
    pub fn measure_width(&mut self, text: &str, size_px: f32) -> StampResult<f32> {
        if !self.has_font() {
            return Ok(estimate_width(text, size_px));
        }
        let layout = self.layout_line(text, size_px, TextBrushRgba8::default())?;
        Ok(layout.full_width())
    }

    /// Shape and lay out a single unwrapped line.
    pub fn layout_line(
        &mut self,
        text: &str,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> StampResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(StampError::validation("text size_px must be finite and > 0"));
        }
        let family = self
            .family_name
            .clone()
            .ok_or_else(|| StampError::render("no font registered for text layout"))?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

fn estimate_width(text: &str, size_px: f32) -> f32 {
    let units: f32 = text
        .chars()
        .map(|c| if is_fullwidth(c) { 1.0 } else { 0.55 })
        .sum();
    units * size_px
}

// Hangul, CJK ideographs, and fullwidth forms advance a full em.
fn is_fullwidth(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x11FF
        | 0x3000..=0x303F
        | 0x3130..=0x318F
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7A3
        | 0xFF00..=0xFF60
    )
}
