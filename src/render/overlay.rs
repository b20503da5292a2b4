use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::entry::model::EntryList;
use crate::foundation::error::{StampError, StampResult};
use crate::render::text::{TextBrushRgba8, TextLayoutEngine};

const TABLE_HEIGHT_RATIO: f64 = 0.25;
const LABEL_COLUMN_RATIO: f64 = 0.36;
const MAX_TABLE_RATIO: f64 = 0.95;
const CELL_PAD_X: f64 = 10.0;
const MIN_VALUE_COLUMN_W: f64 = 80.0;
const BORDER_W: f64 = 2.0;
const GRID_W: f64 = 1.0;

/// Geometry of the stamped table, pinned to the canvas bottom-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableLayout {
    /// Total table width in pixels.
    pub table_w: f64,
    /// Total table height in pixels (one quarter of the canvas height).
    pub table_h: f64,
    /// Fixed label column width.
    pub col1_w: f64,
    /// Value column width, measured then clamped.
    pub col2_w: f64,
    /// Height of one row.
    pub row_h: f64,
    /// Font size derived from the row height.
    pub font_size: f32,
    /// Canvas y coordinate of the table's top edge.
    pub origin_y: f64,
}

impl TableLayout {
    /// Font size used for a table of `entry_count` rows on a canvas of height
    /// `canvas_h`. Needed before measuring value strings.
    pub fn font_size_for(canvas_h: u32, entry_count: usize) -> f32 {
        let table_h = f64::from(canvas_h) * TABLE_HEIGHT_RATIO;
        let row_h = table_h / entry_count.max(1) as f64;
        (row_h * 0.45).clamp(9.0, 26.0) as f32
    }

    /// Compute table geometry for the given canvas, row count, and the pixel
    /// width of the longest value string.
    pub fn compute(
        canvas_w: u32,
        canvas_h: u32,
        entry_count: usize,
        longest_value_px: f64,
    ) -> StampResult<Self> {
        if entry_count == 0 {
            return Err(StampError::validation("overlay table needs at least one entry"));
        }
        if canvas_w < 64 || canvas_h < 64 {
            return Err(StampError::validation("canvas too small for an overlay table"));
        }

        let (w, h) = (f64::from(canvas_w), f64::from(canvas_h));
        let table_h = h * TABLE_HEIGHT_RATIO;
        let row_h = table_h / entry_count as f64;
        let col1_w = w * LABEL_COLUMN_RATIO;
        let col2_w = (longest_value_px + 2.0 * CELL_PAD_X).max(MIN_VALUE_COLUMN_W);
        let table_w = (col1_w + col2_w).min(w * MAX_TABLE_RATIO);
        let col2_w = table_w - col1_w;

        Ok(Self {
            table_w,
            table_h,
            col1_w,
            col2_w,
            row_h,
            font_size: Self::font_size_for(canvas_h, entry_count),
            origin_y: h - table_h,
        })
    }
}

/// A rasterized overlay table plus the geometry it was drawn with.
#[derive(Clone)]
pub(crate) struct OverlayRaster {
    pub(crate) layout: TableLayout,
    pub(crate) pixmap: Arc<vello_cpu::Pixmap>,
}

/// Rasterize the table for `entries` on a canvas of the given size.
///
/// The raster covers only the table region; the compositor places it at the
/// canvas bottom-left. Text is drawn only when the engine has a registered
/// font; geometry is exact either way.
pub(crate) fn render_overlay(
    engine: &mut TextLayoutEngine,
    canvas_w: u32,
    canvas_h: u32,
    entries: &EntryList,
) -> StampResult<OverlayRaster> {
    let n = entries.len();
    let font_size = TableLayout::font_size_for(canvas_h, n);

    let mut longest = 0.0f64;
    for e in entries.entries() {
        let w = f64::from(engine.measure_width(&e.value, font_size)?);
        longest = longest.max(w);
    }
    let layout = TableLayout::compute(canvas_w, canvas_h, n, longest)?;

    let pw: u16 = (layout.table_w.ceil() as u32)
        .try_into()
        .map_err(|_| StampError::render("overlay width exceeds u16"))?;
    let ph: u16 = (layout.table_h.ceil() as u32)
        .try_into()
        .map_err(|_| StampError::render("overlay height exceeds u16"))?;

    let mut ctx = vello_cpu::RenderContext::new(pw, ph);
    let (tw, th) = (layout.table_w, layout.table_h);

    // Background.
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, tw, th));

    // Outer border, then the column and row separators, as thin filled rects.
    let line = vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255);
    ctx.set_paint(line);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, tw, BORDER_W));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, th - BORDER_W, tw, th));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, BORDER_W, th));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(tw - BORDER_W, 0.0, tw, th));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        layout.col1_w - GRID_W / 2.0,
        0.0,
        layout.col1_w + GRID_W / 2.0,
        th,
    ));
    for i in 1..n {
        let y = i as f64 * layout.row_h;
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            y - GRID_W / 2.0,
            tw,
            y + GRID_W / 2.0,
        ));
    }

    if engine.has_font() {
        let brush = TextBrushRgba8 {
            r: 0,
            g: 0,
            b: 0,
            a: 255,
        };
        for (i, e) in entries.entries().iter().enumerate() {
            let row_top = i as f64 * layout.row_h;
            draw_cell_text(engine, &mut ctx, &e.field, font_size, brush, CELL_PAD_X, row_top, layout.row_h)?;
            draw_cell_text(
                engine,
                &mut ctx,
                &e.value,
                font_size,
                brush,
                layout.col1_w + CELL_PAD_X,
                row_top,
                layout.row_h,
            )?;
        }
    }

    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(pw, ph);
    ctx.render_to_pixmap(&mut pixmap);

    Ok(OverlayRaster {
        layout,
        pixmap: Arc::new(pixmap),
    })
}

#[allow(clippy::too_many_arguments)]
fn draw_cell_text(
    engine: &mut TextLayoutEngine,
    ctx: &mut vello_cpu::RenderContext,
    text: &str,
    font_size: f32,
    brush: TextBrushRgba8,
    x: f64,
    row_top: f64,
    row_h: f64,
) -> StampResult<()> {
    if text.is_empty() {
        return Ok(());
    }
    let layout = engine.layout_line(text, font_size, brush)?;
    let font = engine
        .font_data()
        .ok_or_else(|| StampError::render("no font registered for glyph drawing"))?
        .clone();

    let y = row_top + (row_h - f64::from(layout.height())).max(0.0) / 2.0;
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((x, y)));
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let b = run.style().brush;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(b.r, b.g, b.b, b.a));
            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(&font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    Ok(())
}

/// Renderer-owned, LRU-bounded cache of overlay rasters keyed by entry content.
pub(crate) struct OverlayCache {
    capacity: usize,
    map: HashMap<u64, OverlayRaster>,
    order: VecDeque<u64>,
}

impl OverlayCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub(crate) fn get(&mut self, key: u64) -> Option<OverlayRaster> {
        let hit = self.map.get(&key).cloned()?;
        self.order.retain(|&k| k != key);
        self.order.push_back(key);
        Some(hit)
    }

    pub(crate) fn insert(&mut self, key: u64, raster: OverlayRaster) {
        if self.map.contains_key(&key) {
            self.order.retain(|&k| k != key);
        } else if self.map.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
            }
        }
        self.map.insert(key, raster);
        self.order.push_back(key);
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/overlay.rs"]
mod tests;
