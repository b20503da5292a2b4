use super::*;

use crate::entry::model::{Entry, Rotation};

fn red_blue_png() -> Vec<u8> {
    // 2x1: left pixel red, right pixel blue.
    let mut img = image::RgbaImage::new(2, 1);
    img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
    img.put_pixel(1, 0, image::Rgba([0, 0, 255, 255]));
    let mut buf = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut buf),
        image::ImageFormat::Png,
    )
    .unwrap();
    buf
}

fn entries() -> EntryList {
    EntryList::new(vec![
        Entry::new("일자", "2024-01-15"),
        Entry::new("현장명", "양주신도시"),
    ])
}

fn renderer() -> CompositeRenderer {
    CompositeRenderer::new(RenderConfig {
        width: 128,
        height: 96,
        font_bytes: None,
        overlay_cache_capacity: 4,
    })
    .unwrap()
}

fn source(rotation: Rotation) -> SourceImage {
    let mut s = SourceImage::new(red_blue_png(), "photo.jpg");
    s.rotation = rotation;
    s
}

fn pixel(frame: &FrameRgba, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * frame.width + x) * 4) as usize;
    frame.rgba8[i..i + 4].try_into().unwrap()
}

#[test]
fn output_keeps_canvas_dimensions_for_every_rotation() {
    let mut r = renderer();
    let list = entries();
    for rotation in [Rotation::None, Rotation::Cw90, Rotation::Cw180, Rotation::Cw270] {
        let frame = r.render(&source(rotation), &list).unwrap();
        assert_eq!(frame.width, 128);
        assert_eq!(frame.height, 96);
        assert_eq!(frame.rgba8.len(), 128 * 96 * 4);
    }
}

#[test]
fn half_turn_flips_the_photo() {
    let mut r = renderer();
    let list = entries();

    let upright = r.render(&source(Rotation::None), &list).unwrap();
    let px = pixel(&upright, 5, 5);
    assert!(px[0] > 200 && px[2] < 80, "expected red, got {px:?}");

    let flipped = r.render(&source(Rotation::Cw180), &list).unwrap();
    let px = pixel(&flipped, 5, 5);
    assert!(px[2] > 200 && px[0] < 80, "expected blue, got {px:?}");
}

#[test]
fn overlay_table_lands_bottom_left() {
    let mut r = renderer();
    let frame = r.render(&source(Rotation::None), &entries()).unwrap();
    // Inside the first cell: clear of the border and the row separator.
    let px = pixel(&frame, 10, 82);
    assert!(
        px[0] > 240 && px[1] > 240 && px[2] > 240,
        "expected the white table background, got {px:?}"
    );
    // Top-left of the table region sits on the black border.
    let px = pixel(&frame, 0, 73);
    assert!(px[0] < 16 && px[1] < 16 && px[2] < 16, "expected border, got {px:?}");
}

#[test]
fn identical_entries_reuse_one_cached_overlay() {
    let mut r = renderer();
    let list = entries();
    let a = r.render(&source(Rotation::None), &list).unwrap();
    let b = r.render(&source(Rotation::None), &list).unwrap();
    assert_eq!(a, b);
    assert_eq!(r.cached_overlays(), 1);

    let mut other = entries();
    other.set_value("현장명", "서울역");
    r.render(&source(Rotation::None), &other).unwrap();
    assert_eq!(r.cached_overlays(), 2);
}

#[test]
fn undecodable_source_fails_cleanly_and_renderer_stays_usable() {
    let mut r = renderer();
    let bad = SourceImage::new(b"not an image".to_vec(), "bad.jpg");
    let err = r.render(&bad, &entries()).unwrap_err();
    assert!(matches!(err, StampError::Decode(_)));
    assert!(err.to_string().contains("bad.jpg"));

    assert!(r.render(&source(Rotation::None), &entries()).is_ok());
}

#[test]
fn empty_entry_list_is_rejected_before_decoding() {
    let mut r = renderer();
    let err = r
        .render(&source(Rotation::None), &EntryList::default())
        .unwrap_err();
    assert!(matches!(err, StampError::Validation(_)));
}

#[test]
fn tiny_canvases_are_rejected_at_construction() {
    let config = RenderConfig {
        width: 32,
        height: 32,
        ..RenderConfig::default()
    };
    assert!(CompositeRenderer::new(config).is_err());
}
