use image::{Rgba, RgbaImage};
use sprite_packer_core::prelude::*;

/// `w`x`h` transparent image with an opaque `cw`x`ch` block at (`cx`, `cy`).
fn framed(w: u32, h: u32, cx: u32, cy: u32, cw: u32, ch: u32) -> RgbaImage {
    let mut img = RgbaImage::new(w, h);
    for y in cy..cy + ch {
        for x in cx..cx + cw {
            img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
        }
    }
    img
}

fn single(img: RgbaImage) -> (SpriteArena, SpriteKey) {
    let mut arena = SpriteArena::new();
    let key = arena.insert_rgba(img, "sprites/ship.png");
    (arena, key)
}

#[test]
fn new_record_covers_full_image() {
    let (arena, key) = single(RgbaImage::new(12, 7));
    let s = arena.get(key).unwrap();
    assert_eq!(s.source_size(), (12, 7));
    assert_eq!(s.source_rect(), Rect::new(0, 0, 12, 7));
    assert_eq!(s.source_bbox(), Rect::new(0, 0, 12, 7));
    assert_eq!(s.file_name(), "ship.png");
    assert_eq!(s.name(), "sprites/ship.png");
    assert!(!s.is_trimmed());
}

#[test]
fn keys_follow_insertion_order() {
    let mut arena = SpriteArena::new();
    let a = arena.insert_rgba(RgbaImage::new(1, 1), "a");
    let b = arena.insert_rgba(RgbaImage::new(1, 1), "b");
    assert_eq!((a, b), (SpriteKey(0), SpriteKey(1)));
    assert_eq!(arena.len(), 2);
    assert_eq!(arena.get(b).unwrap().name(), "b");
    assert!(arena.get(SpriteKey(2)).is_none());
}

#[test]
fn trim_crops_to_opaque_content() {
    let (mut arena, key) = single(framed(40, 30, 10, 10, 20, 10));
    let s = arena.get_mut(key).unwrap();
    s.trim(1);
    assert!(s.is_trimmed());
    assert_eq!(s.image().dimensions(), (20, 10));
    assert_eq!(s.source_rect(), Rect::new(0, 0, 40, 30));
    assert_eq!(s.source_bbox(), Rect::new(10, 10, 20, 10));
}

#[test]
fn trim_threshold_clears_faint_pixels() {
    let mut img = framed(8, 8, 2, 2, 2, 2);
    img.put_pixel(7, 7, Rgba([0, 255, 0, 10]));
    let (mut arena, key) = single(img);
    let s = arena.get_mut(key).unwrap();
    s.trim(11);
    assert_eq!(s.source_bbox(), Rect::new(2, 2, 2, 2));
}

#[test]
fn trim_of_transparent_image_leaves_empty_rect() {
    let (mut arena, key) = single(RgbaImage::new(16, 16));
    let s = arena.get_mut(key).unwrap();
    s.trim(1);
    assert!(s.packing_rect().is_empty());
    assert!(s.source_bbox().is_empty());
}

#[test]
fn extrude_offsets_frame_and_bbox() {
    let (mut arena, key) = single(framed(40, 30, 10, 10, 20, 10));
    let s = arena.get_mut(key).unwrap();
    s.trim(1);
    s.extrude(2);
    assert_eq!(s.extruded(), 2);
    assert_eq!(s.image().dimensions(), (24, 14));
    assert_eq!(s.packing_rect(), Rect::new(0, 0, 24, 14));
    assert_eq!(s.source_rect(), Rect::new(2, 2, 40, 30));
    assert_eq!(s.source_bbox(), Rect::new(12, 12, 20, 10));

    // A second extrusion is a no-op.
    s.extrude(5);
    assert_eq!(s.image().dimensions(), (24, 14));
    assert_eq!(s.extruded(), 2);
}

#[test]
fn extrude_repeats_edges_and_corners() {
    let mut img = RgbaImage::new(2, 2);
    img.put_pixel(0, 0, Rgba([1, 0, 0, 255]));
    img.put_pixel(1, 0, Rgba([2, 0, 0, 255]));
    img.put_pixel(0, 1, Rgba([3, 0, 0, 255]));
    img.put_pixel(1, 1, Rgba([4, 0, 0, 255]));
    let (mut arena, key) = single(img);
    let s = arena.get_mut(key).unwrap();
    s.extrude(1);
    let out = s.image();
    assert_eq!(out.dimensions(), (4, 4));
    assert_eq!(out.get_pixel(0, 0)[0], 1);
    assert_eq!(out.get_pixel(3, 0)[0], 2);
    assert_eq!(out.get_pixel(0, 3)[0], 3);
    assert_eq!(out.get_pixel(3, 3)[0], 4);
    assert_eq!(out.get_pixel(1, 0)[0], 1);
    assert_eq!(out.get_pixel(3, 2)[0], 4);
    assert_eq!(out.get_pixel(2, 2)[0], 4);
}

#[test]
fn scale_rounds_with_one_pixel_minimum() {
    let (mut arena, key) = single(framed(10, 6, 0, 0, 10, 6));
    let s = arena.get_mut(key).unwrap();
    s.scale(0.5);
    assert_eq!(s.image().dimensions(), (5, 3));
    assert_eq!(s.source_rect(), Rect::new(0, 0, 5, 3));
    assert_eq!(s.source_size(), (10, 6));
    // Applies once.
    s.scale(0.5);
    assert_eq!(s.image().dimensions(), (5, 3));

    let (mut arena, key) = single(framed(10, 6, 0, 0, 10, 6));
    let s = arena.get_mut(key).unwrap();
    s.scale(0.04);
    assert_eq!(s.image().dimensions(), (1, 1));
}

#[test]
fn preprocess_runs_scale_trim_extrude_in_order() {
    let settings = PackSettings::builder()
        .scale(2.0)
        .trim_alpha_threshold(1)
        .extrude_size(1)
        .build();
    let (mut arena, key) = single(framed(10, 10, 4, 4, 2, 2));
    arena.preprocess(&settings);
    let s = arena.get(key).unwrap();
    // Scaled to 20x20 first, so the trimmed box is measured in scaled pixels.
    assert_eq!(s.source_rect(), Rect::new(1, 1, 20, 20));
    assert!((4..=8).contains(&s.source_bbox().width));
    assert_eq!(
        s.image().width() as i32,
        s.source_bbox().width + 2,
        "image = bbox + extrusion"
    );
}

#[test]
fn preprocess_with_defaults_changes_nothing() {
    let (mut arena, key) = single(framed(9, 5, 0, 0, 3, 3));
    arena.preprocess(&PackSettings::default());
    let s = arena.get(key).unwrap();
    assert_eq!(s.image().dimensions(), (9, 5));
    assert_eq!(s.source_bbox(), Rect::new(0, 0, 9, 5));
    assert!(!s.is_trimmed());
    assert_eq!(s.extruded(), 0);
}
