use image::{Rgba, RgbaImage};
use tracing::instrument;

use crate::atlas::SealedAtlas;
use crate::config::PackSettings;
use crate::error::{PackError, Result};
use crate::sprite::SpriteArena;

/// Copy `src` into `canvas` with its top-left at (dx, dy), optionally rotated 90° clockwise.
/// Pixels are overwritten, not blended; anything outside the canvas is clipped.
pub fn blit_rgba(src: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32, rotated: bool) {
    let (cw, ch) = canvas.dimensions();
    let (sw, sh) = src.dimensions();
    // destination (rendered) size differs when rotated
    let (rw, rh) = if rotated { (sh, sw) } else { (sw, sh) };

    for yy in 0..rh {
        for xx in 0..rw {
            let (ix, iy) = if rotated {
                (yy, sh - 1 - xx)
            } else {
                (xx, yy)
            };
            if dx + xx < cw && dy + yy < ch {
                canvas.put_pixel(dx + xx, dy + yy, *src.get_pixel(ix, iy));
            }
        }
    }
}

/// New image `size` pixels larger on every side, with `src` centred and its outermost
/// rows/columns repeated outward (corners take the corner pixel).
pub fn extrude_edges(src: &RgbaImage, size: u32) -> RgbaImage {
    let (w, h) = src.dimensions();
    let mut out = RgbaImage::new(w + size * 2, h + size * 2);
    if w == 0 || h == 0 {
        return out;
    }
    let s = size as i64;
    for (x, y, px) in out.enumerate_pixels_mut() {
        let sx = (x as i64 - s).clamp(0, w as i64 - 1) as u32;
        let sy = (y as i64 - s).clamp(0, h as i64 - 1) as u32;
        *px = *src.get_pixel(sx, sy);
    }
    out
}

const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

fn neighbours(x: u32, y: u32, w: u32, h: u32) -> impl Iterator<Item = (u32, u32)> {
    NEIGHBOURS.iter().filter_map(move |&(ox, oy)| {
        let nx = x as i64 + ox;
        let ny = y as i64 + oy;
        (nx >= 0 && ny >= 0 && nx < w as i64 && ny < h as i64).then_some((nx as u32, ny as u32))
    })
}

/// A visible pixel with at least one fully transparent 8-neighbour.
fn is_border_pixel(img: &RgbaImage, x: u32, y: u32) -> bool {
    let (w, h) = img.dimensions();
    img.get_pixel(x, y)[3] != 0 && neighbours(x, y, w, h).any(|(nx, ny)| img.get_pixel(nx, ny)[3] == 0)
}

/// Bleeds edge colours outward into fully transparent pixels, one ring per iteration.
///
/// Bled pixels get the source RGB with alpha 1, so they stay effectively invisible but give
/// bilinear filtering a sensible colour instead of black.
pub fn alpha_bleed(img: &mut RgbaImage, iterations: u32) {
    let (w, h) = img.dimensions();
    let mut borders: Vec<(u32, u32)> = {
        let view: &RgbaImage = img;
        view.enumerate_pixels()
            .filter(|&(x, y, _)| is_border_pixel(view, x, y))
            .map(|(x, y, _)| (x, y))
            .collect()
    };
    let mut next: Vec<(u32, u32)> = Vec::new();

    for _ in 0..iterations {
        if borders.is_empty() {
            break;
        }
        for &(x, y) in &borders {
            let Rgba([r, g, b, _]) = *img.get_pixel(x, y);
            for (nx, ny) in neighbours(x, y, w, h) {
                if img.get_pixel(nx, ny)[3] == 0 {
                    img.put_pixel(nx, ny, Rgba([r, g, b, 1]));
                    if is_border_pixel(img, nx, ny) {
                        next.push((nx, ny));
                    }
                }
            }
        }
        std::mem::swap(&mut borders, &mut next);
        next.clear();
    }
}

/// Composites every sprite of `atlas` into one RGBA page and applies alpha bleeding when
/// `reduce_border_artifacts` is set.
#[instrument(skip_all, fields(width = atlas.width(), height = atlas.height()))]
pub fn rasterize_atlas(
    atlas: &SealedAtlas,
    arena: &SpriteArena,
    settings: &PackSettings,
) -> Result<RgbaImage> {
    let mut canvas = RgbaImage::new(atlas.width(), atlas.height());
    for placed in atlas.placed() {
        let sprite = arena
            .get(placed.key)
            .ok_or(PackError::UnknownSprite(placed.key))?;
        blit_rgba(
            sprite.image(),
            &mut canvas,
            placed.rect.x as u32,
            placed.rect.y as u32,
            placed.rotated,
        );
    }
    if settings.reduce_border_artifacts {
        alpha_bleed(&mut canvas, settings.bleed_iterations);
    }
    Ok(canvas)
}
