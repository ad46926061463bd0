use std::fmt;
use std::path::Path;

use image::{DynamicImage, RgbaImage, imageops};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::compositing::extrude_edges;
use crate::config::PackSettings;
use crate::geometry::Rect;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Stable handle of a sprite inside one [`SpriteArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpriteKey(pub u32);

impl fmt::Display for SpriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One sprite: its processed pixels plus where they came from.
///
/// Preprocessing runs scale, trim, extrude in that order; each step applies at most once.
#[derive(Debug, Clone)]
pub struct SpriteRecord {
    key: SpriteKey,
    name: String,
    image: RgbaImage,
    source_size: (u32, u32),
    source_rect: Rect,
    source_bbox: Rect,
    scaled: bool,
    trimmed: bool,
    extruded: u32,
}

impl SpriteRecord {
    fn new(key: SpriteKey, image: RgbaImage, name: String) -> Self {
        let (w, h) = image.dimensions();
        let full = Rect::new(0, 0, w as i32, h as i32);
        Self {
            key,
            name,
            image,
            source_size: (w, h),
            source_rect: full,
            source_bbox: full,
            scaled: false,
            trimmed: false,
            extruded: 0,
        }
    }

    pub fn key(&self) -> SpriteKey {
        self.key
    }

    /// Source identifier the sprite was loaded from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Final path component of [`name`](Self::name).
    pub fn file_name(&self) -> String {
        Path::new(&self.name)
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }

    /// Processed pixels, i.e. what ends up in the atlas.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Dimensions of the decoded image before any processing.
    pub fn source_size(&self) -> (u32, u32) {
        self.source_size
    }

    /// Untrimmed frame, offset by the extrusion.
    pub fn source_rect(&self) -> Rect {
        self.source_rect
    }

    /// Trimmed content within the untrimmed frame, offset by the extrusion.
    pub fn source_bbox(&self) -> Rect {
        self.source_bbox
    }

    pub fn is_trimmed(&self) -> bool {
        self.trimmed
    }

    pub fn extruded(&self) -> u32 {
        self.extruded
    }

    /// Rectangle handed to the allocator: the processed image at the origin.
    pub fn packing_rect(&self) -> Rect {
        Rect::new(0, 0, self.image.width() as i32, self.image.height() as i32)
    }

    /// Resamples the pixels by `factor`, rounding to the nearest pixel with a 1x1 minimum.
    /// Resets the frame and bounding box to the new full image.
    pub fn scale(&mut self, factor: f64) {
        if self.scaled || factor == 1.0 || !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.scaled = true;
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 {
            return;
        }
        let nw = ((w as f64 * factor).round() as u32).max(1);
        let nh = ((h as f64 * factor).round() as u32).max(1);
        self.image = imageops::resize(&self.image, nw, nh, imageops::FilterType::Triangle);
        let full = Rect::new(0, 0, nw as i32, nh as i32);
        self.source_rect = full;
        self.source_bbox = full;
        trace!(sprite = %self.name, from = ?(w, h), to = ?(nw, nh), "scaled");
    }

    /// Clears pixels with alpha below `alpha_threshold`, then crops to the remaining content.
    ///
    /// A sprite with no content left keeps an empty 0x0 image; the packer rejects it.
    pub fn trim(&mut self, alpha_threshold: u8) {
        if self.trimmed {
            return;
        }
        self.trimmed = true;
        clear_alpha_below(&mut self.image, alpha_threshold);
        let bbox = opaque_bounds(&self.image);
        self.image = if bbox.is_empty() {
            RgbaImage::new(0, 0)
        } else {
            imageops::crop_imm(
                &self.image,
                bbox.x as u32,
                bbox.y as u32,
                bbox.width as u32,
                bbox.height as u32,
            )
            .to_image()
        };
        self.source_bbox = Rect::new(
            self.source_rect.x + bbox.x,
            self.source_rect.y + bbox.y,
            bbox.width,
            bbox.height,
        );
        trace!(sprite = %self.name, bbox = ?self.source_bbox, "trimmed");
    }

    /// Grows the canvas by `size` on every side and repeats the edge pixels outward.
    /// Only the first call with a non-zero size has an effect.
    pub fn extrude(&mut self, size: u32) {
        if self.extruded > 0 || size == 0 || self.image.width() == 0 || self.image.height() == 0
        {
            return;
        }
        self.extruded = size;
        self.image = extrude_edges(&self.image, size);
        let s = size as i32;
        self.source_rect.x += s;
        self.source_rect.y += s;
        self.source_bbox.x += s;
        self.source_bbox.y += s;
    }

    /// Applies the enabled steps of `settings` in scale, trim, extrude order.
    pub fn preprocess(&mut self, settings: &PackSettings) {
        if settings.scale != 1.0 {
            self.scale(settings.scale);
        }
        if settings.trim_enabled() {
            self.trim(settings.trim_alpha_threshold);
        }
        if settings.extrude_size > 0 {
            self.extrude(settings.extrude_size);
        }
    }
}

/// Zeroes every pixel whose alpha is strictly below `alpha`.
fn clear_alpha_below(img: &mut RgbaImage, alpha: u8) {
    for px in img.pixels_mut() {
        if px[3] < alpha {
            px.0 = [0, 0, 0, 0];
        }
    }
}

/// Bounding box of pixels with non-zero alpha. Zero-sized at the origin when there are none.
fn opaque_bounds(img: &RgbaImage) -> Rect {
    let (w, h) = img.dimensions();
    let mut l = w;
    let mut t = h;
    let mut r = 0u32;
    let mut b = 0u32;
    let mut any = false;
    for (x, y, px) in img.enumerate_pixels() {
        if px[3] != 0 {
            any = true;
            l = l.min(x);
            t = t.min(y);
            r = r.max(x);
            b = b.max(y);
        }
    }
    if !any {
        return Rect::default();
    }
    Rect::new(l as i32, t as i32, (r - l + 1) as i32, (b - t + 1) as i32)
}

/// Owns every sprite of a packing run and hands out their keys.
///
/// Keys are assigned in insertion order and never reused.
#[derive(Debug, Default, Clone)]
pub struct SpriteArena {
    records: Vec<SpriteRecord>,
}

impl SpriteArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a decoded image under the given source identifier.
    pub fn insert(&mut self, image: &DynamicImage, name: impl Into<String>) -> SpriteKey {
        self.insert_rgba(image.to_rgba8(), name)
    }

    pub fn insert_rgba(&mut self, image: RgbaImage, name: impl Into<String>) -> SpriteKey {
        let key = SpriteKey(self.records.len() as u32);
        self.records.push(SpriteRecord::new(key, image, name.into()));
        key
    }

    pub fn get(&self, key: SpriteKey) -> Option<&SpriteRecord> {
        self.records.get(key.0 as usize)
    }

    pub fn get_mut(&mut self, key: SpriteKey) -> Option<&mut SpriteRecord> {
        self.records.get_mut(key.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpriteRecord> {
        self.records.iter()
    }

    /// Runs [`SpriteRecord::preprocess`] on every sprite.
    /// With the `parallel` feature the sprites are processed concurrently.
    pub fn preprocess(&mut self, settings: &PackSettings) {
        #[cfg(feature = "parallel")]
        self.records
            .par_iter_mut()
            .for_each(|r| r.preprocess(settings));

        #[cfg(not(feature = "parallel"))]
        self.records.iter_mut().for_each(|r| r.preprocess(settings));
    }
}
