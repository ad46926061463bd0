use serde::{Deserialize, Serialize};

use crate::atlas::{PlacedRect, SealedAtlas};
use crate::error::{PackError, Result};
use crate::sprite::{SpriteArena, SpriteRecord};

/// Region of a sprite's visible content inside the atlas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Transparent margin trimmed from each side of the original frame.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Padding {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

/// Everything a renderer needs to map an atlas region back to the logical sprite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpriteFrame {
    /// File name of the source image (final path component).
    pub filename: String,
    /// Visible content in atlas pixels, excluding extrusion.
    pub frame: FrameRect,
    /// True if the sprite was stored rotated 90° clockwise.
    pub rotated: bool,
    /// True if transparent margins were trimmed.
    pub trimmed: bool,
    pub padding: Padding,
    /// Untrimmed frame size: `padding.left + frame.w + padding.right == source_size.w`.
    pub source_size: Size,
}

impl SpriteFrame {
    pub fn new(sprite: &SpriteRecord, placed: &PlacedRect) -> Self {
        let e = sprite.extruded() as i32;
        let bbox = sprite.source_bbox();
        let src = sprite.source_rect();
        let left = bbox.x - e;
        let top = bbox.y - e;
        Self {
            filename: sprite.file_name(),
            frame: FrameRect {
                x: placed.rect.x + e,
                y: placed.rect.y + e,
                w: bbox.width,
                h: bbox.height,
            },
            rotated: placed.rotated,
            trimmed: sprite.is_trimmed(),
            padding: Padding {
                left,
                top,
                right: src.width - bbox.width - left,
                bottom: src.height - bbox.height - top,
            },
            source_size: Size {
                w: src.width.max(0) as u32,
                h: src.height.max(0) as u32,
            },
        }
    }
}

/// Atlas-level record: which image file it is and how large.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AtlasInfo {
    pub texture_file_name: String,
    pub size: Size,
}

/// Metadata for one atlas: its sprites in placement order plus the atlas record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtlasMetadata {
    pub frames: Vec<SpriteFrame>,
    pub metadata: AtlasInfo,
}

impl AtlasMetadata {
    pub fn new(
        atlas: &SealedAtlas,
        arena: &SpriteArena,
        texture_file_name: impl Into<String>,
    ) -> Result<Self> {
        let frames = atlas
            .placed()
            .iter()
            .map(|p| {
                arena
                    .get(p.key)
                    .map(|s| SpriteFrame::new(s, p))
                    .ok_or(PackError::UnknownSprite(p.key))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            frames,
            metadata: AtlasInfo {
                texture_file_name: texture_file_name.into(),
                size: Size {
                    w: atlas.width(),
                    h: atlas.height(),
                },
            },
        })
    }
}

/// Statistics about packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PackStats {
    pub num_atlases: usize,
    pub num_sprites: usize,
    /// Sum of width * height over all atlases.
    pub total_atlas_area: u64,
    /// Sum of placed rectangle areas (including extrusion).
    pub used_area: u64,
    /// used_area / total_atlas_area (0.0 to 1.0).
    pub occupancy: f64,
    pub max_atlas_width: u32,
    pub max_atlas_height: u32,
    pub num_rotated: usize,
    pub num_trimmed: usize,
}

impl PackStats {
    pub fn from_atlases<'a>(
        atlases: impl IntoIterator<Item = &'a SealedAtlas>,
        arena: &SpriteArena,
    ) -> Self {
        let mut stats = PackStats {
            num_atlases: 0,
            num_sprites: 0,
            total_atlas_area: 0,
            used_area: 0,
            occupancy: 0.0,
            max_atlas_width: 0,
            max_atlas_height: 0,
            num_rotated: 0,
            num_trimmed: 0,
        };
        for atlas in atlases {
            stats.num_atlases += 1;
            stats.total_atlas_area += atlas.width() as u64 * atlas.height() as u64;
            stats.max_atlas_width = stats.max_atlas_width.max(atlas.width());
            stats.max_atlas_height = stats.max_atlas_height.max(atlas.height());
            for p in atlas.placed() {
                stats.num_sprites += 1;
                stats.used_area += p.rect.area().max(0) as u64;
                if p.rotated {
                    stats.num_rotated += 1;
                }
                if arena.get(p.key).is_some_and(|s| s.is_trimmed()) {
                    stats.num_trimmed += 1;
                }
            }
        }
        if stats.total_atlas_area > 0 {
            stats.occupancy = stats.used_area as f64 / stats.total_atlas_area as f64;
        }
        stats
    }

    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Atlases: {}, Sprites: {}, Occupancy: {:.2}%, Total Area: {} px², Used Area: {} px², Rotated: {}, Trimmed: {}",
            self.num_atlases,
            self.num_sprites,
            self.occupancy * 100.0,
            self.total_atlas_area,
            self.used_area,
            self.num_rotated,
            self.num_trimmed,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.total_atlas_area.saturating_sub(self.used_area)
    }
}
