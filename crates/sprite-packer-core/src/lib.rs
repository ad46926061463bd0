//! Core library for packing sprites into atlases.
//!
//! - Allocator: free-rectangle atlas that grows on demand up to a maximum size (`atlas`)
//! - Preprocessing: scale, trim and extrude per sprite (`sprite`)
//! - Orchestration: spreads sprites over as many atlases as needed (`packer`)
//! - Compositing: blits placed sprites into RGBA pages, optional alpha bleeding (`compositing`)
//! - Pipeline: `pack_images` takes decoded images and returns pages + metadata
//!
//! Quick example:
//! ```ignore
//! use image::ImageReader;
//! use sprite_packer_core::{InputImage, PackSettings, pack_images};
//! # fn main() -> anyhow::Result<()> {
//! let img1 = ImageReader::open("a.png")?.decode()?;
//! let img2 = ImageReader::open("b.png")?.decode()?;
//! let inputs = vec![
//!   InputImage { key: "a.png".into(), image: img1 },
//!   InputImage { key: "b.png".into(), image: img2 },
//! ];
//! let settings = PackSettings::builder().with_max_dimensions(1024, 1024).build();
//! let out = pack_images(inputs, settings)?;
//! println!("atlases: {}", out.pages.len());
//! # Ok(()) }
//! ```

pub mod atlas;
pub mod compositing;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod model;
pub mod packer;
pub mod pipeline;
pub mod sprite;

pub use atlas::*;
pub use config::*;
pub use error::*;
pub use export::*;
pub use geometry::*;
pub use model::*;
pub use packer::*;
pub use pipeline::*;
pub use sprite::*;

/// Convenience prelude for common types and functions.
/// Importing `sprite_packer_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::atlas::{Atlas, BestFit, MAX_RANK, PlacedRect, SealedAtlas};
    pub use crate::config::{ExpandStrategy, PackSettings, PackSettingsBuilder, RankStrategy};
    pub use crate::error::PackError;
    pub use crate::geometry::Rect;
    pub use crate::model::{AtlasMetadata, PackStats, SpriteFrame};
    pub use crate::packer::{PackingOrchestrator, pack_sprites};
    pub use crate::sprite::{SpriteArena, SpriteKey, SpriteRecord};
    pub use crate::{InputImage, OutputPage, PackOutput, pack_images, pack_layout};
}
