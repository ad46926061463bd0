use image::{DynamicImage, RgbaImage};
use tracing::{info, instrument};

use crate::atlas::SealedAtlas;
use crate::compositing::rasterize_atlas;
use crate::config::PackSettings;
use crate::error::{PackError, Result};
use crate::model::{AtlasMetadata, PackStats};
use crate::packer::pack_sprites;
use crate::sprite::SpriteArena;

/// In-memory image to pack (source identifier + decoded image).
pub struct InputImage {
    pub key: String,
    pub image: DynamicImage,
}

/// One packed atlas without pixels.
#[derive(Debug, Clone)]
pub struct AtlasLayout {
    pub index: usize,
    /// Atlas name from the naming pattern, e.g. `atlas_00`.
    pub name: String,
    /// `name` plus the output format extension.
    pub file_name: String,
    pub atlas: SealedAtlas,
    pub metadata: AtlasMetadata,
}

/// One packed atlas and its composited RGBA page.
pub struct OutputPage {
    pub layout: AtlasLayout,
    pub rgba: RgbaImage,
}

/// Output of a packing run.
pub struct PackOutput {
    pub pages: Vec<OutputPage>,
    pub stats: PackStats,
}

/// Output of a layout-only run.
pub struct LayoutOutput {
    pub atlases: Vec<AtlasLayout>,
    pub stats: PackStats,
}

/// Loads `inputs` into a fresh arena (keys follow input order) and preprocesses them.
pub fn prepare_sprites(inputs: Vec<InputImage>, settings: &PackSettings) -> SpriteArena {
    let mut arena = SpriteArena::new();
    for input in inputs {
        arena.insert(&input.image, input.key);
    }
    arena.preprocess(settings);
    arena
}

fn layout_arena(arena: &SpriteArena, settings: &PackSettings) -> Result<Vec<AtlasLayout>> {
    pack_sprites(arena, settings)?
        .into_iter()
        .enumerate()
        .map(|(index, atlas)| {
            let name = settings.atlas_name(index)?;
            let file_name = settings.atlas_file_name(index)?;
            let metadata = AtlasMetadata::new(&atlas, arena, file_name.clone())?;
            Ok(AtlasLayout {
                index,
                name,
                file_name,
                atlas,
                metadata,
            })
        })
        .collect()
}

#[instrument(skip_all)]
/// Packs `inputs` into atlases using `settings` and returns composited pages with metadata.
///
/// Notes:
/// - Preprocessing (scale, trim, extrude) runs per sprite before any placement.
/// - A sprite that trims to nothing, or that cannot fit an empty maximum-size atlas, aborts the run.
pub fn pack_images(inputs: Vec<InputImage>, settings: PackSettings) -> Result<PackOutput> {
    settings.validate()?;
    if inputs.is_empty() {
        return Err(PackError::Empty);
    }
    let arena = prepare_sprites(inputs, &settings);
    let layouts = layout_arena(&arena, &settings)?;
    let stats = PackStats::from_atlases(layouts.iter().map(|l| &l.atlas), &arena);

    let pages = layouts
        .into_iter()
        .map(|layout| {
            let rgba = rasterize_atlas(&layout.atlas, &arena, &settings)?;
            Ok(OutputPage { layout, rgba })
        })
        .collect::<Result<Vec<_>>>()?;
    info!(atlases = pages.len(), occupancy = stats.occupancy, "packed");
    Ok(PackOutput { pages, stats })
}

#[instrument(skip_all)]
/// Like [`pack_images`] but stops after placement: metadata only, no pixels composited.
pub fn pack_layout(inputs: Vec<InputImage>, settings: PackSettings) -> Result<LayoutOutput> {
    settings.validate()?;
    if inputs.is_empty() {
        return Err(PackError::Empty);
    }
    let arena = prepare_sprites(inputs, &settings);
    let atlases = layout_arena(&arena, &settings)?;
    let stats = PackStats::from_atlases(atlases.iter().map(|l| &l.atlas), &arena);
    info!(atlases = atlases.len(), occupancy = stats.occupancy, "laid out");
    Ok(LayoutOutput { atlases, stats })
}
