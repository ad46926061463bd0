use std::cmp::Reverse;

use tracing::{debug, instrument};

use crate::atlas::{Atlas, BestFit, PlacedRect, SealedAtlas};
use crate::config::PackSettings;
use crate::error::{PackError, Result};
use crate::sprite::{SpriteArena, SpriteRecord};

/// Distributes sprites over as many atlases as needed.
///
/// Placement is sequential: every decision depends on the free space left by the previous ones.
pub struct PackingOrchestrator<'a> {
    settings: &'a PackSettings,
    atlases: Vec<Atlas>,
}

impl<'a> PackingOrchestrator<'a> {
    /// Validates `settings` and opens the first atlas.
    pub fn new(settings: &'a PackSettings) -> Result<Self> {
        settings.validate()?;
        let first = Atlas::new(settings)?;
        debug!(index = 0, "atlas opened");
        Ok(Self {
            settings,
            atlases: vec![first],
        })
    }

    pub fn atlases(&self) -> &[Atlas] {
        &self.atlases
    }

    /// Places one preprocessed sprite, growing or opening atlases as needed.
    /// Returns the index of the atlas that received it.
    pub fn add(&mut self, sprite: &SpriteRecord) -> Result<(usize, PlacedRect)> {
        let rect = sprite.packing_rect();
        if rect.is_empty() {
            return Err(PackError::EmptySprite {
                name: sprite.name().to_string(),
            });
        }
        let rotate = self.settings.allow_rotation;

        // Best fit over every atlas; ties go to the earliest.
        let mut best: Option<(usize, BestFit)> = None;
        for (index, atlas) in self.atlases.iter().enumerate() {
            if let Some(fit) = atlas.find_best_rank(&rect, rotate) {
                if best.is_none_or(|(_, b)| fit.rank < b.rank) {
                    best = Some((index, fit));
                }
            }
        }

        if best.is_none() {
            for (index, atlas) in self.atlases.iter_mut().enumerate() {
                while best.is_none() && atlas.try_expand() {
                    best = atlas.find_best_rank(&rect, rotate).map(|fit| (index, fit));
                }
                if best.is_some() {
                    break;
                }
            }
        }

        let (index, fit) = match best {
            Some(found) => found,
            None => self.open_atlas_for(sprite)?,
        };

        let (w, h) = if fit.rotated {
            (rect.height, rect.width)
        } else {
            (rect.width, rect.height)
        };
        let placed = self.atlases[index].place(fit.free_index, sprite.key(), w, h, fit.rotated);
        Ok((index, placed))
    }

    /// Opens a fresh atlas and grows it until `sprite` fits.
    fn open_atlas_for(&mut self, sprite: &SpriteRecord) -> Result<(usize, BestFit)> {
        let rect = sprite.packing_rect();
        let rotate = self.settings.allow_rotation;
        let mut atlas = Atlas::new(self.settings)?;
        let fit = loop {
            if let Some(fit) = atlas.find_best_rank(&rect, rotate) {
                break fit;
            }
            if !atlas.try_expand() {
                return Err(PackError::SpriteTooLarge {
                    name: sprite.name().to_string(),
                    width: rect.width,
                    height: rect.height,
                    max_width: self.settings.max_width,
                    max_height: self.settings.max_height,
                });
            }
        };
        let index = self.atlases.len();
        debug!(index, sprite = sprite.name(), "atlas opened");
        self.atlases.push(atlas);
        Ok((index, fit))
    }

    /// Seals every atlas.
    pub fn finish(self) -> Vec<SealedAtlas> {
        self.atlases.into_iter().map(Atlas::shrink).collect()
    }
}

/// Packs every sprite of `arena`, largest side first.
///
/// Sprites are sorted by `max(width, height)` descending; the sort is stable, so equal sizes keep
/// arena order and the result is deterministic.
#[instrument(skip_all, fields(sprites = arena.len()))]
pub fn pack_sprites(arena: &SpriteArena, settings: &PackSettings) -> Result<Vec<SealedAtlas>> {
    if arena.is_empty() {
        return Err(PackError::Empty);
    }
    let mut order: Vec<&SpriteRecord> = arena.iter().collect();
    order.sort_by_key(|s| {
        let r = s.packing_rect();
        Reverse(r.width.max(r.height))
    });

    let mut orchestrator = PackingOrchestrator::new(settings)?;
    for sprite in order {
        orchestrator.add(sprite)?;
    }
    let sealed = orchestrator.finish();
    debug!(atlases = sealed.len(), "packing finished");
    Ok(sealed)
}
