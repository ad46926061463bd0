//! Free-rectangle allocator for a single atlas.
//!
//! An [`Atlas`] accepts placements and grows until [`Atlas::shrink`] consumes it into a
//! read-only [`SealedAtlas`].

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{ExpandStrategy, PackSettings, RankStrategy};
use crate::error::{PackError, Result};
use crate::geometry::Rect;
use crate::sprite::SpriteKey;

/// Rank of a free rectangle that cannot hold the candidate.
pub const MAX_RANK: u32 = u32::MAX;

/// Additive growth step when the atlas is not forced to powers of two.
const EXPAND_STEP: i32 = 4;

/// A sprite rectangle placed in an atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedRect {
    pub key: SpriteKey,
    /// Placement in atlas pixels, post-rotation width/height.
    pub rect: Rect,
    pub rotated: bool,
}

/// Winning free rectangle for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestFit {
    pub rank: u32,
    pub free_index: usize,
    pub rotated: bool,
}

/// An atlas still accepting placements.
#[derive(Debug, Clone)]
pub struct Atlas {
    width: i32,
    height: i32,
    max_width: i32,
    max_height: i32,
    border_padding: i32,
    shape_padding: i32,
    force_pot: bool,
    expand_strategy: ExpandStrategy,
    rank_strategy: RankStrategy,
    free: Vec<Rect>,
    placed: Vec<PlacedRect>,
}

impl Atlas {
    /// Creates the smallest atlas whose bordered interior is non-negative.
    ///
    /// Fails when twice the border padding exceeds a maximum dimension.
    pub fn new(settings: &PackSettings) -> Result<Self> {
        let max_width = to_i32(settings.max_width, "max_width")?;
        let max_height = to_i32(settings.max_height, "max_height")?;
        let border_padding = to_i32(settings.border_padding, "border_padding")?;
        let shape_padding = to_i32(settings.shape_padding, "shape_padding")?;
        if 2 * border_padding as i64 > max_width as i64
            || 2 * border_padding as i64 > max_height as i64
        {
            return Err(PackError::InvalidConfig(format!(
                "border_padding ({}) * 2 exceeds atlas maximum {}x{}",
                border_padding, max_width, max_height
            )));
        }
        let expand_strategy = if settings.force_square {
            ExpandStrategy::ExpandBoth
        } else {
            settings.expand_strategy
        };

        let mut width = 0;
        let mut height = 0;
        while 2 * border_padding >= width || 2 * border_padding >= height {
            width += 2;
            height += 2;
        }

        let interior = Rect::new(
            border_padding,
            border_padding,
            width - 2 * border_padding,
            height - 2 * border_padding,
        );
        Ok(Self {
            width,
            height,
            max_width,
            max_height,
            border_padding,
            shape_padding,
            force_pot: settings.force_pot,
            expand_strategy,
            rank_strategy: settings.rank_strategy,
            free: vec![interior],
            placed: Vec::new(),
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn free_rects(&self) -> &[Rect] {
        &self.free
    }

    pub fn placed(&self) -> &[PlacedRect] {
        &self.placed
    }

    /// Padding owed on the left and top edges of `free`: none against the border,
    /// `shape_padding` against anything else.
    fn leading_padding(&self, free: &Rect) -> (i32, i32) {
        let px = if free.x == self.border_padding {
            0
        } else {
            self.shape_padding
        };
        let py = if free.y == self.border_padding {
            0
        } else {
            self.shape_padding
        };
        (px, py)
    }

    /// Scores `candidate` in `free`. Lower is better; [`MAX_RANK`] means it does not fit.
    pub fn rank(&self, free: &Rect, candidate: &Rect, strategy: RankStrategy) -> u32 {
        let (px, py) = self.leading_padding(free);
        if free.width - px < candidate.width || free.height - py < candidate.height {
            return MAX_RANK;
        }
        let leftover = match strategy {
            RankStrategy::BestShortSideFit => {
                if candidate.width >= candidate.height {
                    (free.width - candidate.width) as i64
                } else {
                    (free.height - candidate.height) as i64
                }
            }
            RankStrategy::BestLongSideFit => {
                if candidate.width <= candidate.height {
                    (free.width - candidate.width) as i64
                } else {
                    (free.height - candidate.height) as i64
                }
            }
            RankStrategy::BestAreaFit => free.area() - candidate.area(),
        };
        leftover.clamp(0, MAX_RANK as i64 - 1) as u32
    }

    fn find_best_rank_oriented(&self, candidate: &Rect) -> Option<BestFit> {
        let mut best: Option<BestFit> = None;
        for (free_index, free) in self.free.iter().enumerate() {
            let rank = self.rank(free, candidate, self.rank_strategy);
            if rank < best.map_or(MAX_RANK, |b| b.rank) {
                best = Some(BestFit {
                    rank,
                    free_index,
                    rotated: false,
                });
            }
        }
        best
    }

    /// Lowest-ranked free rectangle for `candidate`, or `None` if it does not fit the current
    /// extent. With `allow_rotate` the swapped orientation is tried too; ties keep the upright one.
    pub fn find_best_rank(&self, candidate: &Rect, allow_rotate: bool) -> Option<BestFit> {
        let upright = self.find_best_rank_oriented(candidate);
        if !allow_rotate || candidate.width == candidate.height {
            return upright;
        }
        let turned = self
            .find_best_rank_oriented(&candidate.rotated())
            .map(|b| BestFit {
                rotated: true,
                ..b
            });
        match (upright, turned) {
            (Some(u), Some(t)) if t.rank < u.rank => Some(t),
            (None, t) => t,
            (u, _) => u,
        }
    }

    /// Places a `width`x`height` rectangle for `key` into the free rectangle at `free_index`.
    ///
    /// The caller passes dimensions in the orientation reported by [`find_best_rank`](Self::find_best_rank).
    pub fn place(
        &mut self,
        free_index: usize,
        key: SpriteKey,
        width: i32,
        height: i32,
        rotated: bool,
    ) -> PlacedRect {
        let free = self.free[free_index];
        let (px, py) = self.leading_padding(&free);
        let rect = Rect::new(free.x + px, free.y + py, width, height);

        let mut footprint = rect;
        footprint.enlarge_left_to(rect.left() - px);
        footprint.enlarge_top_to(rect.top() - py);

        let mut next = Vec::with_capacity(self.free.len() + 4);
        for fr in &self.free {
            if fr.overlaps(&footprint) {
                next.extend(fr.subtract(&footprint));
            } else {
                next.push(*fr);
            }
        }
        self.free = next;
        self.prune_free_rects();

        let placed = PlacedRect { key, rect, rotated };
        trace!(key = %key, ?rect, rotated, free = self.free.len(), "placed");
        self.placed.push(placed);
        placed
    }

    /// Drops every free rectangle contained in another one. Of identical rectangles the
    /// first survives.
    fn prune_free_rects(&mut self) {
        let free = &self.free;
        let kept: Vec<Rect> = free
            .iter()
            .enumerate()
            .filter(|&(i, a)| {
                !free
                    .iter()
                    .enumerate()
                    .any(|(j, b)| i != j && b.contains(a) && (a != b || j < i))
            })
            .map(|(_, r)| *r)
            .collect();
        self.free = kept;
    }

    fn grown(&self, len: i32) -> i32 {
        if self.force_pot {
            len.saturating_mul(2)
        } else {
            len.saturating_add(EXPAND_STEP)
        }
    }

    /// Grows the atlas one step along the configured axes.
    ///
    /// Returns `false` without changing anything if a growing axis would pass its maximum.
    pub fn try_expand(&mut self) -> bool {
        let (grow_w, grow_h) = match self.expand_strategy {
            ExpandStrategy::ExpandBoth => (true, true),
            ExpandStrategy::ExpandWidth => (true, false),
            ExpandStrategy::ExpandHeight => (false, true),
            ExpandStrategy::ExpandShortSide => {
                let w = self.width < self.height;
                (w, !w)
            }
            ExpandStrategy::ExpandLongSide => {
                let w = self.width >= self.height;
                (w, !w)
            }
        };
        let new_width = if grow_w {
            self.grown(self.width)
        } else {
            self.width
        };
        let new_height = if grow_h {
            self.grown(self.height)
        } else {
            self.height
        };
        if (grow_w && new_width > self.max_width) || (grow_h && new_height > self.max_height) {
            return false;
        }

        let bp = self.border_padding;
        let old_right = self.width - bp;
        let old_bottom = self.height - bp;
        let new_right = new_width - bp;
        let new_bottom = new_height - bp;

        for fr in &mut self.free {
            if fr.right() == old_right {
                fr.enlarge_right_to(new_right);
            }
            if fr.bottom() == old_bottom {
                fr.enlarge_bottom_to(new_bottom);
            }
        }
        if new_width != self.width {
            self.free.push(Rect::new(
                old_right,
                bp,
                new_width - self.width,
                new_height - 2 * bp,
            ));
        }
        if new_height != self.height {
            self.free.push(Rect::new(
                bp,
                old_bottom,
                new_width - 2 * bp,
                new_height - self.height,
            ));
        }
        self.width = new_width;
        self.height = new_height;
        self.prune_free_rects();
        debug!(
            width = self.width,
            height = self.height,
            free = self.free.len(),
            "atlas expanded"
        );
        true
    }

    /// Finishes the atlas: tight bounding box of the placements plus border padding.
    /// The free list is discarded.
    pub fn shrink(self) -> SealedAtlas {
        let bp = self.border_padding;
        let max_right = self.placed.iter().map(|p| p.rect.right()).max();
        let max_bottom = self.placed.iter().map(|p| p.rect.bottom()).max();
        let width = max_right.unwrap_or(bp) + bp;
        let height = max_bottom.unwrap_or(bp) + bp;
        debug!(width, height, sprites = self.placed.len(), "atlas sealed");
        SealedAtlas {
            width: width as u32,
            height: height as u32,
            border_padding: self.border_padding as u32,
            shape_padding: self.shape_padding as u32,
            placed: self.placed,
        }
    }
}

fn to_i32(v: u32, what: &str) -> Result<i32> {
    i32::try_from(v).map_err(|_| PackError::InvalidConfig(format!("{what} ({v}) is out of range")))
}

/// A finished atlas. Dimensions and placements are final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedAtlas {
    width: u32,
    height: u32,
    border_padding: u32,
    shape_padding: u32,
    placed: Vec<PlacedRect>,
}

impl SealedAtlas {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Placements in the order they were made.
    pub fn placed(&self) -> &[PlacedRect] {
        &self.placed
    }

    /// Placement rectangle enlarged by the padding it reserves on its left/top edges.
    pub fn footprint(&self, placed: &PlacedRect) -> Rect {
        let bp = self.border_padding as i32;
        let sp = self.shape_padding as i32;
        let mut fp = placed.rect;
        if fp.x != bp {
            fp.enlarge_left_to(fp.x - sp);
        }
        if fp.y != bp {
            fp.enlarge_top_to(fp.y - sp);
        }
        fp
    }
}
