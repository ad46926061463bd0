use serde::{Deserialize, Serialize};

/// Axis-aligned integer rectangle.
///
/// ```text
/// (x, y) = (left, top)
///         +----+
///         |    |
///         +----+
///              (right, bottom) = (x + width, y + height)
/// ```
///
/// Edges are half-open: `right` and `bottom` are one past the last covered pixel,
/// so two rectangles sharing an edge do not overlap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> i32 {
        self.x
    }
    pub fn top(&self) -> i32 {
        self.y
    }
    pub fn right(&self) -> i32 {
        self.x + self.width
    }
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// True when the rectangle covers no pixel.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Moves the left edge to `l`, keeping the right edge fixed.
    pub(crate) fn enlarge_left_to(&mut self, l: i32) {
        self.width = self.right() - l;
        self.x = l;
    }

    /// Moves the right edge to `r`, keeping the left edge fixed.
    pub(crate) fn enlarge_right_to(&mut self, r: i32) {
        self.width = r - self.left();
    }

    /// Moves the top edge to `t`, keeping the bottom edge fixed.
    pub(crate) fn enlarge_top_to(&mut self, t: i32) {
        self.height = self.bottom() - t;
        self.y = t;
    }

    /// Moves the bottom edge to `b`, keeping the top edge fixed.
    pub(crate) fn enlarge_bottom_to(&mut self, b: i32) {
        self.height = b - self.top();
    }

    /// Same origin, width and height swapped.
    pub fn rotated(&self) -> Self {
        Self::new(self.x, self.y, self.height, self.width)
    }

    /// True unless the rectangles are separated on some axis. Touching edges do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.x >= other.right()
            || self.y >= other.bottom()
            || self.right() <= other.x
            || self.bottom() <= other.y)
    }

    /// True if all four edges of `other` lie within `self` (inclusive).
    pub fn contains(&self, other: &Rect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    /// Guillotine cut: the parts of `self` outside `other`.
    ///
    /// Returns `[self]` when the two do not overlap. Otherwise each piece is `self` clipped to
    /// the half-plane beyond one edge of `other`, emitted in left, top, right, bottom order.
    /// Pieces may overlap each other; only pieces with positive area are kept.
    pub fn subtract(&self, other: &Rect) -> Vec<Rect> {
        if !self.overlaps(other) {
            return vec![*self];
        }
        let mut pieces = Vec::with_capacity(4);
        if self.left() < other.left() {
            let mut piece = *self;
            piece.enlarge_right_to(other.left());
            pieces.push(piece);
        }
        if self.top() < other.top() {
            let mut piece = *self;
            piece.enlarge_bottom_to(other.top());
            pieces.push(piece);
        }
        if self.right() > other.right() {
            let mut piece = *self;
            piece.enlarge_left_to(other.right());
            pieces.push(piece);
        }
        if self.bottom() > other.bottom() {
            let mut piece = *self;
            piece.enlarge_top_to(other.bottom());
            pieces.push(piece);
        }
        pieces.retain(|p| !p.is_empty());
        pieces
    }
}
