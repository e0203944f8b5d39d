//! Axis-aligned bounding boxes.
//!
//! Entities own a [`Bounds`] rather than being one, so simulation types
//! never depend on a rendering library's rectangle.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};

/// Axis-aligned box, origin at the top-left corner, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Top edge.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
    /// Horizontal extent.
    #[serde(with = "fixed_serde")]
    pub width: Fixed,
    /// Vertical extent.
    #[serde(with = "fixed_serde")]
    pub height: Fixed,
}

impl Bounds {
    /// Create a new box.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed, width: Fixed, height: Fixed) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive).
    #[must_use]
    pub fn right(&self) -> Fixed {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[must_use]
    pub fn bottom(&self) -> Fixed {
        self.y.saturating_add(self.height)
    }

    /// Whether the two boxes share interior area.
    ///
    /// Boxes that only touch along an edge do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Shift the box horizontally, pinning at the numeric range.
    pub fn translate_x(&mut self, dx: Fixed) {
        self.x = self.x.saturating_add(dx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Bounds {
        Bounds::new(
            Fixed::from_num(x),
            Fixed::from_num(y),
            Fixed::from_num(w),
            Fixed::from_num(h),
        )
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = rect(0, 0, 10, 10);
        let b = rect(5, 5, 10, 10);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = rect(0, 0, 10, 10);
        let right = rect(10, 0, 10, 10);
        let below = rect(0, 10, 10, 10);
        assert!(!a.overlaps(&right));
        assert!(!a.overlaps(&below));
    }

    #[test]
    fn test_vertical_separation_prevents_overlap() {
        let a = rect(0, 0, 10, 10);
        let b = rect(0, 20, 10, 10);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_translate_and_edges() {
        let mut a = rect(50, 50, 200, 300);
        assert_eq!(a.right(), Fixed::from_num(250));
        assert_eq!(a.bottom(), Fixed::from_num(350));

        a.translate_x(Fixed::from_num(-20));
        assert_eq!(a.x, Fixed::from_num(30));
    }

    #[test]
    fn test_translate_pins_at_range_edge() {
        let mut a = rect(50, 50, 200, 300);
        a.translate_x(Fixed::MAX);
        assert_eq!(a.x, Fixed::MAX);
        assert_eq!(a.right(), Fixed::MAX);

        let mut b = rect(-50, 0, 10, 10);
        b.translate_x(Fixed::MIN);
        assert_eq!(b.x, Fixed::MIN);
        assert!(!a.overlaps(&b));
    }
}
