//! A position in the grid.

use serde::{Deserialize, Serialize};

/// A single `(x, y)` coordinate on a [`Map`](crate::map::Map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    /// Manhattan distance between two points.
    pub fn manhattan_distance(self, other: Point) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Whether `self` is a single orthogonal step away from `other`.
    pub fn is_single_step_from(self, other: Point) -> bool {
        self.manhattan_distance(other) == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_is_symmetric() {
        let a = Point::new(1, 1);
        let b = Point::new(4, 5);
        assert_eq!(a.manhattan_distance(b), 7);
        assert_eq!(b.manhattan_distance(a), 7);
    }

    #[test]
    fn single_step_detects_diagonals() {
        let origin = Point::new(1, 1);
        assert!(origin.is_single_step_from(Point::new(2, 1)));
        assert!(origin.is_single_step_from(Point::new(1, 2)));
        assert!(!origin.is_single_step_from(Point::new(2, 2)));
        assert!(!origin.is_single_step_from(Point::new(1, 1)));
    }
}
