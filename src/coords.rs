use std::fmt;
use std::ops::{Add, Div};

// A point in pixel space. `x` is the row index and `y` the column index into a
// label array, so distances are measured in the same axes the arrays are indexed by.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Coordinate { x, y }
    }

    pub fn distance(&self, other: &Coordinate) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    // Truncate to an array index, or None if either component is negative or not finite.
    pub fn to_index(&self) -> Option<(usize, usize)> {
        if !self.x.is_finite() || !self.y.is_finite() || self.x < 0.0 || self.y < 0.0 {
            return None;
        }
        Some((self.x as usize, self.y as usize))
    }
}

impl Add for Coordinate {
    type Output = Coordinate;

    fn add(self, rhs: Coordinate) -> Coordinate {
        Coordinate::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Div<f64> for Coordinate {
    type Output = Coordinate;

    fn div(self, rhs: f64) -> Coordinate {
        Coordinate::new(self.x / rhs, self.y / rhs)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}
