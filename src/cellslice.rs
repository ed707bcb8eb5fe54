use std::fmt;

use crate::coords::Coordinate;

// Label value in a segmentation image. Zero is background.
pub type LabelId = u32;
pub const BACKGROUND_LABEL: LabelId = 0;

// The pixels of one label within one layer. Coordinates are kept as parallel
// row/column vectors in row-major scan order.
#[derive(Clone, Debug, PartialEq)]
pub struct Slice {
    pub id: LabelId,
    x_coords: Vec<usize>,
    y_coords: Vec<usize>,
}

impl Slice {
    // Panics if the coordinate vectors differ in length or are empty, since a
    // slice is always derived from at least one pixel of a label mask.
    pub fn new(id: LabelId, x_coords: Vec<usize>, y_coords: Vec<usize>) -> Self {
        assert_eq!(x_coords.len(), y_coords.len());
        assert!(!x_coords.is_empty(), "slice {} has no pixels", id);
        Slice {
            id,
            x_coords,
            y_coords,
        }
    }

    pub fn pixel_area(&self) -> usize {
        self.x_coords.len()
    }

    pub fn x_coords(&self) -> &[usize] {
        &self.x_coords
    }

    pub fn y_coords(&self) -> &[usize] {
        &self.y_coords
    }

    pub fn coords(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.x_coords.iter().cloned().zip(self.y_coords.iter().cloned())
    }

    pub fn centroid(&self) -> Coordinate {
        let sum = self
            .coords()
            .fold(Coordinate::default(), |acc, (x, y)| {
                acc + Coordinate::new(x as f64, y as f64)
            });
        sum / self.pixel_area() as f64
    }

    pub fn summary(&self) -> String {
        format!(
            "<ID: {}, pixel_area: {}, centroid: {}>",
            self.id,
            self.pixel_area(),
            self.centroid()
        )
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Slice, ID {}>", self.id)
    }
}
