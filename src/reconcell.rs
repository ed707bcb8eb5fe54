use ndarray::{Array2, Array3, ArrayView2, Axis};
use std::fmt;
use std::sync::Arc;

use crate::cellslice::Slice;
use crate::error::{ReconError, Result};

// Per-layer intensity images addressed by the same (row, column) pixel
// coordinates as the label arrays.
pub trait IntensityStack {
    fn layer(&self, z: usize) -> Option<ArrayView2<'_, f32>>;
}

impl IntensityStack for [Array2<f32>] {
    fn layer(&self, z: usize) -> Option<ArrayView2<'_, f32>> {
        self.get(z).map(|a| a.view())
    }
}

impl IntensityStack for Vec<Array2<f32>> {
    fn layer(&self, z: usize) -> Option<ArrayView2<'_, f32>> {
        self.as_slice().layer(z)
    }
}

// Indexed as [layer, row, column].
impl IntensityStack for Array3<f32> {
    fn layer(&self, z: usize) -> Option<ArrayView2<'_, f32>> {
        if z < self.len_of(Axis(0)) {
            Some(self.index_axis(Axis(0), z))
        } else {
            None
        }
    }
}

// Multiplier applied to a layer's summed intensity. Currently flat; deeper
// layers are not corrected for attenuation.
fn depth_correction(_layer: usize) -> f64 {
    1.0
}

// A 3D cell assembled from at most one slice per layer. Slices are kept in the
// order they were added, which is also the order they are written out in.
#[derive(Clone, Debug, Default)]
pub struct ReconstructedCell {
    slices: Vec<(usize, Arc<Slice>)>,
}

impl ReconstructedCell {
    pub fn new(layer: usize, slice: Arc<Slice>) -> Self {
        ReconstructedCell {
            slices: vec![(layer, slice)],
        }
    }

    pub fn add_slice(&mut self, layer: usize, slice: Arc<Slice>) -> Result<()> {
        if self.slice(layer).is_some() {
            return Err(ReconError::LayerOccupied { layer });
        }
        self.slices.push((layer, slice));
        Ok(())
    }

    pub fn slice(&self, layer: usize) -> Option<&Arc<Slice>> {
        self.slices
            .iter()
            .find(|(z, _)| *z == layer)
            .map(|(_, slice)| slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Arc<Slice>)> + '_ {
        self.slices.iter().map(|(z, slice)| (*z, slice))
    }

    pub fn layers(&self) -> impl Iterator<Item = usize> + '_ {
        self.slices.iter().map(|(z, _)| *z)
    }

    pub fn first_layer(&self) -> Option<usize> {
        self.layers().min()
    }

    pub fn last_layer(&self) -> Option<usize> {
        self.layers().max()
    }

    pub fn pixel_area(&self) -> usize {
        self.slices.iter().map(|(_, slice)| slice.pixel_area()).sum()
    }

    pub fn z_extent(&self) -> usize {
        self.slices.len()
    }

    pub fn measure_total_intensity<S>(&self, intensities: &S) -> Result<f64>
    where
        S: IntensityStack + ?Sized,
    {
        let mut total_intensity = 0.0;
        for (layer, slice) in self.iter() {
            let image = intensities
                .layer(layer)
                .ok_or(ReconError::MissingIntensityLayer { layer })?;

            let mut layer_intensity = 0.0;
            for (row, col) in slice.coords() {
                let value = image
                    .get((row, col))
                    .ok_or(ReconError::IntensityOutOfBounds { layer, row, col })?;
                layer_intensity += *value as f64;
            }

            total_intensity += depth_correction(layer) * layer_intensity;
        }

        Ok(total_intensity)
    }

    pub fn measure_mean_intensity<S>(&self, intensities: &S) -> Result<f64>
    where
        S: IntensityStack + ?Sized,
    {
        let area = self.pixel_area();
        if area == 0 {
            return Err(ReconError::EmptyCell);
        }
        Ok(self.measure_total_intensity(intensities)? / area as f64)
    }
}

impl fmt::Display for ReconstructedCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ReconstructedCell:")?;
        for (layer, slice) in self.iter() {
            write!(f, " {}: {}", layer, slice)?;
        }
        write!(f, ">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn cell_with_two_layers() -> ReconstructedCell {
        let mut cell = ReconstructedCell::new(0, Arc::new(Slice::new(1, vec![0, 0], vec![0, 1])));
        cell.add_slice(1, Arc::new(Slice::new(4, vec![1, 1, 1], vec![0, 1, 2])))
            .unwrap();
        cell
    }

    #[test]
    fn test_area_and_extent() {
        let cell = cell_with_two_layers();
        assert_eq!(cell.pixel_area(), 5);
        assert_eq!(cell.z_extent(), 2);
        assert_eq!(cell.first_layer(), Some(0));
        assert_eq!(cell.last_layer(), Some(1));
        assert_eq!(cell.slice(1).unwrap().id, 4);
        assert!(cell.slice(2).is_none());
    }

    #[test]
    fn test_add_slice_refuses_overwrite() {
        let mut cell = cell_with_two_layers();
        let res = cell.add_slice(1, Arc::new(Slice::new(8, vec![0], vec![0])));
        assert!(matches!(res, Err(ReconError::LayerOccupied { layer: 1 })));
        assert_eq!(cell.slice(1).unwrap().id, 4);
        assert_eq!(cell.z_extent(), 2);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut cell = ReconstructedCell::new(3, Arc::new(Slice::new(1, vec![0], vec![0])));
        cell.add_slice(1, Arc::new(Slice::new(2, vec![0], vec![0]))).unwrap();
        cell.add_slice(2, Arc::new(Slice::new(3, vec![0], vec![0]))).unwrap();
        assert_eq!(cell.layers().collect::<Vec<_>>(), vec![3, 1, 2]);
        assert_eq!(cell.first_layer(), Some(1));
        assert_eq!(cell.last_layer(), Some(3));
    }

    #[test]
    fn test_measure_intensity() {
        let cell = cell_with_two_layers();
        let intensities: Vec<Array2<f32>> = vec![
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            array![[10.0, 20.0, 30.0], [40.0, 50.0, 60.0]],
        ];

        // layer 0 sums (0,0) and (0,1), layer 1 sums row 1
        let total = cell.measure_total_intensity(&intensities).unwrap();
        assert_relative_eq!(total, 3.0 + 150.0);

        let mean = cell.measure_mean_intensity(&intensities).unwrap();
        assert_relative_eq!(mean, 153.0 / 5.0);
    }

    #[test]
    fn test_measure_intensity_array3() {
        let cell = cell_with_two_layers();
        let intensities = Array3::<f32>::ones((2, 2, 3));
        assert_relative_eq!(cell.measure_total_intensity(&intensities).unwrap(), 5.0);
        assert_relative_eq!(cell.measure_mean_intensity(&intensities).unwrap(), 1.0);
    }

    #[test]
    fn test_measure_intensity_missing_layer() {
        let cell = cell_with_two_layers();
        let intensities = vec![Array2::<f32>::ones((2, 3))];
        assert!(matches!(
            cell.measure_total_intensity(&intensities),
            Err(ReconError::MissingIntensityLayer { layer: 1 })
        ));
    }

    #[test]
    fn test_measure_intensity_out_of_bounds() {
        let cell = cell_with_two_layers();
        let intensities = vec![Array2::<f32>::ones((2, 3)), Array2::<f32>::ones((1, 3))];
        assert!(matches!(
            cell.measure_total_intensity(&intensities),
            Err(ReconError::IntensityOutOfBounds { layer: 1, row: 1, col: 0 })
        ));
    }

    #[test]
    fn test_mean_intensity_of_empty_cell() {
        let cell = ReconstructedCell::default();
        let intensities: Vec<Array2<f32>> = Vec::new();
        assert_eq!(cell.pixel_area(), 0);
        assert!(matches!(
            cell.measure_mean_intensity(&intensities),
            Err(ReconError::EmptyCell)
        ));
    }
}
