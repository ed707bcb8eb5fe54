use ndarray::Array2;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock};

use crate::cellslice::{LabelId, Slice, BACKGROUND_LABEL};
use crate::coords::Coordinate;

pub type SliceMap = BTreeMap<LabelId, Arc<Slice>>;

// One layer of the stack: the decoded label array and, once requested, the
// slices it contains. The slice map is computed at most once.
pub struct LabelMap {
    labels: Array2<LabelId>,
    cells: OnceLock<SliceMap>,
}

impl LabelMap {
    pub fn decode(labels: Array2<LabelId>) -> Self {
        LabelMap {
            labels,
            cells: OnceLock::new(),
        }
    }

    pub fn labels(&self) -> &Array2<LabelId> {
        &self.labels
    }

    // (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        self.labels.dim()
    }

    pub fn cells(&self) -> &SliceMap {
        self.cells.get_or_init(|| slices_from_label_array(&self.labels))
    }

    pub fn slice(&self, id: LabelId) -> Option<&Arc<Slice>> {
        self.cells().get(&id)
    }

    pub fn label_at(&self, row: usize, col: usize) -> Option<LabelId> {
        self.labels.get((row, col)).cloned()
    }

    // The slice covering `position`, or None for background and positions
    // outside the array.
    pub fn cell_at(&self, position: &Coordinate) -> Option<&Arc<Slice>> {
        let (row, col) = position.to_index()?;
        match self.label_at(row, col) {
            None | Some(BACKGROUND_LABEL) => None,
            Some(id) => self.slice(id),
        }
    }

    pub fn all_ids(&self) -> BTreeSet<LabelId> {
        self.labels
            .iter()
            .cloned()
            .filter(|&id| id != BACKGROUND_LABEL)
            .collect()
    }
}

// Gather the pixels of every non-background label in a single row-major pass.
fn slices_from_label_array(labels: &Array2<LabelId>) -> SliceMap {
    let mut coords: BTreeMap<LabelId, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
    for ((row, col), &id) in labels.indexed_iter() {
        if id == BACKGROUND_LABEL {
            continue;
        }
        let entry = coords.entry(id).or_default();
        entry.0.push(row);
        entry.1.push(col);
    }

    coords
        .into_iter()
        .map(|(id, (xs, ys))| (id, Arc::new(Slice::new(id, xs, ys))))
        .collect()
}
