use clap::ValueEnum;
use log::{debug, warn};
use std::collections::BTreeMap;

use crate::cellslice::{LabelId, Slice};
use crate::labelmap::LabelMap;

// Cross sections of one cell in adjacent layers are assumed to change area by
// less than half and to drift less than 20 pixels.
pub const MIN_AREA_RATIO: f64 = 0.5;
pub const MAX_AREA_RATIO: f64 = 1.5;
pub const MAX_CENTROID_DISTANCE: f64 = 20.0;

pub type LayerLinks = BTreeMap<LabelId, LabelId>;

// How to resolve several slices in one layer linking to the same slice in the next.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum LinkPolicy {
    // Keep every link. Links are applied in ascending source order, so the
    // highest source ID ends up owning the target in the lookup table.
    #[default]
    LastWins,
    // Drop all links into a target claimed by more than one source.
    RejectContested,
}

pub fn same_cell(a: Option<&Slice>, b: Option<&Slice>) -> bool {
    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };

    let area_ratio = a.pixel_area() as f64 / b.pixel_area() as f64;
    let dist = a.centroid().distance(&b.centroid());

    MIN_AREA_RATIO < area_ratio && area_ratio < MAX_AREA_RATIO && dist < MAX_CENTROID_DISTANCE
}

// Link each slice in `map_a` to whatever slice of `map_b` sits under its
// centroid, provided the two pass `same_cell`.
pub fn link_layers(map_a: &LabelMap, map_b: &LabelMap) -> LayerLinks {
    let mut links = LayerLinks::new();
    for slice in map_a.cells().values() {
        let candidate = map_b.cell_at(&slice.centroid()).map(|c| &**c);
        if same_cell(Some(&**slice), candidate) {
            if let Some(candidate) = candidate {
                links.insert(slice.id, candidate.id);
            }
        }
    }
    links
}

pub fn link_layers_with_policy(
    map_a: &LabelMap,
    map_b: &LabelMap,
    policy: LinkPolicy,
) -> LayerLinks {
    let links = link_layers(map_a, map_b);
    match policy {
        LinkPolicy::LastWins => links,
        LinkPolicy::RejectContested => reject_contested(links),
    }
}

fn reject_contested(links: LayerLinks) -> LayerLinks {
    let mut claims: BTreeMap<LabelId, usize> = BTreeMap::new();
    for &to in links.values() {
        *claims.entry(to).or_insert(0) += 1;
    }

    let ncontested = claims.values().filter(|&&n| n > 1).count();
    if ncontested > 0 {
        warn!("Dropping links into {} contested slices", ncontested);
    }

    let before = links.len();
    let links: LayerLinks = links
        .into_iter()
        .filter(|(_, to)| claims[to] == 1)
        .collect();
    debug!("Kept {} of {} links", links.len(), before);
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn square(id: LabelId, row: usize, col: usize, side: usize) -> Slice {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for i in row..row + side {
            for j in col..col + side {
                xs.push(i);
                ys.push(j);
            }
        }
        Slice::new(id, xs, ys)
    }

    fn strip(id: LabelId, row: usize, col: usize, len: usize) -> Slice {
        Slice::new(id, vec![row; len], (col..col + len).collect())
    }

    fn paint(
        labels: &mut Array2<LabelId>,
        id: LabelId,
        rows: std::ops::Range<usize>,
        cols: std::ops::Range<usize>,
    ) {
        for i in rows {
            for j in cols.clone() {
                labels[[i, j]] = id;
            }
        }
    }

    #[test]
    fn test_same_cell_requires_both() {
        let a = square(1, 0, 0, 4);
        assert!(!same_cell(Some(&a), None));
        assert!(!same_cell(None, Some(&a)));
        assert!(!same_cell(None, None));
        assert!(same_cell(Some(&a), Some(&a)));
    }

    #[test]
    fn test_same_cell_area_ratio_is_asymmetric() {
        let a = strip(1, 5, 0, 10);
        let b = strip(2, 5, 0, 19);
        assert!(a.centroid().distance(&b.centroid()) < MAX_CENTROID_DISTANCE);

        // 10 / 19 = 0.526
        assert!(same_cell(Some(&a), Some(&b)));
        // 19 / 10 = 1.9
        assert!(!same_cell(Some(&b), Some(&a)));
    }

    #[test]
    fn test_same_cell_ratio_bounds_are_exclusive() {
        let a = strip(1, 0, 0, 10);
        let half = strip(2, 0, 0, 20);
        let one_and_half = strip(3, 0, 0, 15);
        // 10 / 20 = 0.5
        assert!(!same_cell(Some(&a), Some(&half)));
        // 15 / 10 = 1.5
        assert!(!same_cell(Some(&one_and_half), Some(&a)));
    }

    #[test]
    fn test_same_cell_distance() {
        let a = square(1, 0, 0, 3);
        let near = square(2, 19, 0, 3);
        let far = square(3, 20, 0, 3);
        assert!(same_cell(Some(&a), Some(&near)));
        assert!(!same_cell(Some(&a), Some(&far)));
    }

    #[test]
    fn test_link_identical_layers() {
        let mut labels = Array2::zeros((40, 40));
        paint(&mut labels, 1, 0..5, 0..5);
        paint(&mut labels, 2, 10..20, 10..18);
        paint(&mut labels, 3, 30..36, 2..9);

        let a = LabelMap::decode(labels.clone());
        let b = LabelMap::decode(labels);
        let links = link_layers(&a, &b);

        assert_eq!(links.len(), 3);
        for (from, to) in links {
            assert_eq!(from, to);
        }
    }

    #[test]
    fn test_link_centroid_on_background() {
        // the centroid of label 1 lands on background in the next layer
        let mut labels_a = Array2::zeros((10, 10));
        paint(&mut labels_a, 1, 2..5, 2..5);
        let mut labels_b = Array2::zeros((10, 10));
        paint(&mut labels_b, 4, 0..2, 0..10);

        let links = link_layers(&LabelMap::decode(labels_a), &LabelMap::decode(labels_b));
        assert!(links.is_empty());
    }

    #[test]
    fn test_link_area_change_too_large() {
        let mut labels_a = Array2::zeros((20, 20));
        paint(&mut labels_a, 1, 8..10, 8..10);
        let mut labels_b = Array2::zeros((20, 20));
        paint(&mut labels_b, 2, 4..14, 4..14);

        let links = link_layers(&LabelMap::decode(labels_a), &LabelMap::decode(labels_b));
        assert!(links.is_empty());
    }

    fn contested_maps() -> (LabelMap, LabelMap) {
        // two halves in layer a, both centroids fall into one label in layer b
        let mut labels_a = Array2::zeros((20, 20));
        paint(&mut labels_a, 1, 5..15, 5..10);
        paint(&mut labels_a, 2, 5..15, 10..15);
        let mut labels_b = Array2::zeros((20, 20));
        paint(&mut labels_b, 9, 6..14, 5..15);
        (LabelMap::decode(labels_a), LabelMap::decode(labels_b))
    }

    #[test]
    fn test_contested_last_wins_keeps_links() {
        let (a, b) = contested_maps();
        let links = link_layers_with_policy(&a, &b, LinkPolicy::LastWins);
        assert_eq!(links.len(), 2);
        assert_eq!(links[&1], 9);
        assert_eq!(links[&2], 9);
    }

    #[test]
    fn test_contested_rejected() {
        let (a, b) = contested_maps();
        let links = link_layers_with_policy(&a, &b, LinkPolicy::RejectContested);
        assert!(links.is_empty());
    }
}
