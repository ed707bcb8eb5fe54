use log::{debug, info};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::cellslice::{LabelId, Slice};
use crate::error::{ReconError, Result};
use crate::labelmap::LabelMap;
use crate::matcher::{link_layers_with_policy, LinkPolicy};
use crate::reconcell::ReconstructedCell;

// Index of a reconstructed cell within a `Reconstruction`.
pub type CellIndex = usize;

// A slice in the stack: (layer, label).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SliceKey {
    pub layer: usize,
    pub id: LabelId,
}

impl SliceKey {
    pub fn new(layer: usize, id: LabelId) -> Self {
        SliceKey { layer, id }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct ReconstructionConfig {
    pub start_layer: usize,
    pub link_policy: LinkPolicy,

    // Start a new cell for every slice in layer z+1 that no slice in layer z
    // linked to, instead of leaving it out of the reconstruction.
    pub spawn_unlinked: bool,
}

pub struct Reconstruction {
    label_maps: Vec<LabelMap>,
    cells: Vec<ReconstructedCell>,
    lookup: HashMap<SliceKey, CellIndex>,
    config: ReconstructionConfig,

    // next layer `extend` will accept
    next_layer: usize,
}

impl Reconstruction {
    // Seed one cell per label in the start layer.
    pub fn new(label_maps: Vec<LabelMap>, config: ReconstructionConfig) -> Result<Self> {
        if label_maps.is_empty() {
            return Err(ReconError::EmptyStack);
        }

        let start = config.start_layer;
        if start >= label_maps.len() {
            return Err(ReconError::StartLayerOutOfRange {
                start,
                nlayers: label_maps.len(),
            });
        }

        let mut recon = Reconstruction {
            label_maps,
            cells: Vec::new(),
            lookup: HashMap::new(),
            config,
            next_layer: start,
        };

        let seed_ids = recon.label_maps[start].all_ids();
        for id in seed_ids {
            recon.spawn_cell(start, id)?;
        }
        info!("Seeded {} cells from layer {}", recon.cells.len(), start);

        Ok(recon)
    }

    // Assemble a reconstruction from previously computed cells, given as lists
    // of (layer, label) in insertion order. No further extension is possible.
    pub fn from_records(label_maps: Vec<LabelMap>, records: &[Vec<SliceKey>]) -> Result<Self> {
        if label_maps.is_empty() {
            return Err(ReconError::EmptyStack);
        }

        let nlayers = label_maps.len();
        let mut recon = Reconstruction {
            label_maps,
            cells: Vec::with_capacity(records.len()),
            lookup: HashMap::new(),
            config: ReconstructionConfig::default(),
            next_layer: nlayers - 1,
        };

        for record in records {
            let mut keys = record.iter();
            let first = match keys.next() {
                Some(first) => first,
                None => continue,
            };

            let i = recon.spawn_cell(first.layer, first.id)?;
            for key in keys {
                let slice = recon.slice_for(*key)?;
                recon.cells[i].add_slice(key.layer, slice)?;
                recon.lookup.insert(*key, i);
            }
        }
        info!("Loaded {} reconstructed cells", recon.cells.len());

        Ok(recon)
    }

    fn slice_for(&self, key: SliceKey) -> Result<Arc<Slice>> {
        self.label_maps
            .get(key.layer)
            .and_then(|map| map.slice(key.id))
            .cloned()
            .ok_or(ReconError::UnknownSlice {
                layer: key.layer,
                id: key.id,
            })
    }

    fn spawn_cell(&mut self, layer: usize, id: LabelId) -> Result<CellIndex> {
        let slice = self.slice_for(SliceKey::new(layer, id))?;
        self.cells.push(ReconstructedCell::new(layer, slice));
        let i = self.cells.len() - 1;
        self.lookup.insert(SliceKey::new(layer, id), i);
        Ok(i)
    }

    // Grow cells from layer `z` into layer `z + 1`. Must be called once for
    // each layer, in order, starting at the start layer.
    pub fn extend(&mut self, z: usize) -> Result<()> {
        if z != self.next_layer {
            return Err(ReconError::OutOfOrderExtend {
                expected: self.next_layer,
                requested: z,
            });
        }
        if z + 1 >= self.label_maps.len() {
            return Err(ReconError::StackExhausted {
                layer: z,
                nlayers: self.label_maps.len(),
            });
        }

        let links = link_layers_with_policy(
            &self.label_maps[z],
            &self.label_maps[z + 1],
            self.config.link_policy,
        );

        let mut nspawned = 0;
        for (&from, &to) in &links {
            let slice = self.slice_for(SliceKey::new(z + 1, to))?;
            let i = match self.lookup.get(&SliceKey::new(z, from)) {
                Some(&i) => {
                    self.cells[i].add_slice(z + 1, slice)?;
                    i
                }
                None => {
                    // predecessor was never tracked, so this starts a new cell
                    self.cells.push(ReconstructedCell::new(z + 1, slice));
                    nspawned += 1;
                    self.cells.len() - 1
                }
            };
            self.lookup.insert(SliceKey::new(z + 1, to), i);
        }

        if self.config.spawn_unlinked {
            let targets: BTreeSet<LabelId> = links.values().cloned().collect();
            let unlinked: Vec<LabelId> = self.label_maps[z + 1]
                .all_ids()
                .into_iter()
                .filter(|id| !targets.contains(id))
                .collect();
            for id in unlinked {
                self.spawn_cell(z + 1, id)?;
                nspawned += 1;
            }
        }

        debug!(
            "Layer {} -> {}: {} links, {} new cells",
            z,
            z + 1,
            links.len(),
            nspawned
        );

        self.next_layer = z + 1;
        Ok(())
    }

    // Extend through every remaining layer.
    pub fn extend_all(&mut self) -> Result<()> {
        while !self.is_complete() {
            self.extend(self.next_layer)?;
        }
        Ok(())
    }

    pub fn next_layer(&self) -> usize {
        self.next_layer
    }

    pub fn is_complete(&self) -> bool {
        self.next_layer + 1 >= self.label_maps.len()
    }

    pub fn label_maps(&self) -> &[LabelMap] {
        &self.label_maps
    }

    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    pub fn cells(&self) -> &[ReconstructedCell] {
        &self.cells
    }

    // The cell currently registered for a slice, if that slice was ever linked.
    pub fn cell_for(&self, layer: usize, id: LabelId) -> Option<&ReconstructedCell> {
        self.lookup
            .get(&SliceKey::new(layer, id))
            .map(|&i| &self.cells[i])
    }

    pub fn cells_with_min_extent(&self, min_extent: usize) -> Vec<&ReconstructedCell> {
        self.cells
            .iter()
            .filter(|cell| cell.z_extent() >= min_extent)
            .collect()
    }
}
