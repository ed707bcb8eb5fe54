// Plain text form of a reconstruction: one line per cell, each a comma
// separated list of `layer:label` in the order the slices were added.

use itertools::Itertools;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::error::{ReconError, Result};
use crate::reconcell::ReconstructedCell;
use crate::reconstruction::SliceKey;

pub fn cell_record(cell: &ReconstructedCell) -> String {
    cell.iter()
        .map(|(layer, slice)| format!("{}:{}", layer, slice.id))
        .join(",")
}

pub fn write_reconstruction<'a, W, I>(output: &mut W, cells: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a ReconstructedCell>,
{
    let text = cells.into_iter().map(cell_record).join("\n");
    output.write_all(text.as_bytes())?;
    Ok(())
}

pub fn save_to_file<'a, I>(filename: &Path, cells: I) -> Result<()>
where
    I: IntoIterator<Item = &'a ReconstructedCell>,
{
    let mut output = BufWriter::new(File::create(filename)?);
    write_reconstruction(&mut output, cells)?;
    output.flush()?;
    info!("Wrote reconstruction to {}", filename.display());
    Ok(())
}

// Parse one record. `line` is 1-based and only used for error reporting.
pub fn parse_record(text: &str, line: usize) -> Result<Vec<SliceKey>> {
    text.trim()
        .split(',')
        .map(|pair| -> Result<SliceKey> {
            let (layer, id) = pair.split_once(':').ok_or_else(|| ReconError::MalformedRecord {
                line,
                reason: format!("expected 'layer:label', found '{}'", pair),
            })?;
            let layer = layer.trim().parse::<usize>().map_err(|e| ReconError::MalformedRecord {
                line,
                reason: format!("bad layer '{}': {}", layer, e),
            })?;
            let id = id.trim().parse::<u32>().map_err(|e| ReconError::MalformedRecord {
                line,
                reason: format!("bad label '{}': {}", id, e),
            })?;
            Ok(SliceKey::new(layer, id))
        })
        .collect()
}

// Blank lines are skipped.
pub fn read_records(text: &str) -> Result<Vec<Vec<SliceKey>>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| parse_record(line, i + 1))
        .collect()
}

pub fn load_from_file(filename: &Path) -> Result<Vec<Vec<SliceKey>>> {
    let mut text = String::new();
    File::open(filename)?.read_to_string(&mut text)?;
    read_records(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cellslice::{LabelId, Slice};
    use crate::labelmap::LabelMap;
    use crate::reconstruction::{Reconstruction, ReconstructionConfig};
    use ndarray::Array2;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn unit_slice(id: LabelId) -> Arc<Slice> {
        Arc::new(Slice::new(id, vec![0], vec![0]))
    }

    #[test]
    fn test_cell_record_keeps_insertion_order() {
        let mut cell = ReconstructedCell::new(2, unit_slice(5));
        cell.add_slice(0, unit_slice(10)).unwrap();
        cell.add_slice(1, unit_slice(57)).unwrap();
        assert_eq!(cell_record(&cell), "2:5,0:10,1:57");
    }

    #[test]
    fn test_write_has_no_trailing_newline() {
        let a = ReconstructedCell::new(0, unit_slice(1));
        let b = ReconstructedCell::new(0, unit_slice(2));
        let mut buf = Vec::new();
        write_reconstruction(&mut buf, [&a, &b]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "0:1\n0:2");
    }

    #[test]
    fn test_parse_record() {
        let keys = parse_record("0:5,1:10,2:57\n", 1).unwrap();
        assert_eq!(
            keys,
            vec![SliceKey::new(0, 5), SliceKey::new(1, 10), SliceKey::new(2, 57)]
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_record("0:5,15", 3),
            Err(ReconError::MalformedRecord { line: 3, .. })
        ));
        assert!(matches!(
            parse_record("a:5", 1),
            Err(ReconError::MalformedRecord { line: 1, .. })
        ));
        assert!(matches!(
            read_records("0:1\n\n1:-4"),
            Err(ReconError::MalformedRecord { line: 3, .. })
        ));
    }

    #[test]
    fn test_round_trip_reconstruction() {
        let mut layer = Array2::<LabelId>::zeros((20, 20));
        for i in 0..4 {
            for j in 0..4 {
                layer[[i, j]] = 1;
                layer[[i + 10, j + 10]] = 2;
            }
        }
        let maps: Vec<LabelMap> = (0..3).map(|_| LabelMap::decode(layer.clone())).collect();
        let mut recon = Reconstruction::new(maps, ReconstructionConfig::default()).unwrap();
        recon.extend_all().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recon.txt");
        save_to_file(&path, recon.cells()).unwrap();
        let records = load_from_file(&path).unwrap();

        assert_eq!(records.len(), recon.cells().len());
        for (record, cell) in records.iter().zip(recon.cells()) {
            let parsed: BTreeSet<SliceKey> = record.iter().cloned().collect();
            let expected: BTreeSet<SliceKey> = cell
                .iter()
                .map(|(layer, slice)| SliceKey::new(layer, slice.id))
                .collect();
            assert_eq!(parsed, expected);
        }

        let maps: Vec<LabelMap> = (0..3).map(|_| LabelMap::decode(layer.clone())).collect();
        let reloaded = Reconstruction::from_records(maps, &records).unwrap();
        assert_eq!(reloaded.cells().len(), 2);
        assert!(reloaded.cells().iter().all(|cell| cell.z_extent() == 3));
    }
}
