// Reading a z-stack from a directory of per-layer images.

use image::{DynamicImage, ImageReader};
use log::{debug, info};
use ndarray::Array2;
use num_traits::AsPrimitive;
use rayon::prelude::*;
use regex::Regex;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::cellslice::LabelId;
use crate::error::{ReconError, Result};
use crate::labelmap::LabelMap;

fn chunk_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+|\D+").expect("valid regex"))
}

// Compare digit runs by numeric value without parsing, so arbitrarily long
// runs can't overflow.
fn numeric_cmp(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

// Order strings the way people expect: "layer2" before "layer10".
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let re = chunk_regex();
    let mut a_chunks = re.find_iter(a).map(|m| m.as_str());
    let mut b_chunks = re.find_iter(b).map(|m| m.as_str());

    loop {
        match (a_chunks.next(), b_chunks.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let x_digits = x.as_bytes()[0].is_ascii_digit();
                let y_digits = y.as_bytes()[0].is_ascii_digit();
                let ord = match (x_digits, y_digits) {
                    (true, true) => numeric_cmp(x, y),
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (false, false) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

// Regular, non-hidden files in `dir`, in natural order of their names.
pub fn list_layer_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !entry.file_type()?.is_file() {
            debug!("Skipping {}", entry.path().display());
            continue;
        }
        files.push((name, entry.path()));
    }

    files.sort_by(|a, b| natural_cmp(&a.0, &b.0));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
}

fn to_array<T, U>(width: u32, height: u32, raw: &[T]) -> Result<Array2<U>>
where
    T: AsPrimitive<U>,
    U: Copy + 'static,
{
    let values = raw.iter().map(|&v| v.as_()).collect::<Vec<U>>();
    Ok(Array2::from_shape_vec((height as usize, width as usize), values)?)
}

fn pack_rgb(width: u32, height: u32, raw: &[u8], channels: usize) -> Result<Array2<LabelId>> {
    let values = raw
        .chunks_exact(channels)
        .map(|px| ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | (px[2] as u32))
        .collect::<Vec<LabelId>>();
    Ok(Array2::from_shape_vec((height as usize, width as usize), values)?)
}

// Decode a label image into a (row, column) array. Grayscale values are used
// as is; 8-bit color images are read as 24-bit labels packed from R, G and B.
pub fn decode_labels(path: &Path) -> Result<Array2<LabelId>> {
    let img = open_image(path)?;
    let (width, height) = (img.width(), img.height());
    match img {
        DynamicImage::ImageLuma8(buf) => to_array(width, height, buf.as_raw().as_slice()),
        DynamicImage::ImageLuma16(buf) => to_array(width, height, buf.as_raw().as_slice()),
        DynamicImage::ImageRgb8(buf) => pack_rgb(width, height, buf.as_raw().as_slice(), 3),
        DynamicImage::ImageRgba8(buf) => pack_rgb(width, height, buf.as_raw().as_slice(), 4),
        other => Err(ReconError::UnsupportedImage {
            path: path.to_path_buf(),
            color: format!("{:?}", other.color()),
        }),
    }
}

// Decode an intensity image. Integer grayscale keeps its raw values; anything
// else is reduced to 32-bit float luma.
pub fn decode_intensity(path: &Path) -> Result<Array2<f32>> {
    let img = open_image(path)?;
    let (width, height) = (img.width(), img.height());
    match img {
        DynamicImage::ImageLuma8(buf) => to_array(width, height, buf.as_raw().as_slice()),
        DynamicImage::ImageLuma16(buf) => to_array(width, height, buf.as_raw().as_slice()),
        other => to_array(width, height, other.to_luma32f().as_raw().as_slice()),
    }
}

// Decode every layer in `dir` and extract its slices. Layers are independent,
// so both steps run in parallel.
pub fn load_label_maps(dir: &Path) -> Result<Vec<LabelMap>> {
    let files = list_layer_files(dir)?;
    info!("Reading {} label layers from {}", files.len(), dir.display());

    let label_maps = files
        .par_iter()
        .map(|path| decode_labels(path).map(LabelMap::decode))
        .collect::<Result<Vec<LabelMap>>>()?;

    label_maps.par_iter().for_each(|map| {
        map.cells();
    });

    let nslices: usize = label_maps.iter().map(|map| map.cells().len()).sum();
    info!("Found {} slices", nslices);

    Ok(label_maps)
}

// Decode every intensity layer in `dir`, optionally requiring each to have
// `expected_shape` (rows, columns).
pub fn load_intensity_stack(
    dir: &Path,
    expected_shape: Option<(usize, usize)>,
) -> Result<Vec<Array2<f32>>> {
    let files = list_layer_files(dir)?;
    info!("Reading {} intensity layers from {}", files.len(), dir.display());

    files
        .par_iter()
        .map(|path| -> Result<Array2<f32>> {
            let layer = decode_intensity(path)?;
            if let Some(expected) = expected_shape {
                if layer.dim() != expected {
                    return Err(ReconError::ShapeMismatch {
                        path: path.clone(),
                        expected,
                        found: layer.dim(),
                    });
                }
            }
            Ok(layer)
        })
        .collect()
}
