use arrow::array::RecordBatch;
use arrow::csv;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression::ZSTD, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use crate::error::{ReconError, Result};
use crate::persist::cell_record;
use crate::reconcell::{IntensityStack, ReconstructedCell};
use crate::schemas::{cell_measurement_schema, OutputFormat};

// One row of the per-cell measurement table.
#[derive(Clone, Debug, PartialEq)]
pub struct CellMeasurement {
    pub cell: u32,
    pub first_layer: u32,
    pub last_layer: u32,
    pub z_extent: u32,
    pub pixel_area: u64,
    pub slices: String,
    pub intensity: Option<(f64, f64)>,
}

impl CellMeasurement {
    pub fn new(cell: u32, rcell: &ReconstructedCell) -> Self {
        CellMeasurement {
            cell,
            first_layer: rcell.first_layer().unwrap_or(0) as u32,
            last_layer: rcell.last_layer().unwrap_or(0) as u32,
            z_extent: rcell.z_extent() as u32,
            pixel_area: rcell.pixel_area() as u64,
            slices: cell_record(rcell),
            intensity: None,
        }
    }

    pub fn with_intensity<S>(mut self, rcell: &ReconstructedCell, intensities: &S) -> Result<Self>
    where
        S: IntensityStack + ?Sized,
    {
        let total = rcell.measure_total_intensity(intensities)?;
        let mean = rcell.measure_mean_intensity(intensities)?;
        self.intensity = Some((total, mean));
        Ok(self)
    }
}

pub fn determine_format(filename: &str, fmt: OutputFormat) -> Result<OutputFormat> {
    if fmt != OutputFormat::Infer {
        return Ok(fmt);
    }

    if filename.ends_with(".csv.gz") {
        Ok(OutputFormat::CsvGz)
    } else if filename.ends_with(".csv") {
        Ok(OutputFormat::Csv)
    } else if filename.ends_with(".parquet") {
        Ok(OutputFormat::Parquet)
    } else {
        Err(ReconError::UnknownFormat(filename.to_string()))
    }
}

fn measurement_batch(rows: &[CellMeasurement]) -> Result<RecordBatch> {
    // intensity columns are written only if every row has them
    let with_intensity = !rows.is_empty() && rows.iter().all(|row| row.intensity.is_some());
    let schema = cell_measurement_schema(with_intensity);

    let mut columns: Vec<Arc<dyn arrow::array::Array>> = vec![
        Arc::new(rows.iter().map(|row| row.cell).collect::<arrow::array::UInt32Array>()),
        Arc::new(rows.iter().map(|row| row.first_layer).collect::<arrow::array::UInt32Array>()),
        Arc::new(rows.iter().map(|row| row.last_layer).collect::<arrow::array::UInt32Array>()),
        Arc::new(rows.iter().map(|row| row.z_extent).collect::<arrow::array::UInt32Array>()),
        Arc::new(rows.iter().map(|row| row.pixel_area).collect::<arrow::array::UInt64Array>()),
        Arc::new(
            rows.iter()
                .map(|row| Some(row.slices.as_str()))
                .collect::<arrow::array::StringArray>(),
        ),
    ];

    if with_intensity {
        columns.push(Arc::new(
            rows.iter()
                .map(|row| row.intensity.map(|(total, _)| total))
                .collect::<arrow::array::Float64Array>(),
        ));
        columns.push(Arc::new(
            rows.iter()
                .map(|row| row.intensity.map(|(_, mean)| mean))
                .collect::<arrow::array::Float64Array>(),
        ));
    }

    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

pub fn write_cell_measurements(
    filename: &str,
    fmt: OutputFormat,
    rows: &[CellMeasurement],
) -> Result<()> {
    let fmt = determine_format(filename, fmt)?;
    let batch = measurement_batch(rows)?;
    let file = File::create(filename)?;

    match fmt {
        OutputFormat::Csv => {
            write_table_csv(file, &batch)?;
        }
        OutputFormat::CsvGz => {
            let encoder = GzEncoder::new(file, Compression::default());
            write_table_csv(encoder, &batch)?.finish()?;
        }
        OutputFormat::Parquet => {
            write_table_parquet(file, &batch)?;
        }
        OutputFormat::Infer => unreachable!("format was resolved above"),
    }

    info!("Wrote measurements for {} cells to {}", rows.len(), filename);
    Ok(())
}

fn write_table_csv<W: Write>(output: W, batch: &RecordBatch) -> Result<W> {
    let mut writer = csv::WriterBuilder::new().with_header(true).build(output);
    writer.write(batch)?;
    Ok(writer.into_inner())
}

fn write_table_parquet(output: File, batch: &RecordBatch) -> Result<File> {
    let props = WriterProperties::builder()
        .set_compression(ZSTD(ZstdLevel::try_new(3)?))
        .build();

    let mut writer = ArrowWriter::try_new(output, batch.schema(), Some(props))?;
    writer.write(batch)?;
    Ok(writer.into_inner()?)
}
