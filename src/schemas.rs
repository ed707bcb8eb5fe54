// Table schemas shared by both binaries.

use arrow::datatypes::{DataType, Field, Schema};
use clap::ValueEnum;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    Infer,
    Csv,
    CsvGz,
    Parquet,
}

pub fn cell_measurement_schema(with_intensity: bool) -> Schema {
    let mut fields = vec![
        Field::new("cell", DataType::UInt32, false),
        Field::new("first_layer", DataType::UInt32, false),
        Field::new("last_layer", DataType::UInt32, false),
        Field::new("z_extent", DataType::UInt32, false),
        Field::new("pixel_area", DataType::UInt64, false),
        Field::new("slices", DataType::Utf8, false),
    ];

    if with_intensity {
        fields.push(Field::new("total_intensity", DataType::Float64, false));
        fields.push(Field::new("mean_intensity", DataType::Float64, false));
    }

    Schema::new(fields)
}
