use anyhow::Context;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use cellstack::output::{write_cell_measurements, CellMeasurement};
use cellstack::persist::load_from_file;
use cellstack::schemas::OutputFormat;
use cellstack::stackio::{load_intensity_stack, load_label_maps};
use cellstack::Reconstruction;

#[derive(Parser, Debug)]
#[command(name = "cellstack-measure")]
#[command(about = "Measure pixel volume and intensity of previously reconstructed cells.")]
struct Args {
    reconstruction: PathBuf,
    seg_dir: PathBuf,
    intensity_dir: PathBuf,

    #[arg(long, default_value = "cellstack-measurements.csv")]
    output: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Infer)]
    output_fmt: OutputFormat,

    #[arg(long, default_value_t = 1)]
    min_z_extent: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let records = load_from_file(&args.reconstruction)
        .with_context(|| format!("Unable to read {}", args.reconstruction.display()))?;
    let label_maps = load_label_maps(&args.seg_dir)
        .with_context(|| format!("Unable to read label images from {}", args.seg_dir.display()))?;
    let shape = label_maps.first().map(|map| map.shape());
    let recon = Reconstruction::from_records(label_maps, &records)?;

    let intensities = load_intensity_stack(&args.intensity_dir, shape).with_context(|| {
        format!(
            "Unable to read intensity images from {}",
            args.intensity_dir.display()
        )
    })?;

    // rows are numbered by record order in the reconstruction file
    let mut rows = Vec::new();
    for (i, rcell) in recon.cells().iter().enumerate() {
        if rcell.z_extent() < args.min_z_extent {
            continue;
        }
        rows.push(CellMeasurement::new(i as u32, rcell).with_intensity(rcell, &intensities)?);
    }
    info!("Measured {} of {} cells", rows.len(), recon.cells().len());

    write_cell_measurements(&args.output, args.output_fmt, &rows)?;

    Ok(())
}
