use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::current_num_threads;
use std::path::PathBuf;

use cellstack::output::{write_cell_measurements, CellMeasurement};
use cellstack::persist::save_to_file;
use cellstack::schemas::OutputFormat;
use cellstack::stackio::{load_intensity_stack, load_label_maps};
use cellstack::{LinkPolicy, Reconstruction, ReconstructionConfig};

#[derive(Parser, Debug)]
#[command(name = "cellstack")]
#[command(about = "Link a directory of per-layer segmentation label images into 3D cells.")]
struct Args {
    // Directory of label images, one per layer, in natural filename order.
    seg_dir: PathBuf,

    // Reconstruction output, one `layer:label,...` line per cell.
    output: PathBuf,

    #[arg(long, default_value_t = 0)]
    start_layer: usize,

    #[arg(long, default_value_t = 1)]
    min_z_extent: usize,

    #[arg(long, value_enum, default_value_t = LinkPolicy::LastWins)]
    link_policy: LinkPolicy,

    #[arg(long, default_value_t = false)]
    spawn_unlinked: bool,

    // Only read when measurements are written.
    #[arg(long, default_value = None, requires = "output_measurements")]
    intensity_dir: Option<PathBuf>,

    #[arg(long, default_value = None)]
    output_measurements: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Infer)]
    output_measurements_fmt: OutputFormat,

    #[arg(short = 't', long, default_value = None)]
    nthreads: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Some(nthreads) = args.nthreads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(nthreads)
            .build_global()?;
    }
    info!("Using {} threads", current_num_threads());

    let label_maps = load_label_maps(&args.seg_dir)
        .with_context(|| format!("Unable to read label images from {}", args.seg_dir.display()))?;
    let shape = label_maps.first().map(|map| map.shape());

    let config = ReconstructionConfig {
        start_layer: args.start_layer,
        link_policy: args.link_policy,
        spawn_unlinked: args.spawn_unlinked,
    };
    let nlayers = label_maps.len();
    let mut recon = Reconstruction::new(label_maps, config)?;

    let progress = ProgressBar::new(nlayers.saturating_sub(args.start_layer + 1) as u64);
    progress.set_style(
        ProgressStyle::with_template("{prefix} {bar:40} {pos}/{len} layers")?
            .progress_chars("##-"),
    );
    progress.set_prefix("Linking");
    while !recon.is_complete() {
        recon.extend(recon.next_layer())?;
        progress.inc(1);
    }
    progress.finish();

    let cells = recon.cells_with_min_extent(args.min_z_extent);
    info!(
        "Reconstructed {} cells, {} spanning at least {} layers",
        recon.cells().len(),
        cells.len(),
        args.min_z_extent
    );

    save_to_file(&args.output, cells.iter().cloned())
        .with_context(|| format!("Unable to write {}", args.output.display()))?;

    if let Some(output_measurements) = &args.output_measurements {
        let intensities = match &args.intensity_dir {
            Some(dir) => Some(load_intensity_stack(dir, shape)?),
            None => None,
        };

        let mut rows = Vec::with_capacity(cells.len());
        for (i, rcell) in cells.iter().enumerate() {
            let row = CellMeasurement::new(i as u32, rcell);
            let row = match &intensities {
                Some(intensities) => row.with_intensity(*rcell, intensities)?,
                None => row,
            };
            rows.push(row);
        }

        write_cell_measurements(output_measurements, args.output_measurements_fmt, &rows)?;
    }

    Ok(())
}
