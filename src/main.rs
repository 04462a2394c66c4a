use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use neutrino_direction::config::PipelineConfig;
use neutrino_direction::data::{loader, split, writer};
use neutrino_direction::folds::assign_folds;

/// Assign stratified cross-validation folds to an event metadata table.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input metadata table (.parquet, .csv or .json).
    #[arg(long)]
    input: PathBuf,

    /// Where to write the table with `n_pulses`, `bins` and `fold` added.
    #[arg(long)]
    output: PathBuf,

    /// JSON file with `folds` / `split` sections.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `folds.n_splits`.
    #[arg(long)]
    n_splits: Option<usize>,

    /// Overrides `folds.random_state`.
    #[arg(long)]
    random_state: Option<u64>,

    /// Report the train/valid split for this fold after writing.  Overrides
    /// `split.fold_index`.
    #[arg(long)]
    valid_fold: Option<i64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(n) = cli.n_splits {
        config.folds.n_splits = n;
    }
    if let Some(seed) = cli.random_state {
        config.folds.random_state = seed;
    }

    let mut table = loader::load_file(&cli.input)
        .with_context(|| format!("loading {}", cli.input.display()))?;
    info!("loaded {} events from {}", table.len(), cli.input.display());

    let summary = assign_folds(&mut table, &config.folds).context("assigning folds")?;
    info!("bin edges (log10 n_pulses): {:?}", summary.bin_edges);
    info!("events per bin: {:?}", summary.bin_sizes);

    writer::write_file(&table, &cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;

    if let Some(fold) = config.split.validation_fold(cli.valid_fold) {
        let fold_split = split::split_by_fold(&table, fold)
            .with_context(|| format!("splitting on fold {fold}"))?;
        info!(
            "{:.1} train steps per epoch at batch size {}",
            fold_split.train_steps(config.split.batch_size),
            config.split.batch_size
        );
        if let Some(first) = fold_split.valid.first() {
            let root = cli.input.parent().unwrap_or(Path::new("."));
            let payload =
                split::event_path(root, &config.split.events_dir, first.batch_id, first.event_id);
            info!("first validation payload: {}", payload.display());
        }
    }

    Ok(())
}
