use std::path::PathBuf;

use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;

use rusty_spectra::table::export::to_record_batch;
use rusty_spectra::{Experiment, ExportConfig, ExportFormat};

/// Flatten the results of an experiment document into CSV or Parquet tables.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Experiment JSON document.
    input: PathBuf,

    /// Output directory (default: current directory).
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    format: Option<ExportFormat>,

    /// Write one combined table instead of one per result.
    #[arg(short, long)]
    single: bool,

    /// JSON export configuration; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the combined table to stdout as well.
    #[arg(short, long)]
    preview: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ExportConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ExportConfig::default(),
    };
    if let Some(out) = cli.out {
        config.output_dir = out;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    config.single_file |= cli.single;

    let experiment = Experiment::read_json(&cli.input)
        .with_context(|| format!("loading experiment {}", cli.input.display()))?;
    log::info!(
        "experiment '{}': {} results, {} distinct",
        experiment.sample_name(),
        experiment.results().len(),
        experiment.result_names().len()
    );

    if cli.preview {
        let table = experiment
            .results_to_single_dataframe()
            .context("flattening results")?;
        let batch = to_record_batch(&table).context("building preview")?;
        println!("{}", pretty_format_batches(&[batch]).context("formatting preview")?);
    }

    let written = config.export(&experiment).context("exporting results")?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}
