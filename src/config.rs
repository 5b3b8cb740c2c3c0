use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::experiment::Experiment;
use crate::error::Result;

/// Output format of flattened result tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Parquet,
}

/// Where and how result tables are written.
///
/// Every field is optional in a config file:
///
/// ```json
/// { "output_dir": "out", "format": "parquet", "single_file": true }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub format: ExportFormat,
    /// One combined table instead of one per sample/result pair.
    pub single_file: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            format: ExportFormat::Csv,
            single_file: false,
        }
    }
}

impl ExportConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write the experiment's results, creating the output directory if
    /// needed. Returns the files written.
    pub fn export(&self, experiment: &Experiment) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.output_dir)?;
        let dir = self.output_dir.as_path();
        let written = match (self.format, self.single_file) {
            (ExportFormat::Csv, false) => experiment.write_results_to_csv(dir)?,
            (ExportFormat::Csv, true) => vec![experiment.write_results_to_single_csv(dir)?],
            (ExportFormat::Parquet, false) => experiment.write_results_to_parquet(dir)?,
            (ExportFormat::Parquet, true) => vec![experiment.write_results_to_single_parquet(dir)?],
        };
        log::debug!("exported {} file(s) to {}", written.len(), dir.display());
        Ok(written)
    }
}
