use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::{json, Value as JsonValue};

use super::document;
use super::measurement::Measurement;
use super::record::{Record, RecordRole, Values};
use crate::error::{Error, Result};
use crate::table::{export, Cell, Column, Table};

/// Top-level document: one sample, its measurement and the quantities
/// derived from it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Experiment {
    sample_name: String,
    description: String,
    experiment_authors: Vec<String>,
    publication_bibtex: String,
    measurement: Option<Measurement>,
    results: Vec<Record>,
}

impl Experiment {
    pub fn new(sample_name: impl Into<String>) -> Self {
        Experiment {
            sample_name: sample_name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.experiment_authors.push(author.into());
        self
    }

    pub fn with_publication_bibtex(mut self, bibtex: impl Into<String>) -> Self {
        self.publication_bibtex = bibtex.into();
        self
    }

    pub fn with_measurement(mut self, measurement: Measurement) -> Self {
        self.measurement = Some(measurement);
        self
    }

    pub fn sample_name(&self) -> &str {
        &self.sample_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn experiment_authors(&self) -> &[String] {
        &self.experiment_authors
    }

    pub fn publication_bibtex(&self) -> &str {
        &self.publication_bibtex
    }

    pub fn measurement(&self) -> Option<&Measurement> {
        self.measurement.as_ref()
    }

    pub fn set_measurement(&mut self, measurement: Measurement) {
        self.measurement = Some(measurement);
    }

    pub fn results(&self) -> &[Record] {
        &self.results
    }

    pub fn add_result(&mut self, result: Record) {
        self.results.push(result);
    }

    /// Distinct result names in order of first appearance.
    pub fn result_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for result in &self.results {
            if !names.contains(&result.name()) {
                names.push(result.name());
            }
        }
        names
    }

    pub fn filter_results(&self, name: &str) -> Vec<&Record> {
        self.results.iter().filter(|r| r.name() == name).collect()
    }

    // -----------------------------------------------------------------------
    // Flattening
    // -----------------------------------------------------------------------

    /// One flat table per result name.
    ///
    /// Every result contributes `L` rows, `L` being the length of its
    /// longest axis: `sample` and `property` first, then one column per
    /// axis (scalar axes repeated to `L`), then `value`.
    pub fn results_to_nested_dict(&self) -> Result<IndexMap<String, Table>> {
        let mut tables = IndexMap::new();
        for name in self.result_names() {
            let mut table = Table::new();
            for result in self.filter_results(name) {
                table.append(&self.flatten_result(result)?);
            }
            log::debug!(
                "result '{}': {} rows x {} columns",
                name,
                table.n_rows(),
                table.n_cols()
            );
            tables.insert(name.to_string(), table);
        }
        Ok(tables)
    }

    fn flatten_result(&self, result: &Record) -> Result<Table> {
        let mut rows = ResultRows::default();
        rows.push("sample", Cell::from(self.sample_name.as_str()));
        rows.push("property", Cell::from(result.name()));

        for axis in result.axes() {
            match axis.values() {
                Values::Series(points) => {
                    // An empty axis still gets its column so `broadcast` rejects it.
                    rows.column_mut(axis.name());
                    for p in points {
                        rows.push(axis.name(), Cell::Number(*p));
                    }
                }
                Values::Scalar(v) => rows.push(axis.name(), Cell::Number(*v)),
            }
        }

        let len = rows.broadcast(result.name())?;
        let values = result.values();
        if values.len() != len {
            return Err(Error::shape_mismatch(
                format!("values of result '{}'", result.name()),
                len,
                values.len(),
            ));
        }
        rows.replace("value", values.iter().map(Cell::Number).collect());
        Ok(Table::from_columns(rows.columns))
    }

    /// Per-name tables keyed `<sample>_<property>`, whitespace in either
    /// part turned into underscores. Names that collapse onto the same key
    /// share one table.
    pub fn results_to_dataframe_dict(&self) -> Result<IndexMap<String, Table>> {
        let mut frames: IndexMap<String, Table> = IndexMap::new();
        for (property, table) in self.results_to_nested_dict()? {
            let key = self
                .sample_name
                .split_whitespace()
                .chain(property.split_whitespace())
                .collect::<Vec<_>>()
                .join("_");
            frames.entry(key).or_default().append(&table);
        }
        Ok(frames)
    }

    /// All result tables stacked; columns a table lacks are `Null`.
    pub fn results_to_single_dataframe(&self) -> Result<Table> {
        Ok(Table::concat(self.results_to_dataframe_dict()?.values()))
    }

    /// One `<key>.csv` per result table inside `dir`.
    pub fn write_results_to_csv(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.write_each(dir, "csv", export::write_csv)
    }

    /// Every result in `<sample name>.csv` inside `dir`.
    pub fn write_results_to_single_csv(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.csv", self.file_stem()));
        export::write_csv(&self.results_to_single_dataframe()?, &path)?;
        Ok(path)
    }

    pub fn write_results_to_parquet(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.write_each(dir, "parquet", export::write_parquet)
    }

    pub fn write_results_to_single_parquet(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.parquet", self.file_stem()));
        export::write_parquet(&self.results_to_single_dataframe()?, &path)?;
        Ok(path)
    }

    fn write_each(
        &self,
        dir: &Path,
        extension: &str,
        write: fn(&Table, &Path) -> Result<()>,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (key, table) in self.results_to_dataframe_dict()? {
            let path = dir.join(format!("{key}.{extension}"));
            write(&table, &path)?;
            written.push(path);
        }
        Ok(written)
    }

    fn file_stem(&self) -> &str {
        if self.sample_name.is_empty() {
            "results"
        } else {
            &self.sample_name
        }
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    pub fn to_dict(&self) -> JsonValue {
        json!({
            "sample_name": self.sample_name,
            "description": self.description,
            "experiment_authors": self.experiment_authors,
            "publication_bibtex": self.publication_bibtex,
            "measurement": self.measurement.as_ref().map(Measurement::to_dict),
            "results": self.results.iter().map(Record::to_dict).collect::<Vec<_>>(),
        })
    }

    pub fn from_dict(value: &JsonValue) -> Result<Experiment> {
        let obj = document::as_object(value, "")?;

        let measurement = match obj.get("measurement") {
            None | Some(JsonValue::Null) => None,
            Some(m) => Some(Measurement::parse(m, "measurement")?),
        };
        let results = document::array_field(obj, "", "results")?
            .iter()
            .enumerate()
            .map(|(i, v)| Record::parse(v, &document::index("results", i), RecordRole::Result))
            .collect::<Result<Vec<_>>>()?;

        Ok(Experiment {
            sample_name: document::string_field(obj, "", "sample_name")?,
            description: document::string_field(obj, "", "description")?,
            experiment_authors: document::string_list_field(obj, "", "experiment_authors")?,
            publication_bibtex: document::string_field(obj, "", "publication_bibtex")?,
            measurement,
            results,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_dict())?)
    }

    pub fn from_json(text: &str) -> Result<Experiment> {
        Experiment::from_dict(&serde_json::from_str(text)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &self.to_dict())?;
        writer.flush()?;
        log::info!("wrote experiment '{}' to {}", self.sample_name, path.display());
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Experiment> {
        let reader = BufReader::new(File::open(path)?);
        let doc: JsonValue = serde_json::from_reader(reader)?;
        Experiment::from_dict(&doc)
    }
}

// ---------------------------------------------------------------------------
// Row building for a single result
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ResultRows {
    columns: Vec<Column>,
}

impl ResultRows {
    fn column_mut(&mut self, name: &str) -> &mut Vec<Cell> {
        let pos = match self.columns.iter().position(|c| c.name == name) {
            Some(pos) => pos,
            None => {
                self.columns.push(Column {
                    name: name.to_string(),
                    cells: Vec::new(),
                });
                self.columns.len() - 1
            }
        };
        &mut self.columns[pos].cells
    }

    fn push(&mut self, name: &str, cell: Cell) {
        self.column_mut(name).push(cell);
    }

    fn replace(&mut self, name: &str, cells: Vec<Cell>) {
        *self.column_mut(name) = cells;
    }

    /// Extend every column cyclically to the longest one and return that
    /// length.
    fn broadcast(&mut self, result_name: &str) -> Result<usize> {
        let len = self.columns.iter().map(|c| c.cells.len()).max().unwrap_or(0);
        for col in &mut self.columns {
            if col.cells.is_empty() {
                return Err(Error::shape_mismatch(
                    format!("axis '{}' of result '{}'", col.name, result_name),
                    len,
                    0,
                ));
            }
            if col.cells.len() < len {
                col.cells = cycle_to_length(&col.cells, len);
            }
        }
        Ok(len)
    }
}

/// Repeat `items` whole as often as it fits, then a prefix, to reach `len`.
pub(crate) fn cycle_to_length<T: Clone>(items: &[T], len: usize) -> Vec<T> {
    items.iter().cycle().take(len).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectral_result(name: &str, axis: [f64; 3], values: [f64; 3]) -> Record {
        Record::result(name)
            .with_axis(Record::data("wavenumber").with_units("cm-1").with_values(axis))
            .with_axis(Record::data("temperature").with_units("C").with_values(200.0))
            .with_values(values)
    }

    fn numbers(cells: &[Cell]) -> Vec<f64> {
        cells.iter().map(|c| c.as_f64().unwrap()).collect()
    }

    #[test]
    fn cyclic_repetition_truncates_the_last_cycle() {
        assert_eq!(cycle_to_length(&['a', 'b'], 5), vec!['a', 'b', 'a', 'b', 'a']);
        assert_eq!(cycle_to_length(&[1, 2, 3], 3), vec![1, 2, 3]);
    }

    #[test]
    fn result_names_and_filter_keep_document_order() {
        let mut e = Experiment::new("sapphire");
        e.add_result(Record::result("reflectance").with_values(1.0));
        e.add_result(Record::result("emissivity").with_values(2.0));
        e.add_result(Record::result("reflectance").with_values(3.0));

        assert_eq!(e.result_names(), vec!["reflectance", "emissivity"]);
        let picked: Vec<f64> = e
            .filter_results("reflectance")
            .iter()
            .map(|r| r.values().as_scalar().unwrap())
            .collect();
        assert_eq!(picked, vec![1.0, 3.0]);
    }

    #[test]
    fn scalar_axes_are_broadcast_along_spectral_axes() {
        let mut e = Experiment::new("sapphire");
        e.add_result(spectral_result("emissivity", [1000.0, 1100.0, 1200.0], [0.1, 0.2, 0.3]));

        let tables = e.results_to_nested_dict().unwrap();
        let t = &tables["emissivity"];

        assert_eq!(t.column_names(), vec!["sample", "property", "wavenumber", "temperature", "value"]);
        assert_eq!(t.n_rows(), 3);
        assert_eq!(numbers(t.column("temperature").unwrap()), vec![200.0; 3]);
        assert_eq!(numbers(t.column("wavenumber").unwrap()), vec![1000.0, 1100.0, 1200.0]);
        assert_eq!(numbers(t.column("value").unwrap()), vec![0.1, 0.2, 0.3]);
        assert!(t.column("sample").unwrap().iter().all(|c| c.as_str() == Some("sapphire")));
    }

    #[test]
    fn results_without_axes_give_one_row() {
        let mut e = Experiment::new("s");
        e.add_result(Record::result("thickness").with_values(1.5));

        let tables = e.results_to_nested_dict().unwrap();
        let t = &tables["thickness"];
        assert_eq!(t.n_rows(), 1);
        assert_eq!(t.column("value").unwrap(), &[Cell::Number(1.5)]);
    }

    #[test]
    fn value_length_must_match_the_longest_axis() {
        let mut e = Experiment::new("s");
        e.add_result(
            Record::result("R")
                .with_axis(Record::data("wavenumber").with_values([1.0, 2.0, 3.0]))
                .with_values([0.5, 0.6]),
        );

        match e.results_to_nested_dict().unwrap_err() {
            Error::ShapeMismatch { expected, found, context } => {
                assert_eq!((expected, found), (3, 2));
                assert_eq!(context, "values of result 'R'");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_axis_cannot_be_broadcast() {
        let mut e = Experiment::new("s");
        e.add_result(
            Record::result("R")
                .with_axis(Record::data("wavenumber").with_values(Vec::new()))
                .with_values(1.0),
        );
        match e.results_to_nested_dict().unwrap_err() {
            Error::ShapeMismatch { expected, found, context } => {
                assert_eq!((expected, found), (1, 0));
                assert_eq!(context, "axis 'wavenumber' of result 'R'");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dataframe_keys_join_name_tokens() {
        let mut e = Experiment::new("blue sapphire");
        e.add_result(Record::result("normal emissivity").with_values(0.9));

        let frames = e.results_to_dataframe_dict().unwrap();
        assert_eq!(frames.keys().collect::<Vec<_>>(), vec!["blue_sapphire_normal_emissivity"]);
    }

    #[test]
    fn single_dataframe_fills_missing_columns() {
        let mut e = Experiment::new("s");
        e.add_result(spectral_result("R", [1.0, 2.0, 3.0], [0.1, 0.2, 0.3]));
        e.add_result(
            Record::result("T")
                .with_axis(Record::data("angle").with_values(11.0))
                .with_values(0.5),
        );

        let t = e.results_to_single_dataframe().unwrap();
        assert_eq!(t.n_rows(), 4);
        assert_eq!(
            t.column_names(),
            vec!["sample", "property", "wavenumber", "temperature", "value", "angle"]
        );
        assert!(t.column("angle").unwrap()[..3].iter().all(Cell::is_null));
        assert_eq!(t.column("wavenumber").unwrap()[3], Cell::Null);
    }

    #[test]
    fn dict_round_trip_without_measurement() {
        let mut e = Experiment::new("sapphire")
            .with_description("high temperature emissivity")
            .with_author("A. Author")
            .with_author("B. Author")
            .with_publication_bibtex("@article{x}");
        e.add_result(spectral_result("R", [1.0, 2.0, 3.0], [0.1, 0.2, 0.3]));

        let doc = e.to_dict();
        assert_eq!(doc["measurement"], JsonValue::Null);

        let restored = Experiment::from_json(&e.to_json().unwrap()).unwrap();
        assert_eq!(restored, e);
        assert_eq!(restored.results()[0].role(), RecordRole::Result);
    }
}
