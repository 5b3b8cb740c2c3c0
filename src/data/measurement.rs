use indexmap::IndexMap;
use serde_json::{json, Value as JsonValue};

use super::document;
use super::record::{Record, RecordRole};
use super::spectrum::Spectrum;
use crate::error::Result;

/// Everything acquired for one sample: settings plus calibration and
/// sample spectra.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Measurement {
    sample_name: String,
    start_datetime: Option<String>,
    end_datetime: Option<String>,
    parameters: Vec<Record>,
    sample_spectra: Vec<Spectrum>,
    calibration_spectra: Vec<Spectrum>,
}

impl Measurement {
    pub fn new(sample_name: impl Into<String>) -> Self {
        Measurement {
            sample_name: sample_name.into(),
            ..Default::default()
        }
    }

    pub fn with_start_datetime(mut self, start: impl Into<String>) -> Self {
        self.start_datetime = Some(start.into());
        self
    }

    pub fn with_end_datetime(mut self, end: impl Into<String>) -> Self {
        self.end_datetime = Some(end.into());
        self
    }

    pub fn sample_name(&self) -> &str {
        &self.sample_name
    }

    pub fn start_datetime(&self) -> Option<&str> {
        self.start_datetime.as_deref()
    }

    pub fn end_datetime(&self) -> Option<&str> {
        self.end_datetime.as_deref()
    }

    pub fn parameters(&self) -> &[Record] {
        &self.parameters
    }

    pub fn sample_spectra(&self) -> &[Spectrum] {
        &self.sample_spectra
    }

    pub fn calibration_spectra(&self) -> &[Spectrum] {
        &self.calibration_spectra
    }

    pub fn add_parameter(&mut self, parameter: Record) {
        self.parameters.push(parameter);
    }

    pub fn add_sample_spectrum(&mut self, spectrum: Spectrum) {
        self.sample_spectra.push(spectrum);
    }

    pub fn add_calibration_spectrum(&mut self, spectrum: Spectrum) {
        self.calibration_spectra.push(spectrum);
    }

    /// Distinct calibration sources, in order of first appearance.
    pub fn calibration_sources(&self) -> Vec<&str> {
        distinct_sources(&self.calibration_spectra)
    }

    pub fn sample_sources(&self) -> Vec<&str> {
        distinct_sources(&self.sample_spectra)
    }

    pub fn filter_calibration(&self, source_name: &str) -> Vec<&Spectrum> {
        filter_by_source(&self.calibration_spectra, source_name)
    }

    pub fn filter_sample(&self, source_name: &str) -> Vec<&Spectrum> {
        filter_by_source(&self.sample_spectra, source_name)
    }

    pub fn calibration_to_dict(&self) -> IndexMap<&str, Vec<&Spectrum>> {
        group_by_source(&self.calibration_spectra)
    }

    pub fn samples_to_dict(&self) -> IndexMap<&str, Vec<&Spectrum>> {
        group_by_source(&self.sample_spectra)
    }

    pub fn to_dict(&self) -> JsonValue {
        json!({
            "sample_name": self.sample_name,
            "start_datetime": document::opt_string_json(&self.start_datetime),
            "end_datetime": document::opt_string_json(&self.end_datetime),
            "parameters": self.parameters.iter().map(Record::to_dict).collect::<Vec<_>>(),
            "calibration": self.calibration_spectra.iter().map(Spectrum::to_dict).collect::<Vec<_>>(),
            "sample": self.sample_spectra.iter().map(Spectrum::to_dict).collect::<Vec<_>>(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_dict())?)
    }

    /// Parse a measurement document. Missing `parameters`, `calibration` or
    /// `sample` lists read as empty.
    pub fn from_dict(value: &JsonValue) -> Result<Measurement> {
        Measurement::parse(value, "")
    }

    pub(crate) fn parse(value: &JsonValue, path: &str) -> Result<Measurement> {
        let obj = document::as_object(value, path)?;

        let params_path = document::join(path, "parameters");
        let parameters = document::array_field(obj, path, "parameters")?
            .iter()
            .enumerate()
            .map(|(i, v)| Record::parse(v, &document::index(&params_path, i), RecordRole::Parameter))
            .collect::<Result<Vec<_>>>()?;

        Ok(Measurement {
            sample_name: document::string_field(obj, path, "sample_name")?,
            start_datetime: document::opt_string_field(obj, path, "start_datetime")?,
            end_datetime: document::opt_string_field(obj, path, "end_datetime")?,
            parameters,
            calibration_spectra: parse_spectra(obj, path, "calibration")?,
            sample_spectra: parse_spectra(obj, path, "sample")?,
        })
    }
}

fn parse_spectra(obj: &document::Object, path: &str, key: &str) -> Result<Vec<Spectrum>> {
    let list_path = document::join(path, key);
    document::array_field(obj, path, key)?
        .iter()
        .enumerate()
        .map(|(i, v)| Spectrum::parse(v, &document::index(&list_path, i)))
        .collect()
}

fn distinct_sources(spectra: &[Spectrum]) -> Vec<&str> {
    group_by_source(spectra).into_keys().collect()
}

fn filter_by_source<'a>(spectra: &'a [Spectrum], source_name: &str) -> Vec<&'a Spectrum> {
    spectra
        .iter()
        .filter(|s| s.source_name() == source_name)
        .collect()
}

fn group_by_source(spectra: &[Spectrum]) -> IndexMap<&str, Vec<&Spectrum>> {
    let mut groups: IndexMap<&str, Vec<&Spectrum>> = IndexMap::new();
    for spectrum in spectra {
        groups.entry(spectrum.source_name()).or_default().push(spectrum);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::Values;
    use crate::error::Error;

    fn spectrum(source: &str, filename: &str) -> Spectrum {
        let signal = Record::data("reflectance")
            .with_units("cm-1")
            .with_axis(Record::data("wavenumber").with_units("cm-1").with_values([1000.0, 2000.0]))
            .with_values([1.0, 2.0]);
        Spectrum::new(signal)
            .unwrap()
            .with_source_name(source)
            .with_filename(filename)
    }

    fn measurement() -> Measurement {
        let mut m = Measurement::new("sapphire").with_start_datetime("2022-11-16T09:00:00");
        m.add_parameter(Record::parameter("aperture").with_units("mm").with_values(2.0));
        m.add_calibration_spectrum(spectrum("gold", "g1"));
        m.add_calibration_spectrum(spectrum("blackbody", "b1"));
        m.add_calibration_spectrum(spectrum("gold", "g2"));
        m.add_sample_spectrum(spectrum("sapphire", "s1"));
        m
    }

    #[test]
    fn sources_are_distinct_in_first_seen_order() {
        let m = measurement();
        assert_eq!(m.calibration_sources(), vec!["gold", "blackbody"]);
        assert_eq!(m.sample_sources(), vec!["sapphire"]);
    }

    #[test]
    fn filter_and_group_by_source() {
        let m = measurement();

        let gold: Vec<&str> = m.filter_calibration("gold").iter().map(|s| s.filename()).collect();
        assert_eq!(gold, vec!["g1", "g2"]);
        assert!(m.filter_sample("gold").is_empty());

        let grouped = m.calibration_to_dict();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["blackbody"].len(), 1);
        assert_eq!(m.samples_to_dict()["sapphire"][0].filename(), "s1");
    }

    #[test]
    fn dict_round_trip() {
        let original = measurement();
        let restored = Measurement::from_dict(&original.to_dict()).unwrap();

        assert_eq!(restored, original);
        assert_eq!(restored.parameters()[0].role(), RecordRole::Parameter);
        assert_eq!(restored.parameters()[0].values(), &Values::Scalar(2.0));
    }

    #[test]
    fn missing_collections_read_as_empty() {
        let m = Measurement::from_dict(&json!({ "sample_name": "quartz" })).unwrap();

        assert_eq!(m.sample_name(), "quartz");
        assert!(m.parameters().is_empty());
        assert!(m.calibration_spectra().is_empty());
        assert!(m.sample_spectra().is_empty());
    }

    #[test]
    fn broken_spectrum_fails_the_whole_measurement() {
        let doc = json!({ "sample": [{ "source_name": "s" }] });
        let err = Measurement::from_dict(&doc).unwrap_err();
        assert!(matches!(err, Error::MissingKey { key } if key == "sample[0].data"));
    }

    #[test]
    fn json_keeps_timestamps_as_text() {
        let text = measurement().to_json().unwrap();
        assert!(text.contains("\"start_datetime\":\"2022-11-16T09:00:00\""));
        assert!(text.contains("\"end_datetime\":null"));
    }
}
