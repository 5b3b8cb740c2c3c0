use serde_json::{json, Value as JsonValue};

use super::document::{self, Object};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Values – a scalar or a flat sequence of numbers
// ---------------------------------------------------------------------------

/// Payload of a [`Record`]: a single reading or a sampled series.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Scalar(f64),
    Series(Vec<f64>),
}

impl Default for Values {
    fn default() -> Self {
        Values::Series(Vec::new())
    }
}

impl Values {
    /// Number of samples; a scalar counts as one.
    pub fn len(&self) -> usize {
        match self {
            Values::Scalar(_) => 1,
            Values::Series(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_series(&self) -> bool {
        matches!(self, Values::Series(_))
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Values::Scalar(v) => Some(*v),
            Values::Series(_) => None,
        }
    }

    /// View as a slice; a scalar is a one-element slice.
    pub fn as_slice(&self) -> &[f64] {
        match self {
            Values::Scalar(v) => std::slice::from_ref(v),
            Values::Series(v) => v,
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        match self {
            Values::Scalar(v) => std::slice::from_mut(v),
            Values::Series(v) => v,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.as_slice().iter().copied()
    }

    /// Arithmetic mean, `None` when there is nothing to average.
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.iter().sum::<f64>() / self.len() as f64)
    }

    /// Apply `f` to every sample, keeping the scalar/series shape.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Values {
        match self {
            Values::Scalar(v) => Values::Scalar(f(*v)),
            Values::Series(v) => Values::Series(v.iter().map(|x| f(*x)).collect()),
        }
    }

    /// Elementwise combination of two payloads.
    ///
    /// Equal lengths zip; a length-one operand is broadcast against the
    /// other. The result is a scalar only when both inputs are scalars.
    pub fn zip_with(
        &self,
        other: &Values,
        context: &str,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Values> {
        if let (Values::Scalar(a), Values::Scalar(b)) = (self, other) {
            return Ok(Values::Scalar(f(*a, *b)));
        }
        let (a, b) = (self.as_slice(), other.as_slice());
        let combined = match (a.len(), b.len()) {
            (n, m) if n == m => a.iter().zip(b).map(|(x, y)| f(*x, *y)).collect(),
            (1, _) => b.iter().map(|y| f(a[0], *y)).collect(),
            (_, 1) => a.iter().map(|x| f(*x, b[0])).collect(),
            (n, m) => return Err(Error::shape_mismatch(context, m, n)),
        };
        Ok(Values::Series(combined))
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Values::Scalar(v) => JsonValue::from(*v),
            Values::Series(v) => JsonValue::Array(v.iter().map(|x| JsonValue::from(*x)).collect()),
        }
    }

    /// Parse a number or an array of numbers. NaN is written out as `null`,
    /// so a bare `null` reads back as a scalar NaN and `null` array entries
    /// as NaN samples.
    pub(crate) fn from_json(value: &JsonValue, path: &str) -> Result<Values> {
        match value {
            JsonValue::Null => Ok(Values::Scalar(f64::NAN)),
            JsonValue::Number(n) => n
                .as_f64()
                .map(Values::Scalar)
                .ok_or_else(|| Error::invalid_field(path, "a finite number")),
            JsonValue::Array(items) => items
                .iter()
                .enumerate()
                .map(|(j, v)| match v {
                    JsonValue::Null => Ok(f64::NAN),
                    other => other
                        .as_f64()
                        .ok_or_else(|| Error::invalid_field(document::index(path, j), "a number")),
                })
                .collect::<Result<Vec<_>>>()
                .map(Values::Series),
            _ => Err(Error::invalid_field(path, "a number or an array of numbers")),
        }
    }
}

impl From<f64> for Values {
    fn from(v: f64) -> Self {
        Values::Scalar(v)
    }
}

impl From<i32> for Values {
    fn from(v: i32) -> Self {
        Values::Scalar(f64::from(v))
    }
}

impl From<u32> for Values {
    fn from(v: u32) -> Self {
        Values::Scalar(f64::from(v))
    }
}

impl From<Vec<f64>> for Values {
    fn from(v: Vec<f64>) -> Self {
        Values::Series(v)
    }
}

impl From<&[f64]> for Values {
    fn from(v: &[f64]) -> Self {
        Values::Series(v.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Values {
    fn from(v: [f64; N]) -> Self {
        Values::Series(v.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Record – named, unit-tagged quantity with optional axes
// ---------------------------------------------------------------------------

/// What a record stands for inside its parent. Only informational; all roles
/// behave the same and the role is not part of the document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordRole {
    #[default]
    Register,
    /// Raw acquisition data: temperatures, angles, signals, axes.
    Data,
    /// Measurement-level settings.
    Parameter,
    /// Experiment-level derived quantity.
    Result,
}

/// A measured or derived quantity.
///
/// Each entry of `axes` describes one dimension of `values`, e.g. the
/// wavenumber grid of a spectrum. Matching lengths are expected but not
/// enforced here; consumers that depend on it check and fail themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    name: String,
    description: String,
    units: String,
    setpoint: Option<f64>,
    values: Values,
    axes: Vec<Record>,
    standard_uncertainty: Values,
    correct: bool,
    role: RecordRole,
}

impl Default for Record {
    fn default() -> Self {
        Record {
            name: String::new(),
            description: String::new(),
            units: String::new(),
            setpoint: None,
            values: Values::default(),
            axes: Vec::new(),
            standard_uncertainty: Values::default(),
            correct: true,
            role: RecordRole::Register,
        }
    }
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Record {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn data(name: impl Into<String>) -> Self {
        Record::new(name).with_role(RecordRole::Data)
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Record::new(name).with_role(RecordRole::Parameter)
    }

    pub fn result(name: impl Into<String>) -> Self {
        Record::new(name).with_role(RecordRole::Result)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn with_setpoint(mut self, setpoint: f64) -> Self {
        self.setpoint = Some(setpoint);
        self
    }

    pub fn with_values(mut self, values: impl Into<Values>) -> Self {
        self.set_values(values);
        self
    }

    pub fn with_axis(mut self, axis: Record) -> Self {
        self.add_axis(axis);
        self
    }

    pub fn with_standard_uncertainty(mut self, uncertainty: impl Into<Values>) -> Self {
        self.standard_uncertainty = uncertainty.into();
        self
    }

    pub fn with_correct(mut self, correct: bool) -> Self {
        self.correct = correct;
        self
    }

    pub fn with_role(mut self, role: RecordRole) -> Self {
        self.role = role;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn setpoint(&self) -> Option<f64> {
        self.setpoint
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Values {
        &mut self.values
    }

    pub fn axes(&self) -> &[Record] {
        &self.axes
    }

    /// The first axis, if any.
    pub fn axis(&self) -> Option<&Record> {
        self.axes.first()
    }

    pub fn standard_uncertainty(&self) -> &Values {
        &self.standard_uncertainty
    }

    pub fn is_correct(&self) -> bool {
        self.correct
    }

    pub fn role(&self) -> RecordRole {
        self.role
    }

    /// Replace the payload. Arrays become a series, plain numbers a scalar.
    pub fn set_values(&mut self, values: impl Into<Values>) {
        self.values = values.into();
    }

    pub fn add_axis(&mut self, axis: Record) {
        self.axes.push(axis);
    }

    pub fn to_dict(&self) -> JsonValue {
        json!({
            "name": self.name,
            "description": self.description,
            "units": self.units,
            "setpoint": self.setpoint,
            "correct": self.correct,
            "axes": self.axes.iter().map(Record::to_dict).collect::<Vec<_>>(),
            "values": self.values.to_json(),
            "standard_uncertainty": self.standard_uncertainty.to_json(),
        })
    }

    pub fn from_dict(value: &JsonValue, role: RecordRole) -> Result<Record> {
        Record::parse(value, "", role)
    }

    /// Parse a record sitting at `path` inside a larger document.
    pub(crate) fn parse(value: &JsonValue, path: &str, role: RecordRole) -> Result<Record> {
        let obj = document::as_object(value, path)?;

        let axes_path = document::join(path, "axes");
        let axes = document::array_field(obj, path, "axes")?
            .iter()
            .enumerate()
            .map(|(i, axis)| Record::parse(axis, &document::index(&axes_path, i), RecordRole::Data))
            .collect::<Result<Vec<_>>>()?;

        let record = Record {
            name: document::string_field(obj, path, "name")?,
            description: document::string_field(obj, path, "description")?,
            units: document::string_field(obj, path, "units")?,
            setpoint: document::opt_f64_field(obj, path, "setpoint")?,
            values: values_field(obj, path, "values")?,
            axes,
            standard_uncertainty: values_field(obj, path, "standard_uncertainty")?,
            correct: document::bool_field(obj, path, "correct", true)?,
            role,
        };
        record.warn_on_ragged_axis(path);
        Ok(record)
    }

    /// Flag the common single-axis case where the axis grid and the values
    /// disagree. The record is still accepted.
    fn warn_on_ragged_axis(&self, path: &str) {
        let mut series_axes = self.axes.iter().filter(|a| a.values.is_series());
        if let (Some(axis), None) = (series_axes.next(), series_axes.next()) {
            if self.values.is_series() && axis.values.len() != self.values.len() {
                log::warn!(
                    "record '{}' at '{}': axis '{}' has {} points but there are {} values",
                    self.name,
                    if path.is_empty() { "<root>" } else { path },
                    axis.name,
                    axis.values.len(),
                    self.values.len()
                );
            }
        }
    }
}

/// Absent keys give an empty series; a present `null` is a NaN scalar.
fn values_field(obj: &Object, path: &str, key: &str) -> Result<Values> {
    match obj.get(key) {
        None => Ok(Values::default()),
        Some(v) => Values::from_json(v, &document::join(path, key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reflectance() -> Record {
        Record::result("reflectance")
            .with_description("specular reflectance")
            .with_units("a.u.")
            .with_axis(
                Record::data("wavenumber")
                    .with_units("cm-1")
                    .with_values([1000.0, 1100.0, 1200.0]),
            )
            .with_axis(Record::data("angle").with_units("deg").with_setpoint(11.0).with_values(11.0))
            .with_values(vec![0.1, 0.2, 0.3])
            .with_standard_uncertainty(0.01)
    }

    #[test]
    fn defaults_are_fresh_and_marked_correct() {
        let mut a = Record::default();
        let b = Record::default();
        a.add_axis(Record::new("x"));

        assert!(b.axes().is_empty());
        assert!(a.is_correct());
        assert_eq!(a.values(), &Values::Series(vec![]));
        assert_eq!(a.role(), RecordRole::Register);
    }

    #[test]
    fn set_values_normalises_arrays_and_scalars() {
        let mut r = Record::new("T");

        r.set_values([1.0, 2.0]);
        assert_eq!(r.values(), &Values::Series(vec![1.0, 2.0]));

        r.set_values(&[3.0][..]);
        assert_eq!(r.values(), &Values::Series(vec![3.0]));

        r.set_values(21_i32);
        assert_eq!(r.values(), &Values::Scalar(21.0));

        r.set_values(Values::Scalar(4.5));
        assert_eq!(r.values().as_scalar(), Some(4.5));
    }

    #[test]
    fn dict_round_trip_is_lossless() {
        let original = reflectance();
        let restored = Record::from_dict(&original.to_dict(), RecordRole::Result).unwrap();

        assert_eq!(restored, original);
        assert_eq!(restored.axes()[0].role(), RecordRole::Data);
    }

    #[test]
    fn dict_uses_the_document_keys() {
        let d = reflectance().to_dict();
        let obj = d.as_object().unwrap();

        for key in [
            "name",
            "description",
            "units",
            "setpoint",
            "correct",
            "axes",
            "values",
            "standard_uncertainty",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(d["setpoint"], JsonValue::Null);
        assert_eq!(d["axes"][1]["values"], json!(11.0));
    }

    #[test]
    fn sparse_dict_falls_back_to_defaults() {
        let r = Record::from_dict(&json!({ "name": "T1", "units": null }), RecordRole::Data).unwrap();

        assert_eq!(r.name(), "T1");
        assert_eq!(r.units(), "");
        assert_eq!(r.setpoint(), None);
        assert!(r.values().is_empty());
        assert!(r.is_correct());
    }

    #[test]
    fn nan_scalars_survive_the_round_trip() {
        let original = Record::result("x")
            .with_values(f64::NAN)
            .with_standard_uncertainty(vec![0.1, f64::NAN]);
        let d = original.to_dict();
        assert_eq!(d["values"], JsonValue::Null);

        let restored = Record::from_dict(&d, RecordRole::Result).unwrap();
        assert!(restored.values().as_scalar().is_some_and(f64::is_nan));
        let u = restored.standard_uncertainty().as_slice();
        assert_eq!(u.len(), 2);
        assert_eq!(u[0], 0.1);
        assert!(u[1].is_nan());
    }

    #[test]
    fn malformed_values_name_the_offending_entry() {
        let doc = json!({ "name": "x", "axes": [{ "values": [1.0, "two"] }] });
        let err = Record::from_dict(&doc, RecordRole::Result).unwrap_err();

        assert_eq!(err.to_string(), "field 'axes[0].values[1]' should be a number");
    }

    #[test]
    fn zip_with_broadcasts_single_samples() {
        let a = Values::Series(vec![1.0, 2.0, 3.0]);
        let b = Values::Scalar(10.0);

        assert_eq!(
            a.zip_with(&b, "t", |x, y| x * y).unwrap(),
            Values::Series(vec![10.0, 20.0, 30.0])
        );
        assert_eq!(
            b.zip_with(&b, "t", |x, y| x + y).unwrap(),
            Values::Scalar(20.0)
        );
        assert!(matches!(
            a.zip_with(&Values::Series(vec![1.0, 2.0]), "t", |x, _| x),
            Err(Error::ShapeMismatch { expected: 2, found: 3, .. })
        ));
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(Values::default().mean(), None);
        assert_eq!(Values::Series(vec![1.0, 3.0]).mean(), Some(2.0));
    }
}
