use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde_json::{json, Value as JsonValue};

use super::document;
use super::record::{Record, RecordRole, Values};
use crate::error::{Error, Result};

/// Units of the wavelength representation every spectrum also carries.
pub const MICRONS: &str = "microns";
/// Units of the wavenumber representation acquired from the instrument.
pub const WAVENUMBER: &str = "cm-1";

/// Reciprocal-space constant between the wavenumber grid and microns.
const RECIPROCAL_SCALE: f64 = 1_000.0;
/// Jacobian factor for the cm⁻¹ → µm change of variable.
const JACOBIAN_SCALE: f64 = 10_000.0;

// ---------------------------------------------------------------------------
// SignalSpace – which representation of the signal to pick
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSpace {
    /// Wavelength, microns.
    Lambda,
    /// Wavenumber, cm⁻¹.
    Sigma,
}

impl SignalSpace {
    pub fn units(self) -> &'static str {
        match self {
            SignalSpace::Lambda => MICRONS,
            SignalSpace::Sigma => WAVENUMBER,
        }
    }
}

impl FromStr for SignalSpace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lambda" => Ok(SignalSpace::Lambda),
            "sigma" => Ok(SignalSpace::Sigma),
            other => Err(Error::UnknownSignalSpace(other.to_string())),
        }
    }
}

/// Readings of one temperature sensor with their rounded mean.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureSummary {
    pub values: Values,
    /// Mean rounded to two decimals; NaN when there are no readings.
    pub mean: f64,
}

// ---------------------------------------------------------------------------
// Spectrum – one acquisition
// ---------------------------------------------------------------------------

/// One acquisition with its environment and the signal in two unit spaces.
///
/// `signals[0]` is the signal as acquired. `signals[1]` is derived from it
/// when the spectrum is built and is never read back from a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    source_name: String,
    filename: String,
    start_datetime: Option<String>,
    end_datetime: Option<String>,
    scans: u32,
    xpm_file: String,
    surface_temperature: Vec<Record>,
    surrounding_temperature: Vec<Record>,
    polarization: String,
    angle: Option<Record>,
    signals: [Record; 2],
}

impl Spectrum {
    /// Build a spectrum around `signal`, deriving its wavelength twin.
    pub fn new(signal: Record) -> Result<Self> {
        let derived = to_wavelength(&signal)?;
        Ok(Spectrum {
            source_name: String::new(),
            filename: String::new(),
            start_datetime: None,
            end_datetime: None,
            scans: 0,
            xpm_file: String::new(),
            surface_temperature: Vec::new(),
            surrounding_temperature: Vec::new(),
            polarization: String::new(),
            angle: None,
            signals: [signal, derived],
        })
    }

    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_start_datetime(mut self, start: impl Into<String>) -> Self {
        self.start_datetime = Some(start.into());
        self
    }

    pub fn with_end_datetime(mut self, end: impl Into<String>) -> Self {
        self.end_datetime = Some(end.into());
        self
    }

    pub fn with_scans(mut self, scans: u32) -> Self {
        self.scans = scans;
        self
    }

    pub fn with_xpm_file(mut self, xpm_file: impl Into<String>) -> Self {
        self.xpm_file = xpm_file.into();
        self
    }

    pub fn with_surface_temperature(mut self, sensor: Record) -> Self {
        self.surface_temperature.push(sensor);
        self
    }

    pub fn with_surrounding_temperature(mut self, sensor: Record) -> Self {
        self.surrounding_temperature.push(sensor);
        self
    }

    pub fn with_polarization(mut self, polarization: impl Into<String>) -> Self {
        self.polarization = polarization.into();
        self
    }

    pub fn with_angle(mut self, angle: Record) -> Self {
        self.angle = Some(angle);
        self
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn change_source_name(&mut self, source_name: impl Into<String>) {
        self.source_name = source_name.into();
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn start_datetime(&self) -> Option<&str> {
        self.start_datetime.as_deref()
    }

    pub fn end_datetime(&self) -> Option<&str> {
        self.end_datetime.as_deref()
    }

    pub fn scans(&self) -> u32 {
        self.scans
    }

    pub fn xpm_file(&self) -> &str {
        &self.xpm_file
    }

    pub fn polarization(&self) -> &str {
        &self.polarization
    }

    pub fn surface_temperature(&self) -> &[Record] {
        &self.surface_temperature
    }

    pub fn surrounding_temperature(&self) -> &[Record] {
        &self.surrounding_temperature
    }

    pub fn angle(&self) -> Option<&Record> {
        self.angle.as_ref()
    }

    pub fn signals(&self) -> &[Record; 2] {
        &self.signals
    }

    pub fn input_signal(&self) -> &Record {
        &self.signals[0]
    }

    pub fn derived_signal(&self) -> &Record {
        &self.signals[1]
    }

    /// The signal whose units (or whose axis units) match `space`.
    pub fn filter_signal(&self, space: SignalSpace) -> Option<&Record> {
        let target = space.units();
        self.signals
            .iter()
            .find(|s| s.units() == target || s.axis().is_some_and(|a| a.units() == target))
    }

    /// Setpoint of the first surface sensor.
    pub fn surface_setpoint(&self) -> Result<f64> {
        self.surface_temperature
            .first()
            .and_then(Record::setpoint)
            .ok_or(Error::MissingSetpoint {
                what: "surface temperature",
            })
    }

    pub fn angle_setpoint(&self) -> Result<f64> {
        self.angle
            .as_ref()
            .and_then(Record::setpoint)
            .ok_or(Error::MissingSetpoint { what: "angle" })
    }

    pub fn surface_temperatures(&self) -> BTreeMap<String, TemperatureSummary> {
        summarize(&self.surface_temperature)
    }

    pub fn surrounding_temperatures(&self) -> BTreeMap<String, TemperatureSummary> {
        summarize(&self.surrounding_temperature)
    }

    /// Overwrite the readings of the first sensor called `sensor_name`,
    /// surface sensors first. Returns `false` when no sensor matches.
    pub fn set_temperature(&mut self, sensor_name: &str, values: impl Into<Values>) -> bool {
        let values = match values.into() {
            Values::Scalar(v) => Values::Series(vec![v]),
            series => series,
        };
        let sensor = self
            .surface_temperature
            .iter_mut()
            .chain(self.surrounding_temperature.iter_mut())
            .find(|t| t.name() == sensor_name);

        match sensor {
            Some(t) => {
                t.set_values(values);
                true
            }
            None => false,
        }
    }

    /// Force samples at `indexes` negative and all others positive, in
    /// both representations.
    pub fn set_negative_signal(&mut self, indexes: &[usize]) {
        self.apply_sign(indexes, -1.0);
    }

    /// Force samples at `indexes` positive and all others negative, in
    /// both representations.
    pub fn set_positive_signal(&mut self, indexes: &[usize]) {
        self.apply_sign(indexes, 1.0);
    }

    fn apply_sign(&mut self, indexes: &[usize], selected: f64) {
        let targets: BTreeSet<usize> = indexes.iter().copied().collect();
        for signal in &mut self.signals {
            for (j, v) in signal.values_mut().as_mut_slice().iter_mut().enumerate() {
                let sign = if targets.contains(&j) { selected } else { -selected };
                *v = sign * v.abs();
            }
        }
    }

    pub fn to_dict(&self) -> JsonValue {
        json!({
            "source_name": self.source_name,
            "filename": self.filename,
            "start_datetime": document::opt_string_json(&self.start_datetime),
            "end_datetime": document::opt_string_json(&self.end_datetime),
            "scans": self.scans,
            "xpm_file": self.xpm_file,
            "polarization": self.polarization,
            "data": {
                "surface_temperature": records_to_json(&self.surface_temperature),
                "surrounding_temperature": records_to_json(&self.surrounding_temperature),
                "angle": self.angle.as_ref().map(Record::to_dict),
                "signals": records_to_json(&self.signals),
            },
        })
    }

    pub fn from_dict(value: &JsonValue) -> Result<Spectrum> {
        Spectrum::parse(value, "")
    }

    pub(crate) fn parse(value: &JsonValue, path: &str) -> Result<Spectrum> {
        let obj = document::as_object(value, path)?;
        let data_path = document::join(path, "data");
        let data = document::as_object(document::required(obj, path, "data")?, &data_path)?;

        let signals_path = document::join(&data_path, "signals");
        let signal = document::array_field(data, &data_path, "signals")?
            .first()
            .ok_or_else(|| Error::missing_key(document::index(&signals_path, 0)))?;
        let signal = Record::parse(signal, &document::index(&signals_path, 0), RecordRole::Data)?;

        let angle = match data.get("angle") {
            None | Some(JsonValue::Null) => None,
            Some(angle) => Some(Record::parse(
                angle,
                &document::join(&data_path, "angle"),
                RecordRole::Data,
            )?),
        };

        let mut spectrum = Spectrum::new(signal)?;
        spectrum.source_name = document::string_field(obj, path, "source_name")?;
        spectrum.filename = document::string_field(obj, path, "filename")?;
        spectrum.start_datetime = document::opt_string_field(obj, path, "start_datetime")?;
        spectrum.end_datetime = document::opt_string_field(obj, path, "end_datetime")?;
        spectrum.scans = document::u32_field(obj, path, "scans")?;
        spectrum.xpm_file = document::string_field(obj, path, "xpm_file")?;
        spectrum.polarization = document::string_field(obj, path, "polarization")?;
        spectrum.surface_temperature = parse_records(data, &data_path, "surface_temperature")?;
        spectrum.surrounding_temperature =
            parse_records(data, &data_path, "surrounding_temperature")?;
        spectrum.angle = angle;
        Ok(spectrum)
    }
}

// ---------------------------------------------------------------------------
// Unit conversion
// ---------------------------------------------------------------------------

/// Convert a wavenumber signal into its wavelength representation.
///
/// Axis: `λ = 1000 / σ`. Signal: `10000 · S / λ²`. The standard uncertainty
/// is carried over as is.
pub fn to_wavelength(signal: &Record) -> Result<Record> {
    let axis = signal.axis().ok_or_else(|| Error::MissingAxis {
        record: signal.name().to_string(),
    })?;

    if let Some(index) = axis.values().iter().position(|x| x == 0.0) {
        return Err(Error::DivisionByZero {
            context: format!("converting axis '{}' to {MICRONS}", axis.name()),
            index,
        });
    }
    let wavelengths = axis.values().map(|x| RECIPROCAL_SCALE / x);

    let values = signal.values().zip_with(
        &wavelengths,
        &format!("signal '{}' against axis '{}'", signal.name(), axis.name()),
        |s, l| JACOBIAN_SCALE * s / (l * l),
    )?;

    let mut derived_axis = Record::data(axis.name())
        .with_description(axis.description())
        .with_units(MICRONS)
        .with_values(wavelengths);
    if let Some(setpoint) = axis.setpoint() {
        derived_axis = derived_axis.with_setpoint(setpoint);
    }

    let mut derived = Record::data(signal.name())
        .with_description(signal.description())
        .with_units(MICRONS)
        .with_axis(derived_axis)
        .with_values(values)
        .with_standard_uncertainty(signal.standard_uncertainty().clone())
        .with_correct(signal.is_correct());
    if let Some(setpoint) = signal.setpoint() {
        derived = derived.with_setpoint(setpoint);
    }
    Ok(derived)
}

fn summarize(sensors: &[Record]) -> BTreeMap<String, TemperatureSummary> {
    sensors
        .iter()
        .map(|t| {
            let mean = t
                .values()
                .mean()
                .map(|m| (m * 100.0).round() / 100.0)
                .unwrap_or(f64::NAN);
            (
                t.name().to_string(),
                TemperatureSummary {
                    values: t.values().clone(),
                    mean,
                },
            )
        })
        .collect()
}

fn records_to_json(records: &[Record]) -> JsonValue {
    JsonValue::Array(records.iter().map(Record::to_dict).collect())
}

fn parse_records(obj: &document::Object, path: &str, key: &str) -> Result<Vec<Record>> {
    let list_path = document::join(path, key);
    document::array_field(obj, path, key)?
        .iter()
        .enumerate()
        .map(|(i, v)| Record::parse(v, &document::index(&list_path, i), RecordRole::Data))
        .collect()
}
