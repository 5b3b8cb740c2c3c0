//! Typed field lookup on nested `serde_json` documents.
//!
//! Every helper takes the dotted path of the object it reads from, so
//! errors point at the exact spot in a deeply nested experiment file
//! (`measurement.sample[3].data.signals[0].axes[0].values[12]`).
//!
//! Missing keys and explicit `null`s fall back to the documented default
//! of each field, except numeric payloads where `null` stands for NaN. A
//! present value of the wrong JSON type is an error.

use serde_json::{Map, Value as JsonValue};

use crate::error::{Error, Result};

pub(crate) type Object = Map<String, JsonValue>;

/// Join a parent path and a child key.
pub(crate) fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Path of the `i`-th element of an array living at `path`.
pub(crate) fn index(path: &str, i: usize) -> String {
    format!("{path}[{i}]")
}

pub(crate) fn as_object<'a>(value: &'a JsonValue, path: &str) -> Result<&'a Object> {
    value.as_object().ok_or_else(|| {
        let key = if path.is_empty() { "<root>" } else { path };
        Error::invalid_field(key, "an object")
    })
}

/// Look up a key, treating `null` the same as absent.
fn present<'a>(obj: &'a Object, key: &str) -> Option<&'a JsonValue> {
    obj.get(key).filter(|v| !v.is_null())
}

/// A key that has no sensible default.
pub(crate) fn required<'a>(obj: &'a Object, path: &str, key: &str) -> Result<&'a JsonValue> {
    present(obj, key).ok_or_else(|| Error::missing_key(join(path, key)))
}

/// Absent or `null` strings read as `""`.
pub(crate) fn string_field(obj: &Object, path: &str, key: &str) -> Result<String> {
    Ok(opt_string_field(obj, path, key)?.unwrap_or_default())
}

pub(crate) fn opt_string_field(obj: &Object, path: &str, key: &str) -> Result<Option<String>> {
    match present(obj, key) {
        None => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(Error::invalid_field(join(path, key), "a string")),
    }
}

pub(crate) fn opt_f64_field(obj: &Object, path: &str, key: &str) -> Result<Option<f64>> {
    match present(obj, key) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| Error::invalid_field(join(path, key), "a number")),
    }
}

pub(crate) fn bool_field(obj: &Object, path: &str, key: &str, default: bool) -> Result<bool> {
    match present(obj, key) {
        None => Ok(default),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| Error::invalid_field(join(path, key), "a boolean")),
    }
}

/// Non-negative integer; floats with no fractional part are accepted since
/// some producers write counters as `12.0`.
pub(crate) fn u32_field(obj: &Object, path: &str, key: &str) -> Result<u32> {
    let Some(v) = present(obj, key) else {
        return Ok(0);
    };
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).map_err(|_| Error::invalid_field(join(path, key), "a 32-bit count"));
    }
    match v.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) => Ok(f as u32),
        _ => Err(Error::invalid_field(join(path, key), "a non-negative integer")),
    }
}

/// Absent or `null` arrays read as empty.
pub(crate) fn array_field<'a>(obj: &'a Object, path: &str, key: &str) -> Result<&'a [JsonValue]> {
    match present(obj, key) {
        None => Ok(&[][..]),
        Some(JsonValue::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(Error::invalid_field(join(path, key), "an array")),
    }
}

pub(crate) fn string_list_field(obj: &Object, path: &str, key: &str) -> Result<Vec<String>> {
    let list_path = join(path, key);
    array_field(obj, path, key)?
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::invalid_field(index(&list_path, i), "a string"))
        })
        .collect()
}

/// Optional string rendered back as JSON `null` when unset.
pub(crate) fn opt_string_json(value: &Option<String>) -> JsonValue {
    match value {
        Some(s) => JsonValue::String(s.clone()),
        None => JsonValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_and_absent_fall_back_to_defaults() {
        let doc = json!({ "name": null, "count": null });
        let obj = as_object(&doc, "").unwrap();

        assert_eq!(string_field(obj, "", "name").unwrap(), "");
        assert_eq!(string_field(obj, "", "missing").unwrap(), "");
        assert_eq!(u32_field(obj, "", "count").unwrap(), 0);
        assert!(bool_field(obj, "", "flag", true).unwrap());
        assert!(array_field(obj, "", "items").unwrap().is_empty());
    }

    #[test]
    fn wrong_type_reports_full_path() {
        let doc = json!({ "scans": "many" });
        let obj = as_object(&doc, "").unwrap();

        let err = u32_field(obj, "measurement.sample[0]", "scans").unwrap_err();
        assert_eq!(
            err.to_string(),
            "field 'measurement.sample[0].scans' should be a non-negative integer"
        );
    }

    #[test]
    fn integral_floats_count_as_scans() {
        let doc = json!({ "scans": 64.0 });
        let obj = as_object(&doc, "").unwrap();
        assert_eq!(u32_field(obj, "", "scans").unwrap(), 64);
    }

    #[test]
    fn required_key_is_reported_missing() {
        let doc = json!({ "data": null });
        let obj = as_object(&doc, "").unwrap();

        match required(obj, "sample[1]", "data").unwrap_err() {
            Error::MissingKey { key } => assert_eq!(key, "sample[1].data"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn string_lists_reject_non_strings() {
        let doc = json!({ "experiment_authors": ["A. Author", 3] });
        let obj = as_object(&doc, "").unwrap();

        let err = string_list_field(obj, "", "experiment_authors").unwrap_err();
        assert_eq!(err.to_string(), "field 'experiment_authors[1]' should be a string");
    }
}
