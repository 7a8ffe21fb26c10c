//! Flat key→value configuration lookup.
//!
//! The configuration file format is an external collaborator; this module
//! consumes an already-parsed JSON document, flattens nested objects into
//! dotted keys (`"measures.HeadPoseYaw.sigmoid.x0"`), and exposes typed
//! get-or-throw and get-or-default accessors. Tests and embedders can also
//! build [`Settings`] directly from key/value pairs.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::FaceQaError;

/// Key of the ordered list of requested measure identifiers.
pub const KEY_MEASURES: &str = "measures";

/// Flat configuration lookup.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: BTreeMap<String, Value>,
}

impl Settings {
    /// Empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document and flatten nested objects into dotted keys.
    pub fn from_json_str(json: &str) -> Result<Self, FaceQaError> {
        let root: Value = serde_json::from_str(json)
            .map_err(|e| FaceQaError::MissingConfigParam(format!("invalid JSON: {e}")))?;
        let mut values = BTreeMap::new();
        flatten("", &root, &mut values);
        Ok(Self { values })
    }

    /// Load settings from `dir/file_name`.
    pub fn from_file(dir: &Path, file_name: &str) -> Result<Self, FaceQaError> {
        let path = dir.join(file_name);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            FaceQaError::MissingConfigParam(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Insert or overwrite one value under a dotted key.
    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    /// Whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn get(&self, key: &str) -> Result<&Value, FaceQaError> {
        self.values
            .get(key)
            .ok_or_else(|| FaceQaError::MissingConfigParam(key.to_string()))
    }

    /// Number value; error when absent or not numeric.
    pub fn get_f64(&self, key: &str) -> Result<f64, FaceQaError> {
        self.get(key)?
            .as_f64()
            .ok_or_else(|| FaceQaError::MissingConfigParam(format!("{key} is not a number")))
    }

    /// Number value, or `default` when the key is absent.
    pub fn get_f64_or(&self, key: &str, default: f64) -> f64 {
        self.values.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    /// Unsigned integer value; error when absent or not an unsigned integer.
    pub fn get_u64(&self, key: &str) -> Result<u64, FaceQaError> {
        self.get(key)?
            .as_u64()
            .ok_or_else(|| FaceQaError::MissingConfigParam(format!("{key} is not an integer")))
    }

    /// Unsigned integer value, or `default` when the key is absent.
    pub fn get_u64_or(&self, key: &str, default: u64) -> u64 {
        self.values.get(key).and_then(Value::as_u64).unwrap_or(default)
    }

    /// Boolean value; error when absent or not a boolean.
    pub fn get_bool(&self, key: &str) -> Result<bool, FaceQaError> {
        self.get(key)?
            .as_bool()
            .ok_or_else(|| FaceQaError::MissingConfigParam(format!("{key} is not a boolean")))
    }

    /// Boolean value, or `default` when the key is absent.
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.values.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// String value; error when absent or not a string.
    pub fn get_string(&self, key: &str) -> Result<String, FaceQaError> {
        self.get(key)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| FaceQaError::MissingConfigParam(format!("{key} is not a string")))
    }

    /// String-list value; error when absent or not an array of strings.
    pub fn get_string_list(&self, key: &str) -> Result<Vec<String>, FaceQaError> {
        let arr = self.get(key)?.as_array().ok_or_else(|| {
            FaceQaError::MissingConfigParam(format!("{key} is not a string list"))
        })?;
        arr.iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| {
                    FaceQaError::MissingConfigParam(format!("{key} contains a non-string entry"))
                })
            })
            .collect()
    }
}

/// Recursively flatten JSON objects into dotted keys. Arrays and scalars are
/// stored as-is under their path.
fn flatten(prefix: &str, value: &Value, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten(&key, v, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), other.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Settings {
        Settings::from_json_str(
            r#"{
                "measures": ["SingleFacePresent", "HeadPose"],
                "measures_params": {
                    "HeadPoseYaw": { "sigmoid": { "x0": 0.0, "w": 10.0 } }
                },
                "alignment": { "size": 224 },
                "verbose": true
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn nested_objects_flatten_to_dotted_keys() {
        let s = sample();
        assert_eq!(
            s.get_f64("measures_params.HeadPoseYaw.sigmoid.w").unwrap(),
            10.0
        );
        assert_eq!(s.get_u64("alignment.size").unwrap(), 224);
        assert!(s.get_bool("verbose").unwrap());
    }

    #[test]
    fn string_list_round_trips() {
        let s = sample();
        assert_eq!(
            s.get_string_list("measures").unwrap(),
            vec!["SingleFacePresent", "HeadPose"]
        );
    }

    #[test]
    fn missing_key_is_an_error() {
        let s = sample();
        assert!(matches!(
            s.get_f64("no.such.key"),
            Err(FaceQaError::MissingConfigParam(_))
        ));
    }

    #[test]
    fn wrong_type_is_an_error() {
        let s = sample();
        assert!(s.get_f64("verbose").is_err());
        assert!(s.get_string_list("verbose").is_err());
    }

    #[test]
    fn default_variants_fall_back() {
        let s = sample();
        assert_eq!(s.get_f64_or("absent", 2.5), 2.5);
        assert!(!s.get_bool_or("absent", false));
        assert_eq!(s.get_u64_or("alignment.size", 0), 224);
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        assert!(matches!(
            Settings::from_json_str("{ nope"),
            Err(FaceQaError::MissingConfigParam(_))
        ));
    }
}
