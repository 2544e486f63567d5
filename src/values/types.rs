use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Largest magnitude below which every integer is exactly representable.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A single calculator input as persisted: a number or a string.
///
/// Whole numbers serialize without a fractional part (`415`, not `415.0`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            FieldValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Field id -> value for one calculator.
pub type FieldValues = BTreeMap<String, FieldValue>;

/// Calculator id -> that calculator's fields.
pub type CalculatorValues = BTreeMap<String, FieldValues>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_decoding() {
        let fields: FieldValues =
            serde_json::from_str(r#"{"eSteps":415,"shaper":"mzv","ratio":0.98}"#).unwrap();
        assert_eq!(fields["eSteps"], FieldValue::Number(415.0));
        assert_eq!(fields["shaper"].as_str(), Some("mzv"));
        assert_eq!(fields["ratio"].as_f64(), Some(0.98));
    }

    #[test]
    fn test_rejects_nested_objects() {
        let parsed = serde_json::from_str::<FieldValues>(r#"{"eSteps":{"x":1}}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_whole_numbers_serialize_as_integers() {
        let mut fields = FieldValues::new();
        fields.insert("eSteps".to_string(), FieldValue::from(415));
        fields.insert("ratio".to_string(), FieldValue::from(0.98));
        fields.insert("rotationDistance".to_string(), FieldValue::from(8.0));
        fields.insert("shaper".to_string(), FieldValue::from("mzv"));

        assert_eq!(
            serde_json::to_string(&fields).unwrap(),
            r#"{"eSteps":415,"ratio":0.98,"rotationDistance":8,"shaper":"mzv"}"#
        );
        assert_eq!(
            serde_json::to_string(&FieldValue::from(-12.0)).unwrap(),
            "-12"
        );
        assert_eq!(serde_json::to_string(&FieldValue::from(1e300)).unwrap(), "1e300");
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::from(8.5).to_string(), "8.5");
        assert_eq!(FieldValue::from("ei").to_string(), "ei");
    }
}
