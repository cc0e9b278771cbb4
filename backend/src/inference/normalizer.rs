use ndarray::Array2;
use serde_json::{Map, Value};

/// Failures turning a request body into a feature vector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    #[error("Failed to read request body: {0}")]
    Payload(String),
    #[error("Payload exceeds {0} bytes")]
    PayloadTooLarge(usize),
    #[error("Failed to decode JSON object: {0}")]
    MalformedJson(String),
    #[error("Expected a JSON object mapping symptom names to values, got {0}")]
    NotAnObject(&'static str),
    #[error("Could not convert value {value} for feature '{feature}' to a number")]
    ValueNotCoercible { feature: String, value: String },
}

/// A single schema slot after coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    Provided(f64),
    /// The payload had no entry for this feature.
    Defaulted,
}

impl Slot {
    pub const DEFAULT_VALUE: f64 = 0.0;

    pub fn value(self) -> f64 {
        match self {
            Slot::Provided(value) => value,
            Slot::Defaulted => Self::DEFAULT_VALUE,
        }
    }
}

/// A payload projected onto the feature schema.
#[derive(Debug, Clone)]
pub struct NormalizedInput {
    /// One row, one column per schema feature in schema order.
    pub features: Array2<f64>,
    pub defaulted: usize,
    pub ignored: usize,
}

/// Parses a request body. Only a JSON object is accepted.
pub fn parse_payload(body: &[u8]) -> Result<Map<String, Value>, NormalizeError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| NormalizeError::MalformedJson(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Err(NormalizeError::NotAnObject("null")),
        Value::Bool(_) => Err(NormalizeError::NotAnObject("a boolean")),
        Value::Number(_) => Err(NormalizeError::NotAnObject("a number")),
        Value::String(_) => Err(NormalizeError::NotAnObject("a string")),
        Value::Array(_) => Err(NormalizeError::NotAnObject("an array")),
    }
}

pub fn coerce(feature: &str, value: Option<&Value>) -> Result<Slot, NormalizeError> {
    let Some(value) = value else {
        return Ok(Slot::Defaulted);
    };
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    match number {
        Some(n) if n.is_finite() => Ok(Slot::Provided(n)),
        _ => Err(NormalizeError::ValueNotCoercible {
            feature: feature.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Projects `payload` onto `schema`: absent features become zero, keys outside
/// the schema are dropped without being inspected.
pub fn normalize(
    payload: &Map<String, Value>,
    schema: &[String],
) -> Result<NormalizedInput, NormalizeError> {
    let mut features = Array2::zeros((1, schema.len()));
    let mut defaulted = 0;
    for (slot, feature) in features.row_mut(0).iter_mut().zip(schema) {
        let coerced = coerce(feature, payload.get(feature))?;
        if coerced == Slot::Defaulted {
            defaulted += 1;
        }
        *slot = coerced.value();
    }
    let ignored = payload.len() - (schema.len() - defaulted);
    Ok(NormalizedInput {
        features,
        defaulted,
        ignored,
    })
}
