use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

pub const SERVICE_NAME: &str = "Symptom Tracker";

/// Response header carrying the per-request identifier of a prediction.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
/// Response header naming the [`ErrorKind`] of a failed prediction.
pub const ERROR_KIND_HEADER: &str = "x-error-kind";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub model_loaded: bool,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            service: SERVICE_NAME.to_string(),
            model_loaded: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionResult {
    pub disease: String,
    pub probability: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictResponse {
    pub results: Vec<PredictionResult>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Either body `/predict` can answer with.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum PredictOutcome {
    Success(PredictResponse),
    Failure(ErrorResponse),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The request body could not be turned into a feature vector.
    Validation,
    /// The pipeline or label decoder failed on a well-formed vector.
    Inference,
}
