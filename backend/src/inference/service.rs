use shared::ErrorKind;
use std::sync::Arc;

use super::normalizer::{self, NormalizeError};
use super::predictor::{self, Prediction};
use crate::artifact::{ArtifactBundle, InferenceError};

#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error(transparent)]
    Validation(#[from] NormalizeError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictionError::Validation(_) => ErrorKind::Validation,
            PredictionError::Inference(_) => ErrorKind::Inference,
        }
    }
}

/// Read-only service context built once at startup and cloned into every worker.
#[derive(Clone)]
pub struct PredictionService {
    bundle: Arc<ArtifactBundle>,
}

impl PredictionService {
    pub fn new(bundle: ArtifactBundle) -> Self {
        Self {
            bundle: Arc::new(bundle),
        }
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    /// Full request path: parse the body, align it to the schema, predict.
    pub fn predict_body(&self, body: &[u8]) -> Result<Vec<Prediction>, PredictionError> {
        let payload = normalizer::parse_payload(body)?;
        let input = normalizer::normalize(&payload, self.bundle.pipeline().feature_names())?;
        log::debug!(
            "Normalized payload: {} features defaulted to zero, {} keys ignored",
            input.defaulted,
            input.ignored
        );
        Ok(predictor::predict(&self.bundle, input.features.view())?)
    }
}
