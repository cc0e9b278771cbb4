use ndarray::ArrayView2;
use shared::PredictionResult;

use crate::artifact::{ArtifactBundle, InferenceError};

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

impl From<Prediction> for PredictionResult {
    fn from(prediction: Prediction) -> Self {
        Self {
            disease: prediction.label,
            probability: prediction.confidence,
        }
    }
}

/// Runs `features` through the pipeline and decodes one prediction per row.
///
/// The confidence is the largest entry of the row's probability vector. It is
/// not looked up by the decoded label, so a pipeline whose `predict` and
/// `predict_proba` disagree would report the other class's probability.
pub fn predict(
    bundle: &ArtifactBundle,
    features: ArrayView2<'_, f64>,
) -> Result<Vec<Prediction>, InferenceError> {
    let pipeline = bundle.pipeline();
    let codes = pipeline.predict(features)?;
    let proba = pipeline.predict_proba(features)?;
    let labels = bundle.label_encoder().inverse_transform(&codes)?;

    labels
        .into_iter()
        .zip(proba.rows())
        .enumerate()
        .map(|(row, (label, distribution))| {
            let confidence = distribution.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if !confidence.is_finite() {
                return Err(InferenceError::NonFiniteProbability(row));
            }
            Ok(Prediction {
                label,
                confidence: confidence.clamp(0.0, 1.0),
            })
        })
        .collect()
}
