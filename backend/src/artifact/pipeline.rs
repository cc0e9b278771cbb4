use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::Deserialize;
use std::collections::HashSet;

use super::estimator::Estimator;
use super::{ArtifactError, InferenceError};

/// Pre-processing step applied to every row before the estimator sees it.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// `(x - mean) / scale`; either part may be absent.
    StandardScaler {
        #[serde(default)]
        mean: Option<Vec<f64>>,
        #[serde(default)]
        scale: Option<Vec<f64>>,
    },
    /// `x * scale + min`.
    MinMaxScaler { min: Vec<f64>, scale: Vec<f64> },
}

impl Transform {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        let widths: Vec<(&str, usize)> = match self {
            Transform::StandardScaler { mean, scale } => mean
                .iter()
                .map(|m| ("mean", m.len()))
                .chain(scale.iter().map(|s| ("scale", s.len())))
                .collect(),
            Transform::MinMaxScaler { min, scale } => {
                vec![("min", min.len()), ("scale", scale.len())]
            }
        };
        for (name, width) in widths {
            if width != n_features {
                return Err(format!(
                    "{} has {} entries, expected {}",
                    name, width, n_features
                ));
            }
        }
        Ok(())
    }

    fn apply(&self, x: &mut Array2<f64>) {
        for mut row in x.rows_mut() {
            match self {
                Transform::StandardScaler { mean, scale } => {
                    if let Some(mean) = mean {
                        row.iter_mut().zip(mean).for_each(|(v, m)| *v -= m);
                    }
                    if let Some(scale) = scale {
                        row.iter_mut()
                            .zip(scale)
                            .for_each(|(v, s)| *v /= if *s == 0.0 { 1.0 } else { *s });
                    }
                }
                Transform::MinMaxScaler { min, scale } => {
                    row.iter_mut()
                        .zip(min.iter().zip(scale))
                        .for_each(|(v, (m, s))| *v = *v * s + m);
                }
            }
        }
    }
}

/// The final step of the pipeline together with the schema it was fitted on.
#[derive(Debug, Clone, Deserialize)]
pub struct FittedModel {
    feature_names: Vec<String>,
    classes: Vec<i64>,
    #[serde(flatten)]
    estimator: Estimator,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    steps: Vec<Transform>,
    model: FittedModel,
}

impl Pipeline {
    /// Ordered feature schema every request is projected onto.
    pub fn feature_names(&self) -> &[String] {
        &self.model.feature_names
    }

    /// Encoded class codes, in the column order of [`Pipeline::predict_proba`].
    pub fn classes(&self) -> &[i64] {
        &self.model.classes
    }

    pub fn estimator_name(&self) -> &'static str {
        self.model.estimator.name()
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        let features = self.feature_names();
        if features.is_empty() {
            return Err(ArtifactError::InvalidSchema(
                "no feature names defined".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(features.len());
        for name in features {
            if name.is_empty() {
                return Err(ArtifactError::InvalidSchema(
                    "empty feature name".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(ArtifactError::InvalidSchema(format!(
                    "duplicate feature '{}'",
                    name
                )));
            }
        }

        let classes = self.classes();
        if classes.is_empty() {
            return Err(ArtifactError::InvalidEstimator(
                "no classes defined".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(classes.len());
        if let Some(code) = classes.iter().find(|code| !seen.insert(**code)) {
            return Err(ArtifactError::InvalidEstimator(format!(
                "duplicate class {}",
                code
            )));
        }

        self.model
            .estimator
            .as_classifier()
            .validate(features.len(), classes.len())
            .map_err(|e| ArtifactError::InvalidEstimator(format!("{}: {}", self.estimator_name(), e)))?;

        for (idx, step) in self.steps.iter().enumerate() {
            step.validate(features.len())
                .map_err(|e| ArtifactError::InvalidTransform(format!("step {}: {}", idx, e)))?;
        }
        Ok(())
    }

    /// One row of class probabilities per input row.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, InferenceError> {
        let expected = self.feature_names().len();
        if x.ncols() != expected {
            return Err(InferenceError::ShapeMismatch {
                expected,
                found: x.ncols(),
            });
        }

        let mut transformed = x.to_owned();
        for step in &self.steps {
            step.apply(&mut transformed);
        }

        let classifier = self.model.estimator.as_classifier();
        let mut proba = Array2::zeros((x.nrows(), self.classes().len()));
        for (row, out) in transformed.rows().into_iter().zip(proba.rows_mut()) {
            classifier.predict_proba_row(row, out);
        }
        Ok(proba)
    }

    /// Class code per input row: the class with the highest probability.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<i64>, InferenceError> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| self.classes()[argmax(row)])
            .collect())
    }
}

/// Index of the first maximum; NaN entries never win.
pub(crate) fn argmax(row: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (idx, value) in row.iter().enumerate() {
        if *value > row[best] || row[best].is_nan() {
            best = idx;
        }
    }
    best
}
