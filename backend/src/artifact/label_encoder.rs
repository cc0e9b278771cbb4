use serde::Deserialize;
use std::collections::HashSet;

use super::{ArtifactError, InferenceError};

/// Bidirectional mapping between integer class codes and readable labels.
/// The code of a label is its position in `classes`.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Result<Self, ArtifactError> {
        let encoder = Self { classes };
        encoder.validate()?;
        Ok(encoder)
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.classes.is_empty() {
            return Err(ArtifactError::InvalidLabelEncoder(
                "no classes defined".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(self.classes.len());
        for class in &self.classes {
            if !seen.insert(class.as_str()) {
                return Err(ArtifactError::InvalidLabelEncoder(format!(
                    "duplicate class '{}'",
                    class
                )));
            }
        }
        Ok(())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn transform(&self, labels: &[&str]) -> Result<Vec<i64>, InferenceError> {
        labels
            .iter()
            .map(|label| {
                self.classes
                    .iter()
                    .position(|class| class == label)
                    .map(|idx| idx as i64)
                    .ok_or_else(|| InferenceError::UnseenLabel(label.to_string()))
            })
            .collect()
    }

    pub fn inverse_transform(&self, codes: &[i64]) -> Result<Vec<String>, InferenceError> {
        codes
            .iter()
            .map(|&code| {
                usize::try_from(code)
                    .ok()
                    .and_then(|idx| self.classes.get(idx))
                    .cloned()
                    .ok_or(InferenceError::UnseenCode(code))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> LabelEncoder {
        LabelEncoder::new(vec![
            "Bronchial Asthma".to_string(),
            "Pneumonia".to_string(),
            "Tuberculosis".to_string(),
        ])
        .unwrap()
    }

    #[test]
    fn maps_labels_both_ways() {
        let encoder = encoder();
        let codes = encoder.transform(&["Tuberculosis", "Bronchial Asthma"]).unwrap();
        assert_eq!(codes, vec![2, 0]);
        assert_eq!(
            encoder.inverse_transform(&codes).unwrap(),
            vec!["Tuberculosis".to_string(), "Bronchial Asthma".to_string()]
        );
    }

    #[test]
    fn reports_size() {
        let encoder = encoder();
        assert_eq!(encoder.len(), 3);
        assert!(!encoder.is_empty());
    }

    #[test]
    fn rejects_codes_outside_range() {
        let encoder = encoder();
        assert_eq!(
            encoder.inverse_transform(&[3]),
            Err(InferenceError::UnseenCode(3))
        );
        assert_eq!(
            encoder.inverse_transform(&[-1]),
            Err(InferenceError::UnseenCode(-1))
        );
    }

    #[test]
    fn rejects_unknown_labels() {
        assert_eq!(
            encoder().transform(&["Malaria"]),
            Err(InferenceError::UnseenLabel("Malaria".to_string()))
        );
    }

    #[test]
    fn rejects_empty_and_duplicate_classes() {
        assert!(matches!(
            LabelEncoder::new(Vec::new()),
            Err(ArtifactError::InvalidLabelEncoder(_))
        ));
        assert!(matches!(
            LabelEncoder::new(vec!["Flu".to_string(), "Flu".to_string()]),
            Err(ArtifactError::InvalidLabelEncoder(_))
        ));
    }
}
