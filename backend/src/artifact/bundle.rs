use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

use super::{ArtifactError, LabelEncoder, Pipeline};

/// Fitted pipeline and label encoder, loaded once and shared read-only.
#[derive(Debug, Deserialize)]
pub struct ArtifactBundle {
    pipeline: Pipeline,
    label_encoder: LabelEncoder,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
    #[serde(skip)]
    fingerprint: String,
}

impl ArtifactBundle {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::NotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let mut bundle: ArtifactBundle = serde_json::from_slice(bytes)?;
        bundle.validate()?;
        bundle.fingerprint = Self::calculate_fingerprint(bytes);
        Ok(bundle)
    }

    pub fn calculate_fingerprint(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        self.pipeline.validate()?;
        self.label_encoder.validate()?;

        // Every code the pipeline can emit has to decode.
        let decodable = self.label_encoder.len() as i64;
        if let Some(code) = self
            .pipeline
            .classes()
            .iter()
            .find(|code| **code < 0 || **code >= decodable)
        {
            return Err(ArtifactError::InvalidLabelEncoder(format!(
                "pipeline class {} has no label ({} labels known)",
                code, decodable
            )));
        }
        Ok(())
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn label_encoder(&self) -> &LabelEncoder {
        &self.label_encoder
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Hex SHA-256 of the artifact bytes.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::test_support;
    use serde_json::json;

    fn from_value(value: &serde_json::Value) -> Result<ArtifactBundle, ArtifactError> {
        ArtifactBundle::from_slice(&serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = Path::new("does/not/exist/pipeline.json");
        match ArtifactBundle::load(path) {
            Err(err @ ArtifactError::NotFound(_)) => {
                assert_eq!(
                    err.to_string(),
                    format!("Pipeline not found at {}", path.display())
                );
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn loads_from_disk_with_fingerprint() {
        let path = std::env::temp_dir().join(format!(
            "symptom-tracker-bundle-{}.json",
            std::process::id()
        ));
        let bytes = serde_json::to_vec(&test_support::bundle_json()).unwrap();
        std::fs::write(&path, &bytes).unwrap();

        let bundle = ArtifactBundle::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(bundle.fingerprint(), ArtifactBundle::calculate_fingerprint(&bytes));
        assert_eq!(bundle.fingerprint().len(), 64);
        assert_eq!(bundle.label_encoder().classes(), test_support::DISEASES);
        assert_eq!(bundle.metadata().get("version"), Some(&json!("test")));
    }

    #[test]
    fn loads_shipped_artifact() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../artifacts/pipeline.json");
        let bundle = ArtifactBundle::load(&path).unwrap();
        assert_eq!(bundle.pipeline().feature_names().len(), 19);
        assert_eq!(
            bundle.pipeline().classes().len(),
            bundle.label_encoder().len()
        );
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            ArtifactBundle::from_slice(b"{\"pipeline\": "),
            Err(ArtifactError::Malformed(_))
        ));
        assert!(matches!(
            from_value(&json!({ "pipeline": test_support::bundle_json()["pipeline"] })),
            Err(ArtifactError::Malformed(_))
        ));
    }

    #[test]
    fn pipeline_classes_must_decode() {
        let mut value = test_support::bundle_json();
        value["label_encoder"]["classes"] = json!(["Bronchial Asthma", "Heart attack"]);
        assert!(matches!(
            from_value(&value),
            Err(ArtifactError::InvalidLabelEncoder(_))
        ));
    }
}
