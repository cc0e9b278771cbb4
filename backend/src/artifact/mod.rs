pub mod bundle;
pub mod estimator;
pub mod label_encoder;
pub mod pipeline;

pub use bundle::ArtifactBundle;
pub use label_encoder::LabelEncoder;
pub use pipeline::Pipeline;

/// Failures while loading the artifact bundle. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Pipeline not found at {0}")]
    NotFound(String),
    #[error("Failed to read artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed artifact: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Invalid feature schema: {0}")]
    InvalidSchema(String),
    #[error("Invalid estimator: {0}")]
    InvalidEstimator(String),
    #[error("Invalid transform: {0}")]
    InvalidTransform(String),
    #[error("Invalid label encoder: {0}")]
    InvalidLabelEncoder(String),
}

/// Failures while running an already loaded pipeline or label decoder.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("X has {found} features, but the pipeline is expecting {expected} features as input")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("y contains previously unseen labels: {0}")]
    UnseenCode(i64),
    #[error("y contains previously unseen labels: '{0}'")]
    UnseenLabel(String),
    #[error("Model produced a non-finite probability for row {0}")]
    NonFiniteProbability(usize),
}
