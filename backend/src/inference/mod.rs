pub mod normalizer;
pub mod predictor;
pub mod service;

pub use normalizer::NormalizeError;
pub use predictor::Prediction;
pub use service::{PredictionError, PredictionService};
