use std::path::PathBuf;
use thiserror::Error;

/// Problems with the form input. Raised at the boundary, before any encoding.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("unknown {field} option '{value}'")]
    UnknownCategory { field: &'static str, value: String },
    #[error("Please enter your Name and Email to proceed with the prediction.")]
    MissingIdentity,
}

/// Loading or validating the model/scaler/meta files at startup.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{what}: expected {expected} entries, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("meta.json feat_list {meta:?} does not match the model's feature_names {model:?}")]
    FeatureListMismatch { meta: Vec<String>, model: Vec<String> },
    #[error("unsupported artifact: {0}")]
    Unsupported(String),
}

#[derive(Debug, Error)]
pub enum ScalerError {
    #[error("scaler was not fitted on column '{0}'")]
    UnknownColumn(String),
    #[error("got {values} values for {columns} columns")]
    Shape { columns: usize, values: usize },
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("feature length mismatch: got {got}, expected {expected}")]
    FeatureLength { got: usize, expected: usize },
    #[error("model input column '{0}' is missing from the feature vector")]
    MissingColumn(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("visit store unavailable: {0}")]
    Unavailable(String),
}

/// Anything that stops a submission from producing a result.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Model(#[from] ModelError),
}
