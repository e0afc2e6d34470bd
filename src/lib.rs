//! Hypertension risk prediction from a single patient form.
//!
//! The form values are encoded into the exact feature layout the classifier
//! was trained on ([`features::FeatureVectorBuilder`]), scaled with the fitted
//! scaler, and scored by the model. Model and scaler are loaded once and
//! shared read-only across requests.

pub mod artifact;
pub mod config;
pub mod error;
pub mod features;
pub mod form;
pub mod model;
pub mod scaler;
pub mod schema;
pub mod server;
pub mod types;
pub mod visits;

pub use features::{match_medication_column, BuildWarning, Built, FeatureVector, FeatureVectorBuilder};
pub use model::{Classifier, LogisticModel};
pub use scaler::{IdentityScaler, Scaler, StandardScaler};
pub use schema::ExpectedSchema;
pub use types::RawInput;
