//! Rebuilds the one-row feature vector the classifier was trained on.
//!
//! The model's expected schema is authoritative: the output always has exactly
//! its columns in exactly its order. Anything the form cannot place is reported
//! as a [`BuildWarning`] and left at zero; building never fails.

use serde::Serialize;
use std::fmt;

use crate::scaler::Scaler;
use crate::schema::{ExpectedSchema, MEDICATION_PREFIX, NUMERICAL_FEATURES};
use crate::types::{Medication, RawInput};

/// A single encoded row. `columns[i]` names `values[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    fn zeros(schema: &ExpectedSchema) -> Self {
        Self {
            columns: schema.names().map(str::to_string).collect(),
            values: vec![0.0; schema.len()],
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns.iter().position(|c| c == column).map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    /// Values as f32, for backends that take single-precision input.
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|v| *v as f32).collect()
    }
}

/// Non-fatal problems found while building a vector.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildWarning {
    /// A form field has no column in the expected schema; its value was dropped.
    MissingColumn { column: String },
    /// Fewer numerical columns were found than the scaler was fitted on.
    NumericalShortfall { present: Vec<String> },
    /// The scaler rejected the numerical subset; those columns stay unscaled.
    ScalingFailed { reason: String },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::MissingColumn { column } => {
                write!(f, "Warning: expected column '{}' not found among model features.", column)
            }
            BuildWarning::NumericalShortfall { present } => {
                write!(f, "Numerical features mismatch. Found: {:?}", present)
            }
            BuildWarning::ScalingFailed { reason } => {
                write!(f, "Numerical features left unscaled: {}", reason)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Built {
    pub vector: FeatureVector,
    pub warnings: Vec<BuildWarning>,
}

/// Finds the Medication dummy column for `label`.
///
/// An exact `Medication_<label>` column wins. Otherwise the first prefixed
/// column whose suffix contains the label, comparing with spaces replaced by
/// underscores on both sides. `None` means the label was the dropped baseline
/// category (or the model never saw it) and every dummy stays 0.
pub fn match_medication_column<'a, I>(columns: I, label: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    let exact = format!("{}{}", MEDICATION_PREFIX, label);
    if let Some(c) = columns.clone().into_iter().find(|c| *c == exact) {
        return Some(c);
    }
    let wanted = label.replace(' ', "_");
    columns.into_iter().find(|c| {
        c.strip_prefix(MEDICATION_PREFIX)
            .map(|suffix| suffix.replace(' ', "_").contains(&wanted))
            .unwrap_or(false)
    })
}

/// Builds feature vectors against one schema and one fitted scaler.
pub struct FeatureVectorBuilder<'a> {
    schema: &'a ExpectedSchema,
    scaler: &'a dyn Scaler,
}

impl<'a> FeatureVectorBuilder<'a> {
    pub fn new(schema: &'a ExpectedSchema, scaler: &'a dyn Scaler) -> Self {
        Self { schema, scaler }
    }

    pub fn build(&self, input: &RawInput) -> Built {
        let mut vector = FeatureVector::zeros(self.schema);
        let mut warnings = Vec::new();

        for (column, value) in input.raw_values() {
            match self.schema.position(column) {
                Some(i) => vector.values[i] = value,
                None => warnings.push(BuildWarning::MissingColumn { column: column.to_string() }),
            }
        }

        self.set_medication(&mut vector, input.medication);
        self.scale(&mut vector, &mut warnings);

        for w in &warnings {
            tracing::warn!("{}", w);
        }
        Built { vector, warnings }
    }

    fn set_medication(&self, vector: &mut FeatureVector, medication: Medication) {
        let med_columns: Vec<&str> = self.schema.medication_columns().map(|(_, c)| c).collect();
        if let Some(c) = match_medication_column(med_columns.iter().copied(), medication.label()) {
            if let Some(i) = self.schema.position(c) {
                vector.values[i] = 1.0;
            }
        }
    }

    fn scale(&self, vector: &mut FeatureVector, warnings: &mut Vec<BuildWarning>) {
        let present = self.schema.numeric_columns();
        if present.len() != NUMERICAL_FEATURES.len() {
            warnings.push(BuildWarning::NumericalShortfall {
                present: present.iter().map(|(_, c)| c.to_string()).collect(),
            });
        }
        if present.is_empty() {
            return;
        }

        let names: Vec<&str> = present.iter().map(|(_, c)| *c).collect();
        let raw: Vec<f64> = present.iter().map(|(i, _)| vector.values[*i]).collect();
        match self.scaler.transform(&names, &raw) {
            Ok(scaled) => {
                for ((i, _), v) in present.iter().zip(scaled) {
                    vector.values[*i] = v;
                }
            }
            Err(e) => warnings.push(BuildWarning::ScalingFailed { reason: e.to_string() }),
        }
    }
}
