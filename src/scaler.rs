use serde::Deserialize;
use std::path::Path;

use crate::artifact::read_json;
use crate::error::{ArtifactError, ScalerError};

/// A transform fitted at training time. Inference only ever calls `transform`.
pub trait Scaler: Send + Sync {
    /// Scales `values[i]` as column `columns[i]`, returning a new vector of the same length.
    fn transform(&self, columns: &[&str], values: &[f64]) -> Result<Vec<f64>, ScalerError>;
}

/// Passes values through unchanged. Used when no scaler artifact is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityScaler;

impl Scaler for IdentityScaler {
    fn transform(&self, columns: &[&str], values: &[f64]) -> Result<Vec<f64>, ScalerError> {
        check_shape(columns, values)?;
        Ok(values.to_vec())
    }
}

/// Standardisation `(x - mean) / scale` with per-column parameters exported
/// from the training run.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    feature_names: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(feature_names: Vec<String>, mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ArtifactError> {
        let s = Self { feature_names, mean, scale };
        s.check()?;
        Ok(s)
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let s: Self = read_json(path)?;
        s.check()?;
        Ok(s)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn check(&self) -> Result<(), ArtifactError> {
        let n = self.feature_names.len();
        if self.mean.len() != n {
            return Err(ArtifactError::LengthMismatch { what: "scaler mean", expected: n, got: self.mean.len() });
        }
        if self.scale.len() != n {
            return Err(ArtifactError::LengthMismatch { what: "scaler scale", expected: n, got: self.scale.len() });
        }
        Ok(())
    }
}

impl Scaler for StandardScaler {
    fn transform(&self, columns: &[&str], values: &[f64]) -> Result<Vec<f64>, ScalerError> {
        check_shape(columns, values)?;
        columns
            .iter()
            .zip(values)
            .map(|(col, x)| {
                let i = self
                    .feature_names
                    .iter()
                    .position(|f| f == col)
                    .ok_or_else(|| ScalerError::UnknownColumn(col.to_string()))?;
                // constant features were fitted with scale 0; scikit-learn divides by 1 instead
                let scale = if self.scale[i] == 0.0 { 1.0 } else { self.scale[i] };
                Ok((x - self.mean[i]) / scale)
            })
            .collect()
    }
}

fn check_shape(columns: &[&str], values: &[f64]) -> Result<(), ScalerError> {
    if columns.len() != values.len() {
        return Err(ScalerError::Shape { columns: columns.len(), values: values.len() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fitted() -> StandardScaler {
        StandardScaler::new(
            vec!["Age".into(), "BMI".into(), "Stress_Score".into()],
            vec![50.0, 25.0, 5.0],
            vec![10.0, 5.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn standardises_by_column_name() {
        let s = fitted();
        let out = s.transform(&["BMI", "Age"], &[30.0, 45.0]).unwrap();
        assert_eq!(out, vec![1.0, -0.5]);
    }

    #[test]
    fn zero_scale_divides_by_one() {
        let s = fitted();
        assert_eq!(s.transform(&["Stress_Score"], &[7.0]).unwrap(), vec![2.0]);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let s = fitted();
        assert!(matches!(
            s.transform(&["Sleep_Duration"], &[7.0]),
            Err(ScalerError::UnknownColumn(c)) if c == "Sleep_Duration"
        ));
    }

    #[test]
    fn identity_returns_input() {
        let out = IdentityScaler.transform(&["Age", "BMI"], &[45.0, 25.0]).unwrap();
        assert_eq!(out, vec![45.0, 25.0]);
        assert!(IdentityScaler.transform(&["Age"], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn load_rejects_ragged_parameters() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"feature_names": ["Age", "BMI"], "mean": [1.0], "scale": [1.0, 1.0]}}"#).unwrap();
        let err = StandardScaler::load(f.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::LengthMismatch { what: "scaler mean", expected: 2, got: 1 }));
    }

    #[test]
    fn load_reads_exported_parameters() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"feature_names": ["Age"], "mean": [40.0], "scale": [2.0]}}"#).unwrap();
        let s = StandardScaler::load(f.path()).unwrap();
        assert_eq!(s.feature_names(), &["Age".to_string()]);
        assert_eq!(s.transform(&["Age"], &[44.0]).unwrap(), vec![2.0]);
    }
}
