use serde::Deserialize;
use std::path::Path;

use crate::artifact::read_json;
use crate::error::{ArtifactError, ModelError};
use crate::features::FeatureVector;

/// The trained classifier, behind the narrow interface the app needs.
pub trait Classifier: Send + Sync {
    /// Ordered input columns the model was fitted on, when the artifact records them.
    fn expected_features(&self) -> Option<&[String]>;

    /// Probability of class 1 (hypertension).
    fn predict_proba(&self, x: &FeatureVector) -> Result<f64, ModelError>;

    /// Probability at or above which the hard label is 1.
    fn threshold(&self) -> f64 {
        0.5
    }

    /// Hard label, 0 or 1.
    fn predict(&self, x: &FeatureVector) -> Result<u8, ModelError> {
        Ok(u8::from(self.predict_proba(x)? >= self.threshold()))
    }
}

/// meta.json written next to the model: feature ordering and input dim.
#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub feat_list: Vec<String>,
    pub in_dim: Option<usize>,
}

impl Meta {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let meta: Meta = read_json(path)?;
        if let Some(in_dim) = meta.in_dim {
            if in_dim != meta.feat_list.len() {
                tracing::warn!(
                    "meta.in_dim ({}) != feat_list.len() ({}); using feat_list.len()",
                    in_dim,
                    meta.feat_list.len()
                );
            }
        }
        Ok(meta)
    }
}

/// Logistic regression exported as plain coefficients.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticModel {
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    coefficients: Vec<f64>,
    intercept: f64,
    #[serde(default = "default_threshold")]
    threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

impl LogisticModel {
    pub fn new(feature_names: Option<Vec<String>>, coefficients: Vec<f64>, intercept: f64) -> Result<Self, ArtifactError> {
        let m = Self { feature_names, coefficients, intercept, threshold: default_threshold() };
        m.check()?;
        Ok(m)
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let m: Self = read_json(path)?;
        m.check()?;
        Ok(m)
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    fn check(&self) -> Result<(), ArtifactError> {
        if let Some(names) = &self.feature_names {
            if names.len() != self.coefficients.len() {
                return Err(ArtifactError::LengthMismatch {
                    what: "model feature_names",
                    expected: self.coefficients.len(),
                    got: names.len(),
                });
            }
        }
        Ok(())
    }
}

impl Classifier for LogisticModel {
    fn expected_features(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Coefficients are matched to columns by name when the artifact names
    /// them, so a reordered vector still scores the same.
    fn predict_proba(&self, x: &FeatureVector) -> Result<f64, ModelError> {
        if x.len() != self.coefficients.len() {
            return Err(ModelError::FeatureLength { got: x.len(), expected: self.coefficients.len() });
        }
        let dot = match &self.feature_names {
            Some(names) => names.iter().zip(&self.coefficients).try_fold(0.0, |acc, (name, w)| {
                x.get(name)
                    .map(|v| acc + w * v)
                    .ok_or_else(|| ModelError::MissingColumn(name.clone()))
            })?,
            None => self.coefficients.iter().zip(x.values()).map(|(w, v)| w * v).sum::<f64>(),
        };
        Ok(sigmoid(self.intercept + dot))
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Picks the backend from the model file's extension.
pub fn load_model(model_path: &Path, meta: Option<&Meta>) -> Result<Box<dyn Classifier>, ArtifactError> {
    let ext = model_path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match ext {
        "json" => Ok(Box::new(LogisticModel::load(model_path)?)),
        #[cfg(feature = "torch")]
        "pt" | "ts" => Ok(Box::new(torch::TorchModel::load(model_path, meta)?)),
        _ => {
            let _ = meta;
            Err(ArtifactError::Unsupported(format!(
                "{} (expected a .json logistic model{})",
                model_path.display(),
                if cfg!(feature = "torch") { " or a .pt TorchScript module" } else { "" }
            )))
        }
    }
}

#[cfg(feature = "torch")]
pub mod torch {
    use std::path::Path;
    use tch::{kind::Kind, CModule, Device, Tensor};

    use super::{Classifier, Meta};
    use crate::error::{ArtifactError, ModelError};
    use crate::features::FeatureVector;
    use crate::schema::FALLBACK_FEATURES;

    /// TorchScript classifier returning `[1, 2]` class probabilities or a
    /// `[1, 1]` positive-class probability.
    pub struct TorchModel {
        model: CModule,
        device: Device,
        feat_list: Option<Vec<String>>,
        in_dim: usize,
        n_out: i64,
    }

    impl TorchModel {
        pub fn load(model_path: &Path, meta: Option<&Meta>) -> Result<Self, ArtifactError> {
            let device = Device::Cpu;
            let feat_list = meta.map(|m| m.feat_list.clone());
            let in_dim = meta
                .map(|m| m.feat_list.len())
                .unwrap_or(FALLBACK_FEATURES.len());

            let model = CModule::load_on_device(model_path, device)
                .map_err(|e| ArtifactError::Unsupported(format!("failed to load TorchScript {}: {}", model_path.display(), e)))?;

            // Probe output shape with a dummy forward
            let dummy = Tensor::zeros([1, in_dim as i64], (Kind::Float, device));
            let t = model
                .forward_ts(&[dummy])
                .map_err(|e| ArtifactError::Unsupported(format!("probe forward failed: {}", e)))?;
            let sz = t.size();
            if sz.len() != 2 || sz[0] != 1 || !(sz[1] == 1 || sz[1] == 2) {
                return Err(ArtifactError::Unsupported(format!("unexpected model output size: {:?}", sz)));
            }

            Ok(Self { model, device, feat_list, in_dim, n_out: sz[1] })
        }
    }

    impl Classifier for TorchModel {
        fn expected_features(&self) -> Option<&[String]> {
            self.feat_list.as_deref()
        }

        fn predict_proba(&self, x: &FeatureVector) -> Result<f64, ModelError> {
            if x.len() != self.in_dim {
                return Err(ModelError::FeatureLength { got: x.len(), expected: self.in_dim });
            }
            let input = Tensor::from_slice(&x.to_f32())
                .reshape([1, self.in_dim as i64])
                .to_device(self.device);
            let t = self
                .model
                .forward_ts(&[input])
                .map_err(|e| ModelError::Inference(e.to_string()))?;
            let col = if self.n_out == 2 { 1 } else { 0 };
            Ok(t.double_value(&[0, col]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaler::IdentityScaler;
    use crate::schema::ExpectedSchema;
    use crate::features::FeatureVectorBuilder;
    use crate::types::RawInput;
    use std::io::Write;

    fn vector(names: &[&str]) -> FeatureVector {
        let schema = ExpectedSchema::from_names(names.iter().copied());
        FeatureVectorBuilder::new(&schema, &IdentityScaler).build(&RawInput::default()).vector
    }

    #[test]
    fn logistic_probability_and_label() {
        // z = -22.5 + 0.5 * 45 = 0
        let m = LogisticModel::new(None, vec![0.5], -22.5).unwrap();
        let x = vector(&["Age"]);
        assert!((m.predict_proba(&x).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(m.predict(&x).unwrap(), 1);
        assert_eq!(m.clone().with_threshold(0.6).predict(&x).unwrap(), 0);
    }

    #[test]
    fn logistic_rejects_wrong_width() {
        let m = LogisticModel::new(None, vec![0.1, 0.2], 0.0).unwrap();
        assert!(matches!(
            m.predict_proba(&vector(&["Age"])),
            Err(ModelError::FeatureLength { got: 1, expected: 2 })
        ));
    }

    #[test]
    fn named_coefficients_follow_columns_not_positions() {
        // z = -45 + 1 * Age(45) + 0 * BMI = 0, whatever order the vector is in
        let m = LogisticModel::new(Some(vec!["Age".into(), "BMI".into()]), vec![1.0, 0.0], -45.0).unwrap();
        let forward = m.predict_proba(&vector(&["Age", "BMI"])).unwrap();
        let reversed = m.predict_proba(&vector(&["BMI", "Age"])).unwrap();
        assert!((forward - 0.5).abs() < 1e-12);
        assert!((reversed - 0.5).abs() < 1e-12);

        assert!(matches!(
            m.predict_proba(&vector(&["Age", "Salt_Intake"])),
            Err(ModelError::MissingColumn(c)) if c == "BMI"
        ));
    }

    #[test]
    fn declared_names_must_match_coefficients() {
        let err = LogisticModel::new(Some(vec!["Age".into()]), vec![0.1, 0.2], 0.0).unwrap_err();
        assert!(matches!(err, ArtifactError::LengthMismatch { .. }));
    }

    #[test]
    fn load_model_by_extension() {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(f, r#"{{"feature_names": ["Age", "BMI"], "coefficients": [0.5, -0.5], "intercept": 0.0}}"#).unwrap();
        let m = load_model(f.path(), None).unwrap();
        assert_eq!(m.expected_features().unwrap(), &["Age".to_string(), "BMI".to_string()]);

        let other = tempfile::Builder::new().suffix(".pkl").tempfile().unwrap();
        assert!(matches!(load_model(other.path(), None), Err(ArtifactError::Unsupported(_))));
    }

    #[test]
    fn meta_loads_feature_order() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"feat_list": ["BMI", "Age"], "in_dim": 3}}"#).unwrap();
        let meta = Meta::load(f.path()).unwrap();
        assert_eq!(meta.feat_list, vec!["BMI".to_string(), "Age".to_string()]);
        assert_eq!(meta.in_dim, Some(3));
    }
}
