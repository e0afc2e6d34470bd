use serde::{Deserialize, Serialize};
use std::{fmt, ops::RangeInclusive};

use crate::error::InputError;
use crate::features::FeatureVector;

pub const AGE_RANGE: RangeInclusive<i32> = 18..=90;
pub const SALT_INTAKE_RANGE: RangeInclusive<f64> = 0.0..=20.0;
pub const STRESS_SCORE_RANGE: RangeInclusive<i32> = 0..=10;
pub const SLEEP_DURATION_RANGE: RangeInclusive<f64> = 3.0..=10.0;
pub const BMI_RANGE: RangeInclusive<f64> = 15.0..=40.0;

// ---------- Categorical fields ----------

/// Implements the label/code plumbing shared by every categorical field.
/// Codes follow the declaration order, which is the ordinal order used in training.
macro_rules! categorical {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            pub fn code(self) -> u8 {
                Self::ALL.iter().position(|v| *v == self).unwrap_or(0) as u8
            }

            pub fn from_label(label: &str) -> Result<Self, InputError> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label() == label)
                    .ok_or_else(|| InputError::UnknownCategory {
                        field: stringify!($name),
                        value: label.to_string(),
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

categorical!(BpHistory {
    Normal => "Normal",
    Prehypertension => "Prehypertension",
    Hypertension => "Hypertension",
});

categorical!(FamilyHistory {
    No => "No",
    Yes => "Yes",
});

categorical!(ExerciseLevel {
    Low => "Low",
    Moderate => "Moderate",
    High => "High",
});

categorical!(SmokingStatus {
    NonSmoker => "Non-Smoker",
    Smoker => "Smoker",
});

categorical!(
    /// One-hot encoded; has no ordinal code in the feature vector.
    Medication {
        Unknown => "Unknown",
        AceInhibitor => "ACE Inhibitor",
        BetaBlocker => "Beta Blocker",
        Diuretic => "Diuretic",
        Other => "Other",
    }
);

// ---------- Raw form input ----------

/// Everything the form collects about the patient, before encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
    pub age: i32,
    pub salt_intake: f64,
    pub stress_score: i32,
    pub sleep_duration: f64,
    pub bmi: f64,
    pub bp_history: BpHistory,
    pub family_history: FamilyHistory,
    pub exercise_level: ExerciseLevel,
    pub smoking_status: SmokingStatus,
    pub medication: Medication,
}

impl Default for RawInput {
    // Initial slider positions and first option of each select box.
    fn default() -> Self {
        Self {
            age: 45,
            salt_intake: 10.0,
            stress_score: 5,
            sleep_duration: 7.0,
            bmi: 25.0,
            bp_history: BpHistory::Normal,
            family_history: FamilyHistory::No,
            exercise_level: ExerciseLevel::Low,
            smoking_status: SmokingStatus::NonSmoker,
            medication: Medication::Unknown,
        }
    }
}

impl RawInput {
    /// Rejects values outside the form's documented ranges. Edges are inclusive.
    pub fn validate(&self) -> Result<(), InputError> {
        check_int("Age", self.age, &AGE_RANGE)?;
        check_float("Salt_Intake", self.salt_intake, &SALT_INTAKE_RANGE)?;
        check_int("Stress_Score", self.stress_score, &STRESS_SCORE_RANGE)?;
        check_float("Sleep_Duration", self.sleep_duration, &SLEEP_DURATION_RANGE)?;
        check_float("BMI", self.bmi, &BMI_RANGE)?;
        Ok(())
    }

    /// Column name and encoded value for every single-column field, in the
    /// order they are written into the vector.
    pub fn raw_values(&self) -> [(&'static str, f64); 9] {
        [
            ("Age", self.age as f64),
            ("Salt_Intake", self.salt_intake),
            ("Stress_Score", self.stress_score as f64),
            ("Sleep_Duration", self.sleep_duration),
            ("BMI", self.bmi),
            ("BP_History", self.bp_history.code() as f64),
            ("Exercise_Level", self.exercise_level.code() as f64),
            ("Family_History", self.family_history.code() as f64),
            ("Smoking_Status", self.smoking_status.code() as f64),
        ]
    }
}

fn check_int(field: &'static str, v: i32, range: &RangeInclusive<i32>) -> Result<(), InputError> {
    if range.contains(&v) {
        Ok(())
    } else {
        Err(InputError::OutOfRange {
            field,
            value: v as f64,
            min: *range.start() as f64,
            max: *range.end() as f64,
        })
    }
}

fn check_float(field: &'static str, v: f64, range: &RangeInclusive<f64>) -> Result<(), InputError> {
    // NaN fails `contains`, so non-finite input is rejected here too
    if range.contains(&v) {
        Ok(())
    } else {
        Err(InputError::OutOfRange {
            field,
            value: v,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

// ---------- Visitor identity ----------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visitor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Visitor {
    /// Name and email are both required; neither is otherwise validated.
    pub fn require(&self) -> Result<(), InputError> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() {
            Err(InputError::MissingIdentity)
        } else {
            Ok(())
        }
    }
}

// ---------- Prediction output ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    HighRisk,
    LowRisk,
}

impl RiskLabel {
    pub fn from_prediction(prediction: u8) -> Self {
        if prediction == 1 {
            RiskLabel::HighRisk
        } else {
            RiskLabel::LowRisk
        }
    }

    pub fn headline(self) -> &'static str {
        match self {
            RiskLabel::HighRisk => {
                "High Risk: The model predicts a high likelihood of hypertension."
            }
            RiskLabel::LowRisk => "Low Risk: The model predicts low likelihood of hypertension.",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionOut {
    pub prediction: u8,
    pub label: RiskLabel,
    pub probability: f64,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureVector>,
}

impl PredictionOut {
    /// "Probability: 0.73": two decimals, as displayed to the user.
    pub fn probability_text(&self) -> String {
        format!("Probability: {:.2}", self.probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_codes_follow_training_maps() {
        assert_eq!(BpHistory::Normal.code(), 0);
        assert_eq!(BpHistory::Prehypertension.code(), 1);
        assert_eq!(BpHistory::Hypertension.code(), 2);
        assert_eq!(ExerciseLevel::Low.code(), 0);
        assert_eq!(ExerciseLevel::Moderate.code(), 1);
        assert_eq!(ExerciseLevel::High.code(), 2);
        assert_eq!(FamilyHistory::No.code(), 0);
        assert_eq!(FamilyHistory::Yes.code(), 1);
        assert_eq!(SmokingStatus::NonSmoker.code(), 0);
        assert_eq!(SmokingStatus::Smoker.code(), 1);
    }

    #[test]
    fn labels_round_trip_through_from_label() {
        for m in Medication::ALL {
            assert_eq!(Medication::from_label(m.label()).unwrap(), *m);
        }
        assert_eq!(Medication::AceInhibitor.label(), "ACE Inhibitor");
        assert!(matches!(
            SmokingStatus::from_label("Vaper"),
            Err(InputError::UnknownCategory { field: "SmokingStatus", .. })
        ));
    }

    #[test]
    fn serde_uses_display_labels() {
        let json = serde_json::to_string(&SmokingStatus::NonSmoker).unwrap();
        assert_eq!(json, "\"Non-Smoker\"");
        let m: Medication = serde_json::from_str("\"Beta Blocker\"").unwrap();
        assert_eq!(m, Medication::BetaBlocker);
    }

    #[test]
    fn age_edges_are_accepted() {
        for age in [18, 90] {
            let input = RawInput { age, ..RawInput::default() };
            assert!(input.validate().is_ok(), "age {} should be accepted", age);
            assert_eq!(input.raw_values()[0], ("Age", age as f64));
        }
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let input = RawInput { age: 17, ..RawInput::default() };
        assert!(matches!(input.validate(), Err(InputError::OutOfRange { field: "Age", .. })));

        let input = RawInput { bmi: 40.5, ..RawInput::default() };
        assert!(matches!(input.validate(), Err(InputError::OutOfRange { field: "BMI", .. })));

        let input = RawInput { sleep_duration: f64::NAN, ..RawInput::default() };
        assert!(input.validate().is_err());
    }

    #[test]
    fn visitor_requires_name_and_email() {
        let v = Visitor { name: "Ada".into(), email: "  ".into() };
        assert!(matches!(v.require(), Err(InputError::MissingIdentity)));
        let v = Visitor { name: "Ada".into(), email: "ada@example.com".into() };
        assert!(v.require().is_ok());
    }

    #[test]
    fn probability_text_uses_two_decimals() {
        let out = PredictionOut {
            prediction: 1,
            label: RiskLabel::from_prediction(1),
            probability: 0.7349,
            warnings: vec![],
            features: None,
        };
        assert_eq!(out.probability_text(), "Probability: 0.73");
        assert_eq!(out.label, RiskLabel::HighRisk);
    }
}
